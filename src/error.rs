use crate::tensor::Shape;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("shape mismatch: expected {expected}, found {found}")]
    ShapeMismatch { expected: Shape, found: Shape },
    #[error("buffer of length {len} cannot hold a {shape} matrix")]
    InvalidBufferLength { shape: Shape, len: usize },
    #[error("batch has {inputs} inputs but {labels} labels")]
    LabelCountMismatch { inputs: usize, labels: usize },
    #[error("label {label} is out of range for {classes} classes")]
    LabelOutOfRange { label: usize, classes: usize },
    #[error("permutation of length {found} does not cover a batch of {expected}")]
    InvalidPermutation { expected: usize, found: usize },
    #[error("non-finite loss {loss} in epoch {epoch} at batch {batch}")]
    NonFiniteLoss { epoch: usize, batch: usize, loss: f32 },
    #[error("backward called without a recorded forward pass")]
    NoForwardPass,
    #[error("invalid beta distribution parameter {alpha}: {source}")]
    Beta {
        alpha: f32,
        #[source]
        source: rand_distr::BetaError,
    },
    #[error("invalid config: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}
