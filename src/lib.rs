/// Contains the crate-wide `Error` type.
pub mod error;
/// Contains `Batch`, the `DataSource` trait, batch placement and an in-memory source.
pub mod data;
/// Contains the `Loss` trait and softmax cross-entropy.
pub mod loss;
/// Contains `RunningAverage`.
pub mod meter;
/// Contains the `MetricSink` trait and provided sinks.
pub mod metrics;
/// Contains the mixup sampler and the blended loss.
pub mod mixup;
/// Contains the `Model` trait, the explicit train/eval mode guards
/// and a linear classifier.
pub mod model;
/// Contains the `Optimiser` trait and SGD.
pub mod optimiser;
/// Contains the epoch schedule and learning rate schedulers.
pub mod schedule;
/// Contains `Shape` and the dense, column-per-sample `DenseMatrix`.
pub mod tensor;
/// Contains `TrainConfig`.
pub mod config;
/// Contains the `Trainer` and its train/validate/test epoch runners.
pub mod trainer;

pub use config::{ClassBuckets, MixupConfig, TrainConfig};
pub use data::{Batch, DataSource, InMemorySource, Placement};
pub use error::{Error, Result};
pub use loss::{CrossEntropy, Loss, LossOutput};
pub use meter::RunningAverage;
pub use metrics::{MemorySink, MetricSink, TracingSink};
pub use mixup::{blended_loss, mix_with, BatchMixer, MixedBatch, MixupSampler};
pub use model::{EvalMode, Linear, Mode, Model, Param, TrainMode};
pub use optimiser::{Optimiser, Sgd, SgdParams};
pub use schedule::{LrScheduler, TrainingSchedule};
pub use tensor::{DenseMatrix, Shape};
pub use trainer::{logger, ClassAccuracy, EpochStats, EpochSummary, RunSummary, TestReport, Trainer};
