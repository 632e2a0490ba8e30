use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    tensor::{DenseMatrix, Shape},
};

/// `N` samples, one per column of `inputs`, with their class labels.
#[derive(Clone, Debug, PartialEq)]
pub struct Batch {
    pub inputs: DenseMatrix,
    pub labels: Vec<usize>,
}

impl Batch {
    pub fn new(inputs: DenseMatrix, labels: Vec<usize>) -> Result<Self> {
        let batch = Self { inputs, labels };
        batch.check()?;
        Ok(batch)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn sample_size(&self) -> usize {
        self.inputs.shape().rows()
    }

    fn check(&self) -> Result<()> {
        let inputs = self.inputs.shape().cols();
        let labels = self.labels.len();

        if inputs != labels {
            return Err(Error::LabelCountMismatch { inputs, labels });
        }

        Ok(())
    }
}

/// A finite, restartable sequence of batches.
pub trait DataSource {
    /// Number of batches a full pass yields.
    fn num_batches(&self) -> usize;

    /// Calls `f` on every batch in order, stopping at the first error.
    fn map_batches<F: FnMut(Batch) -> Result<()>>(&self, f: F) -> Result<()>;
}

/// Where batches live while the trainer works on them. Applied once to every
/// batch as it is taken from a data source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    #[default]
    Host,
}

impl Placement {
    pub fn place(&self, batch: Batch) -> Result<Batch> {
        batch.check()?;

        match self {
            Self::Host => Ok(batch),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Host => "host",
        }
    }
}

/// Serves a fixed set of samples sequentially in batches of `batch_size`.
/// The final batch holds whatever remains.
#[derive(Clone, Debug)]
pub struct InMemorySource {
    samples: DenseMatrix,
    labels: Vec<usize>,
    batch_size: usize,
}

impl InMemorySource {
    pub fn new(samples: DenseMatrix, labels: Vec<usize>, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::Config("batch size must be positive".to_string()));
        }

        let inputs = samples.shape().cols();
        if inputs != labels.len() {
            return Err(Error::LabelCountMismatch { inputs, labels: labels.len() });
        }

        Ok(Self { samples, labels, batch_size })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn num_samples(&self) -> usize {
        self.labels.len()
    }
}

impl DataSource for InMemorySource {
    fn num_batches(&self) -> usize {
        self.labels.len().div_ceil(self.batch_size)
    }

    fn map_batches<F: FnMut(Batch) -> Result<()>>(&self, mut f: F) -> Result<()> {
        let rows = self.samples.shape().rows();

        for (i, labels) in self.labels.chunks(self.batch_size).enumerate() {
            let start = i * self.batch_size * rows;
            let end = start + labels.len() * rows;

            let inputs =
                DenseMatrix::from_vec(Shape::new(rows, labels.len()), self.samples.values()[start..end].to_vec())?;

            f(Batch { inputs, labels: labels.to_vec() })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(samples: usize, batch_size: usize) -> InMemorySource {
        let vals = (0..samples * 2).map(|x| x as f32).collect();
        let inputs = DenseMatrix::from_vec(Shape::new(2, samples), vals).unwrap();
        InMemorySource::new(inputs, (0..samples).map(|i| i % 3).collect(), batch_size).unwrap()
    }

    #[test]
    fn batch_rejects_mismatched_labels() {
        let inputs = DenseMatrix::zeroed(Shape::new(3, 2));
        let err = Batch::new(inputs, vec![0]).unwrap_err();

        assert!(matches!(err, Error::LabelCountMismatch { inputs: 2, labels: 1 }));
    }

    #[test]
    fn final_batch_is_partial() {
        let source = source(10, 4);
        assert_eq!(source.num_batches(), 3);

        let mut sizes = Vec::new();
        let mut first_columns = Vec::new();
        source
            .map_batches(|batch| {
                sizes.push(batch.len());
                first_columns.push(batch.inputs.column(0).to_vec());
                Ok(())
            })
            .unwrap();

        assert_eq!(sizes, vec![4, 4, 2]);
        assert_eq!(first_columns[2], vec![16.0, 17.0]);
    }

    #[test]
    fn sources_are_restartable() {
        let source = source(5, 2);

        let mut first = Vec::new();
        source
            .map_batches(|b| {
                first.push(b);
                Ok(())
            })
            .unwrap();

        let mut second = Vec::new();
        source
            .map_batches(|b| {
                second.push(b);
                Ok(())
            })
            .unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn errors_stop_iteration() {
        let source = source(8, 2);
        let mut seen = 0;

        let res = source.map_batches(|_| {
            seen += 1;
            if seen == 2 {
                Err(Error::NoForwardPass)
            } else {
                Ok(())
            }
        });

        assert!(res.is_err());
        assert_eq!(seen, 2);
    }

    #[test]
    fn host_placement_validates() {
        let bad = Batch { inputs: DenseMatrix::zeroed(Shape::new(1, 3)), labels: vec![0, 1] };
        assert!(Placement::Host.place(bad).is_err());
    }
}
