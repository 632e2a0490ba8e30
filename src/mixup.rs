use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Beta, Distribution};

use crate::{
    data::Batch,
    error::{Error, Result},
    loss::{Loss, LossOutput},
    tensor::DenseMatrix,
};

/// A batch blended with a permutation of itself.
#[derive(Clone, Debug, PartialEq)]
pub struct MixedBatch {
    pub inputs: DenseMatrix,
    /// The original labels.
    pub targets_a: Vec<usize>,
    /// The labels of the samples each input was blended with.
    pub targets_b: Vec<usize>,
    pub lambda: f32,
}

impl MixedBatch {
    pub fn len(&self) -> usize {
        self.targets_a.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets_a.is_empty()
    }

    /// `lambda * #(predicted == a) + (1 - lambda) * #(predicted == b)`.
    ///
    /// An approximate accuracy numerator: a sample matching both targets counts in full.
    pub fn soft_correct(&self, predicted: &[usize]) -> f32 {
        let hits = |targets: &[usize]| predicted.iter().zip(targets).filter(|(p, t)| p == t).count() as f32;

        self.lambda * hits(&self.targets_a) + (1.0 - self.lambda) * hits(&self.targets_b)
    }
}

/// Something that turns a batch into a mixed batch.
pub trait BatchMixer {
    fn mix(&mut self, batch: &Batch) -> Result<MixedBatch>;
}

impl<T: BatchMixer + ?Sized> BatchMixer for &mut T {
    fn mix(&mut self, batch: &Batch) -> Result<MixedBatch> {
        (**self).mix(batch)
    }
}

/// Blends `batch` with the columns picked out by `index`:
/// `mixed[i] = lambda * x[i] + (1 - lambda) * x[index[i]]`.
pub fn mix_with(batch: &Batch, index: &[usize], lambda: f32) -> Result<MixedBatch> {
    if index.len() != batch.len() {
        return Err(Error::InvalidPermutation { expected: batch.len(), found: index.len() });
    }

    let permuted = batch.inputs.select_columns(index)?;
    let inputs = DenseMatrix::linear_comb(lambda, &batch.inputs, 1.0 - lambda, &permuted)?;
    let targets_b = index.iter().map(|&i| batch.labels[i]).collect();

    Ok(MixedBatch { inputs, targets_a: batch.labels.clone(), targets_b, lambda })
}

/// `lambda * loss(a) + (1 - lambda) * loss(b)`, with the gradient blended the same way.
pub fn blended_loss<L: Loss + ?Sized>(
    loss_fn: &L,
    predictions: &DenseMatrix,
    targets_a: &[usize],
    targets_b: &[usize],
    lambda: f32,
) -> Result<LossOutput> {
    let a = loss_fn.evaluate(predictions, targets_a)?;
    let b = loss_fn.evaluate(predictions, targets_b)?;

    Ok(LossOutput {
        value: lambda * a.value + (1.0 - lambda) * b.value,
        grad: DenseMatrix::linear_comb(lambda, &a.grad, 1.0 - lambda, &b.grad)?,
    })
}

/// Mixup with `lambda ~ Beta(alpha, alpha)` and a fresh uniform permutation per batch.
/// A non-positive `alpha` fixes `lambda` at 1.
pub struct MixupSampler<R = ChaCha8Rng> {
    alpha: f32,
    beta: Option<Beta<f32>>,
    rng: R,
}

impl MixupSampler<ChaCha8Rng> {
    /// Seeded from `seed`, or from OS entropy if there is none.
    pub fn seeded(alpha: f32, seed: Option<u64>) -> Result<Self> {
        let rng = seed.map_or_else(ChaCha8Rng::from_entropy, ChaCha8Rng::seed_from_u64);
        Self::new(alpha, rng)
    }
}

impl<R: Rng> MixupSampler<R> {
    pub fn new(alpha: f32, rng: R) -> Result<Self> {
        let beta = if alpha > 0.0 {
            Some(Beta::new(alpha, alpha).map_err(|source| Error::Beta { alpha, source })?)
        } else {
            None
        };

        Ok(Self { alpha, beta, rng })
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn draw_lambda(&mut self) -> f32 {
        match &self.beta {
            Some(beta) => beta.sample(&mut self.rng),
            None => 1.0,
        }
    }

    pub fn draw_permutation(&mut self, n: usize) -> Vec<usize> {
        let mut index: Vec<usize> = (0..n).collect();
        index.shuffle(&mut self.rng);
        index
    }
}

impl<R: Rng> BatchMixer for MixupSampler<R> {
    fn mix(&mut self, batch: &Batch) -> Result<MixedBatch> {
        let lambda = self.draw_lambda();
        let index = self.draw_permutation(batch.len());
        mix_with(batch, &index, lambda)
    }
}
