use crate::{
    error::{Error, Result},
    tensor::{DenseMatrix, Shape},
};

/// Scalar loss for a batch together with its gradient with respect to the predictions.
#[derive(Clone, Debug, PartialEq)]
pub struct LossOutput {
    pub value: f32,
    pub grad: DenseMatrix,
}

/// A per-sample-averaged loss over class logits and integer targets.
pub trait Loss {
    fn evaluate(&self, logits: &DenseMatrix, targets: &[usize]) -> Result<LossOutput>;

    /// The loss value alone, for when no gradient is needed.
    fn value(&self, logits: &DenseMatrix, targets: &[usize]) -> Result<f32> {
        self.evaluate(logits, targets).map(|out| out.value)
    }
}

/// Softmax followed by negative log-likelihood, averaged over the batch.
#[derive(Clone, Copy, Debug, Default)]
pub struct CrossEntropy;

impl CrossEntropy {
    fn check(logits: &DenseMatrix, targets: &[usize]) -> Result<()> {
        let shape = logits.shape();

        if shape.cols() != targets.len() {
            return Err(Error::ShapeMismatch { expected: Shape::new(shape.rows(), targets.len()), found: shape });
        }

        if let Some(&label) = targets.iter().find(|&&t| t >= shape.rows()) {
            return Err(Error::LabelOutOfRange { label, classes: shape.rows() });
        }

        Ok(())
    }

    fn softmax_into(logits: &[f32], out: &mut [f32]) {
        let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);

        let mut total = 0.0;
        for (o, &x) in out.iter_mut().zip(logits) {
            *o = (x - max).exp();
            total += *o;
        }

        for o in out.iter_mut() {
            *o /= total;
        }
    }
}

impl Loss for CrossEntropy {
    fn evaluate(&self, logits: &DenseMatrix, targets: &[usize]) -> Result<LossOutput> {
        Self::check(logits, targets)?;

        let mut grad = DenseMatrix::zeroed(logits.shape());
        let scale = 1.0 / targets.len().max(1) as f32;
        let mut total = 0.0;

        for (i, &target) in targets.iter().enumerate() {
            let col = grad.column_mut(i);
            Self::softmax_into(logits.column(i), col);

            total -= col[target].ln();

            col[target] -= 1.0;
            for g in col.iter_mut() {
                *g *= scale;
            }
        }

        Ok(LossOutput { value: total * scale, grad })
    }

    fn value(&self, logits: &DenseMatrix, targets: &[usize]) -> Result<f32> {
        Self::check(logits, targets)?;

        let mut probs = vec![0.0; logits.shape().rows()];
        let mut total = 0.0;

        for (i, &target) in targets.iter().enumerate() {
            Self::softmax_into(logits.column(i), &mut probs);
            total -= probs[target].ln();
        }

        Ok(total / targets.len().max(1) as f32)
    }
}
