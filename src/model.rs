use rand::Rng;
use rand_distr::{Distribution, Uniform};

use crate::{
    error::{Error, Result},
    tensor::{DenseMatrix, Shape},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Train,
    Eval,
}

/// A named weight buffer and its accumulated gradient.
pub struct Param<'a> {
    pub name: &'a str,
    pub values: &'a mut [f32],
    pub grads: &'a mut [f32],
}

/// A classifier mapping a batch of inputs to a batch of class logits.
///
/// The trainer never calls these directly; it goes through [`TrainMode`] or
/// [`EvalMode`], which tell the model which mode it is in before handing out
/// the operations valid in that mode.
pub trait Model {
    /// Forward pass that records what `backward` needs.
    fn forward(&mut self, inputs: &DenseMatrix) -> Result<DenseMatrix>;

    /// Forward pass that records nothing.
    fn infer(&mut self, inputs: &DenseMatrix) -> Result<DenseMatrix>;

    /// Accumulates parameter gradients given the gradient of the loss
    /// with respect to the output of the last `forward`.
    fn backward(&mut self, output_grad: &DenseMatrix) -> Result<()>;

    fn parameters(&mut self) -> Vec<Param<'_>>;

    /// Called on every mode transition.
    fn set_mode(&mut self, _mode: Mode) {}
}

/// A model that has been switched into training mode.
pub struct TrainMode<'a, M: Model> {
    model: &'a mut M,
}

impl<'a, M: Model> TrainMode<'a, M> {
    pub fn enter(model: &'a mut M) -> Self {
        model.set_mode(Mode::Train);
        Self { model }
    }

    pub fn forward(&mut self, inputs: &DenseMatrix) -> Result<DenseMatrix> {
        self.model.forward(inputs)
    }

    pub fn backward(&mut self, output_grad: &DenseMatrix) -> Result<()> {
        self.model.backward(output_grad)
    }

    pub fn parameters(&mut self) -> Vec<Param<'_>> {
        self.model.parameters()
    }
}

/// A model that has been switched into inference mode. Only exposes inference.
pub struct EvalMode<'a, M: Model> {
    model: &'a mut M,
}

impl<'a, M: Model> EvalMode<'a, M> {
    pub fn enter(model: &'a mut M) -> Self {
        model.set_mode(Mode::Eval);
        Self { model }
    }

    pub fn infer(&mut self, inputs: &DenseMatrix) -> Result<DenseMatrix> {
        self.model.infer(inputs)
    }
}

/// `logits = W x + b`, the smallest classifier that can be trained by the loop.
#[derive(Clone, Debug)]
pub struct Linear {
    inputs: usize,
    classes: usize,
    /// Row-major `classes x inputs`.
    weights: Vec<f32>,
    biases: Vec<f32>,
    weight_grads: Vec<f32>,
    bias_grads: Vec<f32>,
    recorded: Option<DenseMatrix>,
    mode: Mode,
}

impl Linear {
    pub fn zeroed(inputs: usize, classes: usize) -> Self {
        Self {
            inputs,
            classes,
            weights: vec![0.0; inputs * classes],
            biases: vec![0.0; classes],
            weight_grads: vec![0.0; inputs * classes],
            bias_grads: vec![0.0; classes],
            recorded: None,
            mode: Mode::Train,
        }
    }

    /// Weights uniform in `±sqrt(1 / inputs)`, biases zero.
    pub fn randomised(inputs: usize, classes: usize, rng: &mut impl Rng) -> Self {
        let mut linear = Self::zeroed(inputs, classes);

        let stdev = (1.0 / inputs.max(1) as f32).sqrt();
        let dist = Uniform::new_inclusive(-stdev, stdev);

        for weight in &mut linear.weights {
            *weight = dist.sample(rng);
        }

        linear
    }

    pub fn inputs(&self) -> usize {
        self.inputs
    }

    pub fn classes(&self) -> usize {
        self.classes
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    pub fn biases(&self) -> &[f32] {
        &self.biases
    }

    fn apply(&self, inputs: &DenseMatrix) -> Result<DenseMatrix> {
        let shape = inputs.shape();
        if shape.rows() != self.inputs {
            return Err(Error::ShapeMismatch { expected: Shape::new(self.inputs, shape.cols()), found: shape });
        }

        let mut out = DenseMatrix::zeroed(Shape::new(self.classes, shape.cols()));

        for (i, x) in inputs.columns().enumerate() {
            let col = out.column_mut(i);
            for (c, logit) in col.iter_mut().enumerate() {
                let row = &self.weights[c * self.inputs..(c + 1) * self.inputs];
                *logit = self.biases[c] + row.iter().zip(x).map(|(w, x)| w * x).sum::<f32>();
            }
        }

        Ok(out)
    }
}

impl Model for Linear {
    fn forward(&mut self, inputs: &DenseMatrix) -> Result<DenseMatrix> {
        let out = self.apply(inputs)?;
        self.recorded = Some(inputs.clone());
        Ok(out)
    }

    fn infer(&mut self, inputs: &DenseMatrix) -> Result<DenseMatrix> {
        self.apply(inputs)
    }

    fn backward(&mut self, output_grad: &DenseMatrix) -> Result<()> {
        let inputs = self.recorded.take().ok_or(Error::NoForwardPass)?;

        let expected = Shape::new(self.classes, inputs.shape().cols());
        if output_grad.shape() != expected {
            return Err(Error::ShapeMismatch { expected, found: output_grad.shape() });
        }

        for (x, g) in inputs.columns().zip(output_grad.columns()) {
            for (c, &gc) in g.iter().enumerate() {
                self.bias_grads[c] += gc;

                let row = &mut self.weight_grads[c * self.inputs..(c + 1) * self.inputs];
                for (wg, &xi) in row.iter_mut().zip(x) {
                    *wg += gc * xi;
                }
            }
        }

        Ok(())
    }

    fn parameters(&mut self) -> Vec<Param<'_>> {
        vec![
            Param { name: "weights", values: &mut self.weights, grads: &mut self.weight_grads },
            Param { name: "biases", values: &mut self.biases, grads: &mut self.bias_grads },
        ]
    }

    fn set_mode(&mut self, mode: Mode) {
        if mode == Mode::Eval {
            self.recorded = None;
        }

        self.mode = mode;
    }
}
