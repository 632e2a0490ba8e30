use std::collections::{hash_map::Entry, HashMap};

use serde::{Deserialize, Serialize};

use crate::{error::Result, model::Param};

pub trait Optimiser {
    type Params: Clone + std::fmt::Debug;

    fn new(params: Self::Params) -> Self;

    fn zero_grad(&mut self, params: &mut [Param<'_>]) {
        for param in params {
            param.grads.fill(0.0);
        }
    }

    /// Applies one update using the currently accumulated gradients.
    fn step(&mut self, params: &mut [Param<'_>], learning_rate: f32) -> Result<()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SgdParams {
    pub momentum: f32,
    pub weight_decay: f32,
    pub nesterov: bool,
}

impl Default for SgdParams {
    fn default() -> Self {
        Self { momentum: 0.9, weight_decay: 1e-4, nesterov: false }
    }
}

/// Stochastic gradient descent with momentum and L2 weight decay.
/// Momentum buffers are keyed by parameter name and start at the first gradient.
#[derive(Debug)]
pub struct Sgd {
    params: SgdParams,
    momentum: HashMap<String, Vec<f32>>,
}

impl Sgd {
    pub fn params(&self) -> &SgdParams {
        &self.params
    }
}

impl Optimiser for Sgd {
    type Params = SgdParams;

    fn new(params: SgdParams) -> Self {
        Self { params, momentum: HashMap::new() }
    }

    fn step(&mut self, params: &mut [Param<'_>], learning_rate: f32) -> Result<()> {
        let SgdParams { momentum, weight_decay, nesterov } = self.params;

        for param in params {
            let mut grad: Vec<f32> =
                param.grads.iter().zip(param.values.iter()).map(|(g, w)| g + weight_decay * w).collect();

            if momentum != 0.0 {
                let buf = match self.momentum.entry(param.name.to_string()) {
                    Entry::Occupied(entry) => {
                        let buf = entry.into_mut();
                        for (b, g) in buf.iter_mut().zip(&grad) {
                            *b = momentum * *b + g;
                        }
                        buf
                    }
                    Entry::Vacant(entry) => entry.insert(grad.clone()),
                };

                if nesterov {
                    for (g, b) in grad.iter_mut().zip(buf.iter()) {
                        *g += momentum * b;
                    }
                } else {
                    grad.copy_from_slice(buf);
                }
            }

            for (w, g) in param.values.iter_mut().zip(&grad) {
                *w -= learning_rate * g;
            }
        }

        Ok(())
    }
}
