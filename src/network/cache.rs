use crate::layers::{DenseLayer, ParamBuffer};

/// Per-layer values recorded by `Network::forward_for_training` and
/// consumed by `Network::backward`.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivationCache {
    pub input: Vec<f64>,
    /// `z = x · W + b` for every layer.
    pub pre_activations: Vec<Vec<f64>>,
    /// `act(z)` for every layer; the last entry is the network output.
    pub activations: Vec<Vec<f64>>,
}

impl ActivationCache {
    pub fn output(&self) -> &[f64] {
        self.activations.last().map(|a| a.as_slice()).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.activations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activations.is_empty()
    }
}

/// Weight and bias gradients, one buffer per layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradients {
    pub layers: Vec<ParamBuffer>,
}

impl Gradients {
    pub fn zeros_like(layers: &[DenseLayer]) -> Gradients {
        Gradients { layers: layers.iter().map(ParamBuffer::zeros_like).collect() }
    }

    /// Element-wise `self += other`. Shapes must match.
    pub fn accumulate(&mut self, other: &Gradients) {
        for (acc, g) in self.layers.iter_mut().zip(other.layers.iter()) {
            for (a, g) in acc.values_mut().zip(g.values()) {
                *a += g;
            }
        }
    }

    pub fn scale(&mut self, factor: f64) {
        for buf in &mut self.layers {
            for v in buf.values_mut() {
                *v *= factor;
            }
        }
    }

    pub fn is_finite(&self) -> bool {
        self.layers.iter().all(ParamBuffer::is_finite)
    }
}
