use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::{activation::Activation, math::Matrix, network::architecture::WeightInit};

/// Biases start at this small positive constant.
pub const BIAS_INIT: f64 = 0.01;

/// A fully connected layer: `a = act(x · W + b)`, with `W` shaped
/// `[input_size][size]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    pub weights: Matrix,
    pub biases: Vec<f64>,
    pub activation: Activation,
}

impl DenseLayer {
    pub fn new<R: Rng + ?Sized>(
        input_size: usize,
        size: usize,
        activation: Activation,
        init: WeightInit,
        rng: &mut R,
    ) -> DenseLayer {
        let scale = init.scale(input_size, size);
        DenseLayer {
            weights: Matrix::gaussian(input_size, size, scale, rng),
            biases: vec![BIAS_INIT; size],
            activation,
        }
    }

    pub fn input_size(&self) -> usize {
        self.weights.rows
    }

    pub fn size(&self) -> usize {
        self.weights.cols
    }

    /// Returns `(z, a)`: the pre-activation and the activated output.
    pub fn forward(&self, input: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let mut z = self.weights.vec_mul(input);
        for (zi, b) in z.iter_mut().zip(self.biases.iter()) {
            *zi += b;
        }
        let a = self.activation.apply(&z);
        (z, a)
    }

    pub fn is_finite(&self) -> bool {
        self.weights.is_finite() && self.biases.iter().all(|b| b.is_finite())
    }

    /// Every trainable value, weights row by row and then biases.
    pub fn params_mut(&mut self) -> impl Iterator<Item = &mut f64> {
        self.weights.data.iter_mut().flatten().chain(self.biases.iter_mut())
    }
}

/// Storage shaped exactly like one layer's parameters. Used for gradients
/// and for every per-layer optimizer accumulator.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamBuffer {
    pub weights: Matrix,
    pub biases: Vec<f64>,
}

impl ParamBuffer {
    pub fn zeros_like(layer: &DenseLayer) -> ParamBuffer {
        ParamBuffer {
            weights: Matrix::zeros(layer.weights.rows, layer.weights.cols),
            biases: vec![0.0; layer.biases.len()],
        }
    }

    pub fn matches(&self, layer: &DenseLayer) -> bool {
        self.weights.same_shape(&layer.weights) && self.biases.len() == layer.biases.len()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.weights.data.iter().flatten().chain(self.biases.iter()).copied()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut f64> {
        self.weights.data.iter_mut().flatten().chain(self.biases.iter_mut())
    }

    pub fn is_finite(&self) -> bool {
        self.values().all(f64::is_finite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_adds_bias_then_activates() {
        let layer = DenseLayer {
            weights: Matrix::from_data(vec![vec![1.0, -1.0], vec![2.0, 0.5]]),
            biases: vec![0.5, -3.0],
            activation: Activation::Relu,
        };
        let (z, a) = layer.forward(&[1.0, 1.0]);
        assert_eq!(z, vec![3.5, -3.5]);
        assert_eq!(a, vec![3.5, 0.0]);
    }

    #[test]
    fn param_buffer_mirrors_layer_shape() {
        let mut rng = rand::thread_rng();
        let layer = DenseLayer::new(3, 2, Activation::Tanh, WeightInit::He, &mut rng);
        let buf = ParamBuffer::zeros_like(&layer);
        assert!(buf.matches(&layer));
        assert_eq!(buf.values().count(), 3 * 2 + 2);
        assert_eq!(layer.biases, vec![BIAS_INIT; 2]);
    }
}
