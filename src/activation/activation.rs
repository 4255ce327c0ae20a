use serde::{Serialize, Deserialize};

/// Activation applied after a layer's linear transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Relu,
    LeakyRelu { alpha: f64 },
    Sigmoid,
    Tanh,
    /// Vector-valued; `apply()` normalises over the whole layer. The
    /// element-wise `function()` is the identity on logits for this variant.
    Softmax,
    Linear,
}

impl Activation {
    /// Leaky ReLU with the conventional 0.01 slope.
    pub fn leaky_relu() -> Activation {
        Activation::LeakyRelu { alpha: 0.01 }
    }

    /// Element-wise activation. Softmax cannot be expressed per element, use
    /// `apply()` instead; here it passes the logit through.
    pub fn function(&self, x: f64) -> f64 {
        match self {
            Activation::Relu => if x > 0.0 { x } else { 0.0 },
            Activation::LeakyRelu { alpha } => if x > 0.0 { x } else { alpha * x },
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activation::Tanh => x.tanh(),
            Activation::Softmax => x,
            Activation::Linear => x,
        }
    }

    /// Element-wise derivative evaluated at the pre-activation `x`.
    ///
    /// For `Softmax` the layer is paired with cross-entropy whose output
    /// gradient is already `o - t` with respect to the logits, so the
    /// Jacobian is not applied a second time and this returns `1.0`.
    pub fn derivative(&self, x: f64) -> f64 {
        match self {
            Activation::Relu => if x > 0.0 { 1.0 } else { 0.0 },
            Activation::LeakyRelu { alpha } => if x > 0.0 { 1.0 } else { *alpha },
            Activation::Sigmoid => {
                let fx = self.function(x);
                fx * (1.0 - fx)
            }
            Activation::Tanh => {
                let t = x.tanh();
                1.0 - t * t
            }
            Activation::Softmax => 1.0,
            Activation::Linear => 1.0,
        }
    }

    /// Applies the activation to a whole layer of pre-activations.
    pub fn apply(&self, z: &[f64]) -> Vec<f64> {
        match self {
            Activation::Softmax => softmax(z),
            _ => z.iter().map(|&x| self.function(x)).collect(),
        }
    }

    /// Element-wise derivative over a whole layer.
    pub fn derivative_vec(&self, z: &[f64]) -> Vec<f64> {
        z.iter().map(|&x| self.derivative(x)).collect()
    }
}

/// Numerically stable softmax: the maximum logit is subtracted before
/// exponentiating so large inputs cannot overflow.
pub fn softmax(z: &[f64]) -> Vec<f64> {
    let max = z.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = z.iter().map(|&x| (x - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
