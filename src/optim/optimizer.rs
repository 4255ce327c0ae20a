use serde::{Serialize, Deserialize};

fn default_momentum() -> f64 { 0.9 }
fn default_beta1() -> f64 { 0.9 }
fn default_beta2() -> f64 { 0.999 }
fn default_decay() -> f64 { 0.9 }
fn default_epsilon() -> f64 { 1e-8 }

/// Gradient-descent variant used by `Network::update_weights`.
///
/// Serialised internally tagged, e.g. `{"type": "adam"}`; omitted
/// hyperparameters fall back to the usual defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Optimizer {
    /// `w -= lr · g`
    Sgd,
    /// `v = μ·v - lr·g; w += v`
    Momentum {
        #[serde(default = "default_momentum")]
        momentum: f64,
    },
    /// Bias-corrected first/second moments with a global step counter.
    Adam {
        #[serde(default = "default_beta1")]
        beta1: f64,
        #[serde(default = "default_beta2")]
        beta2: f64,
        #[serde(default = "default_epsilon")]
        epsilon: f64,
    },
    /// `c = d·c + (1-d)·g²; w -= lr · g / (√c + ε)`
    RmsProp {
        #[serde(default = "default_decay")]
        decay: f64,
        #[serde(default = "default_epsilon")]
        epsilon: f64,
    },
}

impl Optimizer {
    pub fn momentum() -> Optimizer {
        Optimizer::Momentum { momentum: default_momentum() }
    }

    pub fn adam() -> Optimizer {
        Optimizer::Adam {
            beta1: default_beta1(),
            beta2: default_beta2(),
            epsilon: default_epsilon(),
        }
    }

    pub fn rms_prop() -> Optimizer {
        Optimizer::RmsProp { decay: default_decay(), epsilon: default_epsilon() }
    }
}

impl Default for Optimizer {
    fn default() -> Self {
        Optimizer::adam()
    }
}
