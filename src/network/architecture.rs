use serde::{Serialize, Deserialize};

use crate::activation::Activation;
use crate::error::{NnError, Result};

/// Scale used by `WeightInit::Fixed`.
pub const FIXED_INIT_SCALE: f64 = 0.1;

/// How the Gaussian weight noise of each layer is scaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightInit {
    /// `sqrt(2 / (fan_in + fan_out))`
    #[default]
    Xavier,
    /// `sqrt(2 / fan_in)`, suited to ReLU layers.
    He,
    /// `sqrt(1 / fan_in)`
    #[serde(rename = "lecun")]
    LeCun,
    /// A small constant scale, independent of layer size.
    #[serde(alias = "default")]
    Fixed,
}

impl WeightInit {
    pub fn scale(&self, fan_in: usize, fan_out: usize) -> f64 {
        match self {
            WeightInit::Xavier => (2.0 / (fan_in + fan_out) as f64).sqrt(),
            WeightInit::He => (2.0 / fan_in as f64).sqrt(),
            WeightInit::LeCun => (1.0 / fan_in as f64).sqrt(),
            WeightInit::Fixed => FIXED_INIT_SCALE,
        }
    }
}

/// Layer widths plus activation choices. Fixed once a `Network` is built.
///
/// Serialises with the camelCase keys external collaborators send:
/// `{inputSize, hiddenLayers, outputSize, activation, outputActivation, weightInit}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Architecture {
    pub input_size: usize,
    #[serde(default)]
    pub hidden_layers: Vec<usize>,
    pub output_size: usize,
    pub activation: Activation,
    pub output_activation: Activation,
    #[serde(default)]
    pub weight_init: WeightInit,
}

impl Architecture {
    pub fn new(
        input_size: usize,
        hidden_layers: Vec<usize>,
        output_size: usize,
        activation: Activation,
        output_activation: Activation,
    ) -> Architecture {
        Architecture {
            input_size,
            hidden_layers,
            output_size,
            activation,
            output_activation,
            weight_init: WeightInit::default(),
        }
    }

    pub fn with_weight_init(mut self, weight_init: WeightInit) -> Architecture {
        self.weight_init = weight_init;
        self
    }

    /// Every width must be a positive integer.
    pub fn validate(&self) -> Result<()> {
        if self.input_size == 0 {
            return Err(NnError::Configuration("input size must be positive".into()));
        }
        if self.output_size == 0 {
            return Err(NnError::Configuration("output size must be positive".into()));
        }
        if let Some(i) = self.hidden_layers.iter().position(|&w| w == 0) {
            return Err(NnError::Configuration(format!(
                "hidden layer {i} has zero width"
            )));
        }
        if self.activation == Activation::Softmax {
            return Err(NnError::Configuration(
                "softmax is only supported as the output activation".into(),
            ));
        }
        Ok(())
    }

    /// `[input, h1..hk, output]`
    pub fn layer_sizes(&self) -> Vec<usize> {
        let mut sizes = Vec::with_capacity(self.hidden_layers.len() + 2);
        sizes.push(self.input_size);
        sizes.extend_from_slice(&self.hidden_layers);
        sizes.push(self.output_size);
        sizes
    }

    /// Number of weight matrices, one per layer boundary.
    pub fn layer_count(&self) -> usize {
        self.hidden_layers.len() + 1
    }

    /// Total number of trainable weights and biases.
    pub fn parameter_count(&self) -> usize {
        self.layer_sizes()
            .windows(2)
            .map(|w| w[0] * w[1] + w[1])
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_widths() {
        let arch = Architecture::new(2, vec![4, 0], 1, Activation::Relu, Activation::Sigmoid);
        assert!(matches!(arch.validate(), Err(NnError::Configuration(_))));
        let arch = Architecture::new(0, vec![], 1, Activation::Relu, Activation::Sigmoid);
        assert!(arch.validate().is_err());
    }

    #[test]
    fn parameter_count_sums_boundaries() {
        let arch = Architecture::new(2, vec![4], 1, Activation::Relu, Activation::Sigmoid);
        assert_eq!(arch.layer_sizes(), vec![2, 4, 1]);
        assert_eq!(arch.parameter_count(), 2 * 4 + 4 + 4 + 1);
    }

    #[test]
    fn parses_collaborator_config() {
        let json = r#"{
            "inputSize": 3,
            "hiddenLayers": [8, 4],
            "outputSize": 2,
            "activation": "tanh",
            "outputActivation": "softmax",
            "weightInit": "lecun"
        }"#;
        let arch: Architecture = serde_json::from_str(json).unwrap();
        assert_eq!(arch.layer_sizes(), vec![3, 8, 4, 2]);
        assert_eq!(arch.weight_init, WeightInit::LeCun);
        assert_eq!(arch.output_activation, Activation::Softmax);
    }

    #[test]
    fn init_scales() {
        assert!((WeightInit::He.scale(8, 2) - 0.5).abs() < 1e-12);
        assert!((WeightInit::Xavier.scale(3, 5) - 0.5).abs() < 1e-12);
        assert!((WeightInit::LeCun.scale(4, 9) - 0.5).abs() < 1e-12);
        assert_eq!(WeightInit::Fixed.scale(100, 100), FIXED_INIT_SCALE);
    }
}
