use serde::{Serialize, Deserialize};

use crate::activation::Activation;
use crate::loss::LossType;
use crate::network::{Architecture, WeightInit};
use crate::preprocess::Preprocessing;

/// What a registered model is for; drives default architectures and the
/// post-processing applied to its raw outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    TimeSeries,
    Anomaly,
    Classification,
    Clustering,
    Regression,
    Sequence,
}

impl TaskType {
    /// Loss that pairs with the task's default output activation.
    pub fn default_loss(&self) -> LossType {
        match self {
            TaskType::Classification | TaskType::Sequence => LossType::CrossEntropy,
            TaskType::TimeSeries | TaskType::Anomaly | TaskType::Clustering | TaskType::Regression => {
                LossType::Mse
            }
        }
    }

    pub fn default_preprocessing(&self) -> Preprocessing {
        match self {
            TaskType::TimeSeries | TaskType::Anomaly | TaskType::Clustering => Preprocessing::Normalize,
            TaskType::Regression => Preprocessing::Standardize,
            TaskType::Classification => Preprocessing::None,
            TaskType::Sequence => Preprocessing::Tokenize,
        }
    }

    /// A reasonable architecture for the task. Anomaly models are
    /// autoencoders, so `output_size` is ignored and set to `input_size`.
    pub fn default_architecture(&self, input_size: usize, output_size: usize) -> Architecture {
        let half = (input_size / 2).max(1);
        match self {
            TaskType::Anomaly => Architecture::new(
                input_size,
                vec![half, (input_size / 4).max(1), half],
                input_size,
                Activation::Relu,
                Activation::Sigmoid,
            )
            .with_weight_init(WeightInit::He),
            TaskType::Classification | TaskType::Sequence => Architecture::new(
                input_size,
                vec![(input_size * 2).max(8), input_size.max(4)],
                output_size,
                Activation::Relu,
                Activation::Softmax,
            )
            .with_weight_init(WeightInit::He),
            TaskType::TimeSeries => Architecture::new(
                input_size,
                vec![(input_size * 2).max(8), input_size.max(4)],
                output_size,
                Activation::Tanh,
                Activation::Linear,
            ),
            TaskType::Regression => Architecture::new(
                input_size,
                vec![(input_size * 2).max(8)],
                output_size,
                Activation::Relu,
                Activation::Linear,
            )
            .with_weight_init(WeightInit::He),
            TaskType::Clustering => Architecture::new(
                input_size,
                vec![(input_size * 2).max(8)],
                output_size,
                Activation::Tanh,
                Activation::Tanh,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anomaly_default_is_an_autoencoder() {
        let arch = TaskType::Anomaly.default_architecture(8, 3);
        assert_eq!(arch.layer_sizes(), vec![8, 4, 2, 4, 8]);
        assert!(arch.validate().is_ok());
        let tiny = TaskType::Anomaly.default_architecture(1, 1);
        assert_eq!(tiny.layer_sizes(), vec![1, 1, 1, 1, 1]);
    }

    #[test]
    fn classification_defaults_to_softmax() {
        let arch = TaskType::Classification.default_architecture(4, 3);
        assert_eq!(arch.output_activation, Activation::Softmax);
        assert_eq!(TaskType::Classification.default_loss(), LossType::CrossEntropy);
    }
}
