use serde::{Serialize, Deserialize};

use crate::loss::{bce::BceLoss, cross_entropy::CrossEntropyLoss, mse::MseLoss};

/// Selects which loss function training and evaluation use.
///
/// - `Mse`                — Mean-squared error; pair with Linear or Sigmoid output.
/// - `CrossEntropy`       — Categorical cross-entropy; pair with Softmax output.
/// - `BinaryCrossEntropy` — Binary cross-entropy; pair with Sigmoid output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossType {
    #[default]
    Mse,
    CrossEntropy,
    BinaryCrossEntropy,
}

impl LossType {
    /// Scalar loss for one sample.
    pub fn loss(&self, predicted: &[f64], expected: &[f64]) -> f64 {
        match self {
            LossType::Mse                => MseLoss::loss(predicted, expected),
            LossType::CrossEntropy       => CrossEntropyLoss::loss(predicted, expected),
            LossType::BinaryCrossEntropy => BceLoss::loss(predicted, expected),
        }
    }

    /// Per-output gradient of the loss with respect to the network output.
    pub fn gradient(&self, predicted: &[f64], expected: &[f64]) -> Vec<f64> {
        match self {
            LossType::Mse                => MseLoss::derivative(predicted, expected),
            LossType::CrossEntropy       => CrossEntropyLoss::derivative(predicted, expected),
            LossType::BinaryCrossEntropy => BceLoss::derivative(predicted, expected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mse_gradient_is_twice_the_error() {
        let g = LossType::Mse.gradient(&[0.5, 1.0], &[0.0, 1.5]);
        assert_eq!(g, vec![1.0, -1.0]);
        assert!((LossType::Mse.loss(&[0.5, 1.0], &[0.0, 1.5]) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn cross_entropy_on_one_hot() {
        let p = [0.7, 0.2, 0.1];
        let t = [1.0, 0.0, 0.0];
        assert!((LossType::CrossEntropy.loss(&p, &t) + 0.7f64.ln()).abs() < 1e-9);
        let g = LossType::CrossEntropy.gradient(&p, &t);
        assert!((g[0] + 0.3).abs() < 1e-12 && (g[1] - 0.2).abs() < 1e-12);
    }

    #[test]
    fn bce_gradient_times_sigmoid_slope_is_error() {
        let p = 0.8;
        let g = LossType::BinaryCrossEntropy.gradient(&[p], &[1.0])[0];
        assert!((g * p * (1.0 - p) - (p - 1.0)).abs() < 1e-9);
        assert!(LossType::BinaryCrossEntropy.loss(&[0.999], &[1.0]) < 0.01);
    }
}
