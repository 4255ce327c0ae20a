use serde::{Serialize, Deserialize};

/// How far a reconstruction error exceeds the anomaly threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Buckets `error / threshold`: below 1.5 low, below 2.5 medium,
    /// below 4 high, otherwise critical.
    pub fn from_ratio(ratio: f64) -> Severity {
        if ratio < 1.5 {
            Severity::Low
        } else if ratio < 2.5 {
            Severity::Medium
        } else if ratio < 4.0 {
            Severity::High
        } else {
            Severity::Critical
        }
    }

    pub fn classify(error: f64, threshold: f64) -> Severity {
        Severity::from_ratio(error / threshold)
    }
}

/// Root-mean-square element-wise difference between an input and its
/// reconstruction.
pub fn reconstruction_error(input: &[f64], reconstruction: &[f64]) -> f64 {
    if input.is_empty() {
        return 0.0;
    }
    let sq: f64 = input.iter().zip(reconstruction.iter()).map(|(a, b)| (a - b).powi(2)).sum();
    (sq / input.len() as f64).sqrt()
}

/// Threshold learned from the errors on normal data: `mean + 2·std`,
/// floored at a tiny positive value so ratios stay finite.
pub fn learn_threshold(errors: &[f64]) -> f64 {
    if errors.is_empty() {
        return f64::EPSILON;
    }
    let n = errors.len() as f64;
    let mean = errors.iter().sum::<f64>() / n;
    let var = errors.iter().map(|e| (e - mean).powi(2)).sum::<f64>() / n;
    (mean + 2.0 * var.sqrt()).max(f64::EPSILON)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_buckets() {
        let t = 0.2;
        assert_eq!(Severity::classify(1.2 * t, t), Severity::Low);
        assert_eq!(Severity::classify(2.0 * t, t), Severity::Medium);
        assert_eq!(Severity::classify(3.0 * t, t), Severity::High);
        assert_eq!(Severity::classify(5.0 * t, t), Severity::Critical);
        assert_eq!(Severity::from_ratio(4.0), Severity::Critical);
        assert_eq!(Severity::from_ratio(2.5), Severity::High);
    }

    #[test]
    fn rmse_reconstruction_error() {
        assert_eq!(reconstruction_error(&[1.0, 1.0, 1.0, 1.0], &[1.0, 1.0, 1.0, 1.0]), 0.0);
        assert!((reconstruction_error(&[0.0, 0.0], &[3.0, 4.0]) - 12.5f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn threshold_sits_above_typical_error() {
        let t = learn_threshold(&[0.1, 0.1, 0.1, 0.1]);
        assert!((t - 0.1).abs() < 1e-12);
        assert!(learn_threshold(&[0.1, 0.3]) > 0.3);
    }
}
