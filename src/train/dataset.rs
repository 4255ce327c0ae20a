use rand::{seq::SliceRandom, Rng};
use serde::{Serialize, Deserialize};

use crate::error::{NnError, Result};

/// One `{input, target}` record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub input: Vec<f64>,
    pub target: Vec<f64>,
}

/// Parallel input/target sequences of equal length and consistent widths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub inputs: Vec<Vec<f64>>,
    pub targets: Vec<Vec<f64>>,
}

fn check_widths(rows: &[Vec<f64>], what: &'static str) -> Result<()> {
    let width = rows[0].len();
    if width == 0 {
        return Err(NnError::InsufficientData(format!("{what} vectors are empty")));
    }
    if let Some(row) = rows.iter().find(|r| r.len() != width) {
        return Err(NnError::shape(what, row.len(), width));
    }
    Ok(())
}

impl Dataset {
    pub fn new(inputs: Vec<Vec<f64>>, targets: Vec<Vec<f64>>) -> Result<Dataset> {
        if inputs.is_empty() {
            return Err(NnError::InsufficientData("dataset has no samples".into()));
        }
        if inputs.len() != targets.len() {
            return Err(NnError::shape("targets", targets.len(), inputs.len()));
        }
        check_widths(&inputs, "input")?;
        check_widths(&targets, "target")?;
        Ok(Dataset { inputs, targets })
    }

    pub fn from_samples(samples: Vec<Sample>) -> Result<Dataset> {
        let (inputs, targets) = samples.into_iter().map(|s| (s.input, s.target)).unzip();
        Dataset::new(inputs, targets)
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn input_width(&self) -> usize {
        self.inputs.first().map(|r| r.len()).unwrap_or(0)
    }

    pub fn target_width(&self) -> usize {
        self.targets.first().map(|r| r.len()).unwrap_or(0)
    }

    fn subset(&self, indices: &[usize]) -> Dataset {
        Dataset {
            inputs: indices.iter().map(|&i| self.inputs[i].clone()).collect(),
            targets: indices.iter().map(|&i| self.targets[i].clone()).collect(),
        }
    }

    /// Shuffles sample indices and holds out `floor(len · fraction)` of them
    /// for validation, always leaving at least one training sample. Returns
    /// `None` for the validation part when nothing is held out.
    pub fn split<R: Rng + ?Sized>(&self, fraction: f64, rng: &mut R) -> (Dataset, Option<Dataset>) {
        let n = self.len();
        let n_val = ((n as f64 * fraction).floor() as usize).min(n.saturating_sub(1));
        if n_val == 0 {
            return (self.clone(), None);
        }
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(rng);
        let (val, train) = indices.split_at(n_val);
        (self.subset(train), Some(self.subset(val)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn ramp(n: usize) -> Dataset {
        let inputs = (0..n).map(|i| vec![i as f64]).collect();
        let targets = (0..n).map(|i| vec![2.0 * i as f64]).collect();
        Dataset::new(inputs, targets).unwrap()
    }

    #[test]
    fn rejects_empty_and_ragged_data() {
        assert!(matches!(Dataset::new(vec![], vec![]), Err(NnError::InsufficientData(_))));
        assert!(matches!(
            Dataset::new(vec![vec![1.0]], vec![]),
            Err(NnError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            Dataset::new(vec![vec![1.0], vec![1.0, 2.0]], vec![vec![0.0], vec![0.0]]),
            Err(NnError::ShapeMismatch { what: "input", .. })
        ));
    }

    #[test]
    fn split_keeps_pairs_together() {
        let data = ramp(10);
        let (train, val) = data.split(0.3, &mut StdRng::seed_from_u64(1));
        let val = val.unwrap();
        assert_eq!((train.len(), val.len()), (7, 3));
        for (x, y) in train.inputs.iter().chain(val.inputs.iter()).zip(train.targets.iter().chain(val.targets.iter())) {
            assert_eq!(y[0], 2.0 * x[0]);
        }
    }

    #[test]
    fn tiny_sets_are_not_split() {
        let (train, val) = ramp(1).split(0.5, &mut StdRng::seed_from_u64(1));
        assert_eq!(train.len(), 1);
        assert!(val.is_none());
    }

    #[test]
    fn from_samples_unzips_records() {
        let data = Dataset::from_samples(vec![
            Sample { input: vec![1.0, 2.0], target: vec![1.0] },
            Sample { input: vec![3.0, 4.0], target: vec![0.0] },
        ])
        .unwrap();
        assert_eq!(data.input_width(), 2);
        assert_eq!(data.target_width(), 1);
    }
}
