use serde::{Serialize, Deserialize};

use crate::error::{NnError, Result};

/// Input transformation applied before training and before every prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preprocessing {
    #[default]
    None,
    /// Per-feature min-max scaling to [0, 1].
    Normalize,
    /// Per-feature z-score.
    Standardize,
    /// Inputs are already token features (see `tokenize_text`); passed through.
    Tokenize,
}

/// A `Preprocessing` method together with the per-feature statistics it
/// was fitted on. `x' = (x - offset) / scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    pub method: Preprocessing,
    offsets: Vec<f64>,
    scales: Vec<f64>,
}

impl Preprocessor {
    pub fn identity() -> Preprocessor {
        Preprocessor { method: Preprocessing::None, offsets: vec![], scales: vec![] }
    }

    /// Learns feature statistics from `inputs`. Constant features get a
    /// scale of 1 so they map to 0 instead of dividing by zero.
    pub fn fit(method: Preprocessing, inputs: &[Vec<f64>]) -> Result<Preprocessor> {
        if matches!(method, Preprocessing::None | Preprocessing::Tokenize) {
            return Ok(Preprocessor { method, offsets: vec![], scales: vec![] });
        }
        let width = match inputs.first() {
            Some(row) => row.len(),
            None => return Err(NnError::InsufficientData("cannot fit preprocessing on no samples".into())),
        };
        if let Some(row) = inputs.iter().find(|r| r.len() != width) {
            return Err(NnError::shape("preprocessing input", row.len(), width));
        }
        let n = inputs.len() as f64;
        let column = |j: usize| inputs.iter().map(move |r| r[j]);

        let (offsets, scales) = (0..width)
            .map(|j| match method {
                Preprocessing::Normalize => {
                    let min = column(j).fold(f64::INFINITY, f64::min);
                    let max = column(j).fold(f64::NEG_INFINITY, f64::max);
                    (min, non_zero(max - min))
                }
                _ => {
                    let mean = column(j).sum::<f64>() / n;
                    let var = column(j).map(|x| (x - mean).powi(2)).sum::<f64>() / n;
                    (mean, non_zero(var.sqrt()))
                }
            })
            .unzip();
        Ok(Preprocessor { method, offsets, scales })
    }

    pub fn is_identity(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn transform(&self, input: &[f64]) -> Result<Vec<f64>> {
        if self.is_identity() {
            return Ok(input.to_vec());
        }
        if input.len() != self.offsets.len() {
            return Err(NnError::shape("preprocessing input", input.len(), self.offsets.len()));
        }
        Ok(input
            .iter()
            .zip(self.offsets.iter().zip(self.scales.iter()))
            .map(|(x, (o, s))| (x - o) / s)
            .collect())
    }

    pub fn transform_all(&self, inputs: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        inputs.iter().map(|x| self.transform(x)).collect()
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Preprocessor::identity()
    }
}

fn non_zero(scale: f64) -> f64 {
    if scale.abs() < f64::EPSILON { 1.0 } else { scale }
}

/// Hashes lower-cased alphanumeric tokens into `width` buckets and returns
/// the bag-of-words frequencies (summing to 1 for non-empty text).
pub fn tokenize_text(text: &str, width: usize) -> Vec<f64> {
    let mut features = vec![0.0; width];
    if width == 0 {
        return features;
    }
    let tokens: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect();
    if tokens.is_empty() {
        return features;
    }
    let weight = 1.0 / tokens.len() as f64;
    for token in &tokens {
        features[(fnv1a(token.as_bytes()) % width as u64) as usize] += weight;
    }
    features
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, &b| {
        (hash ^ b as u64).wrapping_mul(0x0000_0100_0000_01b3)
    })
}
