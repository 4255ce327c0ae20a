use serde::{Serialize, Deserialize};

use crate::registry::anomaly::Severity;

/// Task-specific interpretation of a raw network output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PredictionValue {
    /// Argmax class of a classifier or sequence model.
    Class { index: usize, label: Option<String> },
    /// Output values of a regression, time-series or embedding model.
    Values { values: Vec<f64> },
    /// Reconstruction error of an autoencoder.
    ReconstructionError { error: f64, anomalous: bool },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub prediction: PredictionValue,
    pub confidence: f64,
    /// Network output before post-processing.
    pub raw: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedClass {
    pub index: usize,
    pub label: Option<String>,
    pub probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub index: usize,
    pub label: Option<String>,
    pub probability: f64,
    /// The `top_k` most probable classes, most probable first.
    pub top: Vec<RankedClass>,
    /// Probabilities of every class, in output order.
    pub distribution: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyScore {
    pub index: usize,
    pub error: f64,
    pub anomalous: bool,
    /// Set only for anomalous samples.
    pub severity: Option<Severity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    pub threshold: f64,
    pub scores: Vec<AnomalyScore>,
}

impl AnomalyReport {
    pub fn anomalies(&self) -> impl Iterator<Item = &AnomalyScore> {
        self.scores.iter().filter(|s| s.anomalous)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    /// 1-based number of steps past the end of the supplied history.
    pub step: usize,
    pub value: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterAssignment {
    pub cluster: usize,
    pub embedding: Vec<f64>,
}
