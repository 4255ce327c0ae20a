use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Serialize, Deserialize};

use crate::network::{EngineState, Network};
use crate::preprocess::Preprocessor;
use crate::registry::config::ModelConfig;
use crate::registry::task::TaskType;
use crate::train::{EpochStats, TrainingRun};

/// Seconds since the Unix epoch.
pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Summary of the last successful training session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub loss: f64,
    pub accuracy: f64,
    pub val_loss: Option<f64>,
    pub val_accuracy: Option<f64>,
    pub epochs_run: usize,
    pub best_epoch: Option<usize>,
    pub early_stopped: bool,
    pub trained_at: u64,
}

impl ModelMetrics {
    pub fn from_run(run: &TrainingRun) -> ModelMetrics {
        ModelMetrics {
            loss: run.train.loss,
            accuracy: run.train.accuracy,
            val_loss: run.validation.map(|e| e.loss),
            val_accuracy: run.validation.map(|e| e.accuracy),
            epochs_run: run.epochs_run(),
            best_epoch: run.best_epoch,
            early_stopped: run.early_stopped,
            trained_at: unix_now(),
        }
    }
}

/// One registered model and, once trained, the network that serves it.
#[derive(Debug, Clone)]
pub struct ModelEntry {
    pub id: String,
    pub config: ModelConfig,
    pub network: Option<Network>,
    pub preprocessor: Preprocessor,
    pub metrics: Option<ModelMetrics>,
    pub history: Vec<EpochStats>,
    /// Reconstruction-error threshold of anomaly models.
    pub anomaly_threshold: Option<f64>,
}

impl ModelEntry {
    pub fn new(id: String, config: ModelConfig) -> ModelEntry {
        ModelEntry {
            id,
            config,
            network: None,
            preprocessor: Preprocessor::identity(),
            metrics: None,
            history: Vec::new(),
            anomaly_threshold: None,
        }
    }

    pub fn is_trained(&self) -> bool {
        self.network.is_some()
    }

    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            id: self.id.clone(),
            task: self.config.task,
            config: self.config.clone(),
            trained: self.is_trained(),
            engine_state: self.network.as_ref().map(Network::state),
            parameter_count: self.config.architecture.parameter_count(),
            metrics: self.metrics.clone(),
            anomaly_threshold: self.anomaly_threshold,
        }
    }
}

/// Read-only view of a registry entry handed to collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub task: TaskType,
    pub config: ModelConfig,
    pub trained: bool,
    pub engine_state: Option<EngineState>,
    pub parameter_count: usize,
    pub metrics: Option<ModelMetrics>,
    pub anomaly_threshold: Option<f64>,
}
