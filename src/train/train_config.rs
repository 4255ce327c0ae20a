use std::sync::mpsc;
use std::sync::{Arc, atomic::AtomicBool};

use serde::{Serialize, Deserialize};

use crate::error::{NnError, Result};
use crate::loss::LossType;
use crate::optim::Optimizer;
use crate::train::epoch_stats::TrainingEvent;

/// How the samples of one mini-batch turn into weight updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchMode {
    /// One update per sample (online SGD). Batches only group progress.
    #[default]
    Online,
    /// Gradients are averaged over the batch and applied once.
    Averaged,
}

/// Configuration for a `train_loop` run.
///
/// # Fields
/// - `epochs`                  — maximum number of full passes over the training split
/// - `batch_size`              — samples per mini-batch
/// - `learning_rate`           — step size handed to the optimizer
/// - `optimizer`               — SGD, Momentum, Adam or RMSProp
/// - `loss_type`               — which loss function to use
/// - `batch_mode`              — online or gradient-averaged updates
/// - `validation_split`        — fraction of samples held out for validation, in [0, 1)
/// - `early_stopping_patience` — stop after this many epochs without improvement
/// - `shuffle`                 — reshuffle the training split every epoch
/// - `seed`                    — makes initialisation, split and shuffling reproducible
/// - `progress_tx` — optional channel sender receiving one `TrainingEvent::Epoch`
///                   per completed epoch plus a final completed/failed event.
///                   If the receiver is dropped the loop stops early.
/// - `stop_flag`   — optional atomic flag; when set to `true` from another
///                   thread the loop terminates after the current epoch.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub optimizer: Optimizer,
    pub loss_type: LossType,
    pub batch_mode: BatchMode,
    pub validation_split: f64,
    pub early_stopping_patience: Option<usize>,
    pub shuffle: bool,
    pub seed: Option<u64>,
    pub progress_tx: Option<mpsc::Sender<TrainingEvent>>,
    pub stop_flag: Option<Arc<AtomicBool>>,
}

impl TrainConfig {
    /// Creates a `TrainConfig` with default optimizer settings, no
    /// validation split, no early stopping, no progress channel and no stop flag.
    pub fn new(epochs: usize, batch_size: usize, loss_type: LossType) -> Self {
        TrainConfig {
            epochs,
            batch_size,
            loss_type,
            validation_split: 0.0,
            early_stopping_patience: None,
            ..TrainConfig::default()
        }
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_optimizer(mut self, optimizer: Optimizer) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn with_validation(mut self, split: f64, patience: Option<usize>) -> Self {
        self.validation_split = split;
        self.early_stopping_patience = patience;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(NnError::Configuration("epochs must be at least 1".into()));
        }
        if self.batch_size == 0 {
            return Err(NnError::Configuration("batch_size must be at least 1".into()));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate >= 0.0) {
            return Err(NnError::Configuration(format!(
                "learning rate {} is not a non-negative number",
                self.learning_rate
            )));
        }
        if !(0.0..1.0).contains(&self.validation_split) {
            return Err(NnError::Configuration(format!(
                "validation split {} is outside [0, 1)",
                self.validation_split
            )));
        }
        Ok(())
    }
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            epochs: 100,
            batch_size: 32,
            learning_rate: 0.01,
            optimizer: Optimizer::default(),
            loss_type: LossType::default(),
            batch_mode: BatchMode::default(),
            validation_split: 0.2,
            early_stopping_patience: Some(10),
            shuffle: true,
            seed: None,
            progress_tx: None,
            stop_flag: None,
        }
    }
}
