use serde::{Serialize, Deserialize};

use crate::network::Evaluation;

/// Per-epoch training statistics emitted by `train_loop`.
///
/// When a `progress_tx` channel is configured in `TrainConfig`, the training
/// loop sends one `TrainingEvent::Epoch` at the end of every completed epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Maximum epochs requested for this run.
    pub total_epochs: usize,
    /// Mean training loss over all samples in this epoch.
    pub loss: f64,
    /// Training accuracy in [0, 1], measured after the epoch's last update.
    pub accuracy: f64,
    /// Mean validation loss, if a validation split exists.
    pub val_loss: Option<f64>,
    pub val_accuracy: Option<f64>,
    /// Wall-clock duration of this single epoch in milliseconds.
    pub elapsed_ms: u64,
}

/// Observability events for external collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TrainingEvent {
    Epoch(EpochStats),
    Completed {
        epochs_run: usize,
        best_epoch: Option<usize>,
        early_stopped: bool,
        train: Evaluation,
        validation: Option<Evaluation>,
    },
    Failed {
        epoch: usize,
        error: String,
    },
}
