use std::sync::atomic::Ordering;
use std::time::Instant;

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{NnError, Result};
use crate::network::{Evaluation, Network, WeightBundle};
use crate::train::dataset::Dataset;
use crate::train::epoch_stats::{EpochStats, TrainingEvent};
use crate::train::train_config::{BatchMode, TrainConfig};

/// Result of a training session that ran to the end (or stopped early).
#[derive(Debug, Clone)]
pub struct TrainingRun {
    pub history: Vec<EpochStats>,
    /// Epoch whose weights were restored, if any epoch completed.
    pub best_epoch: Option<usize>,
    /// Validation loss (or training loss without a validation split) at
    /// `best_epoch`.
    pub best_loss: Option<f64>,
    pub best_weights: Option<WeightBundle>,
    /// True when patience ran out before `epochs` was reached.
    pub early_stopped: bool,
    /// True when the stop flag or a dropped progress receiver ended the run.
    pub cancelled: bool,
    /// Metrics of the restored weights on the training split.
    pub train: Evaluation,
    /// Metrics of the restored weights on the validation split.
    pub validation: Option<Evaluation>,
}

impl TrainingRun {
    /// The monitored loss stopped improving.
    pub fn converged(&self) -> bool {
        self.early_stopped
    }

    pub fn epochs_run(&self) -> usize {
        self.history.len()
    }
}

/// Either a finished run or a failure with the history recorded so far.
#[derive(Debug)]
pub enum TrainingOutcome {
    Completed(TrainingRun),
    Failed {
        error: NnError,
        partial_history: Vec<EpochStats>,
    },
}

impl TrainingOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TrainingOutcome::Completed(_))
    }

    pub fn history(&self) -> &[EpochStats] {
        match self {
            TrainingOutcome::Completed(run) => &run.history,
            TrainingOutcome::Failed { partial_history, .. } => partial_history,
        }
    }

    pub fn run(&self) -> Option<&TrainingRun> {
        match self {
            TrainingOutcome::Completed(run) => Some(run),
            TrainingOutcome::Failed { .. } => None,
        }
    }
}

/// Trains `network` on `dataset`.
///
/// The dataset is split into training and validation parts, then each epoch
/// shuffles the training indices, feeds fixed-size batches through
/// `Network::train_batch`, and evaluates. Whenever the monitored loss
/// (validation loss, or training loss without a validation split) improves,
/// the weights are snapshotted; after `early_stopping_patience` epochs
/// without improvement the loop stops. The best snapshot is restored before
/// the final evaluation.
///
/// Invalid configuration or a dataset that does not fit the network returns
/// `Err`. Failures during training return `TrainingOutcome::Failed` with
/// the epochs completed so far.
///
/// # Early termination
/// Besides early stopping, the loop breaks after the current epoch if the
/// `progress_tx` receiver has been dropped or `config.stop_flag` is set.
pub fn train_loop(network: &mut Network, dataset: &Dataset, config: &TrainConfig) -> Result<TrainingOutcome> {
    config.validate()?;
    if dataset.is_empty() {
        return Err(NnError::InsufficientData("dataset has no samples".into()));
    }
    let arch = network.architecture();
    if dataset.input_width() != arch.input_size {
        return Err(NnError::shape("dataset inputs", dataset.input_width(), arch.input_size));
    }
    if dataset.target_width() != arch.output_size {
        return Err(NnError::shape("dataset targets", dataset.target_width(), arch.output_size));
    }

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let (train, val) = dataset.split(config.validation_split, &mut rng);
    debug!(
        "training on {} samples, validating on {}",
        train.len(),
        val.as_ref().map(|v| v.len()).unwrap_or(0)
    );

    let mut history: Vec<EpochStats> = Vec::new();
    let mut best: Option<(usize, f64, WeightBundle)> = None;
    let mut since_improvement = 0usize;
    let mut early_stopped = false;
    let mut cancelled = false;
    let mut indices: Vec<usize> = (0..train.len()).collect();

    for epoch in 1..=config.epochs {
        if stop_requested(config) {
            cancelled = true;
            break;
        }

        let t_start = Instant::now();

        // ── One full pass over the training split ─────────────────────────
        if config.shuffle {
            indices.shuffle(&mut rng);
        }
        let mut total_loss = 0.0;
        for batch in indices.chunks(config.batch_size) {
            let inputs: Vec<Vec<f64>> = batch.iter().map(|&i| train.inputs[i].clone()).collect();
            let targets: Vec<Vec<f64>> = batch.iter().map(|&i| train.targets[i].clone()).collect();
            let res = match config.batch_mode {
                BatchMode::Online => network.train_batch(
                    &inputs, &targets, config.learning_rate, config.optimizer, config.loss_type,
                ),
                BatchMode::Averaged => network.train_batch_averaged(
                    &inputs, &targets, config.learning_rate, config.optimizer, config.loss_type,
                ),
            };
            match res {
                Ok(batch_loss) => total_loss += batch_loss * batch.len() as f64,
                Err(error) => return Ok(fail(error, epoch, history, config)),
            }
        }
        let loss = total_loss / train.len() as f64;

        // ── Evaluation ────────────────────────────────────────────────────
        let train_eval = match network.evaluate(&train.inputs, &train.targets, config.loss_type) {
            Ok(e) => e,
            Err(error) => return Ok(fail(error, epoch, history, config)),
        };
        let val_eval = match val.as_ref().map(|v| network.evaluate(&v.inputs, &v.targets, config.loss_type)) {
            Some(Ok(e)) => Some(e),
            Some(Err(error)) => return Ok(fail(error, epoch, history, config)),
            None => None,
        };

        let stats = EpochStats {
            epoch,
            total_epochs: config.epochs,
            loss,
            accuracy: train_eval.accuracy,
            val_loss: val_eval.map(|e| e.loss),
            val_accuracy: val_eval.map(|e| e.accuracy),
            elapsed_ms: t_start.elapsed().as_millis() as u64,
        };
        debug!(
            "epoch {}/{}: loss={:.6} acc={:.4} val_loss={:?} val_acc={:?}",
            epoch, config.epochs, stats.loss, stats.accuracy, stats.val_loss, stats.val_accuracy
        );
        history.push(stats.clone());

        // ── Best-weight snapshot and patience ─────────────────────────────
        let monitored = val_eval.map(|e| e.loss).unwrap_or(train_eval.loss);
        let improved = best.as_ref().map_or(true, |(_, best_loss, _)| monitored < *best_loss);
        if improved {
            best = Some((epoch, monitored, network.save_weights()));
            since_improvement = 0;
        } else {
            since_improvement += 1;
        }

        // ── Emit progress ─────────────────────────────────────────────────
        if let Some(ref tx) = config.progress_tx {
            // If the receiver has been dropped, stop training.
            if tx.send(TrainingEvent::Epoch(stats)).is_err() {
                cancelled = true;
                break;
            }
        }

        if let Some(patience) = config.early_stopping_patience {
            if since_improvement >= patience {
                info!("early stopping at epoch {epoch}: no improvement for {patience} epochs");
                early_stopped = epoch < config.epochs;
                break;
            }
        }
    }

    if cancelled {
        warn!("training cancelled after {} epochs", history.len());
    }

    if let Some((_, _, ref weights)) = best {
        if let Err(error) = network.load_weights(weights) {
            let epoch = history.len();
            return Ok(fail(error, epoch, history, config));
        }
    }

    let final_train = network.evaluate(&train.inputs, &train.targets, config.loss_type);
    let final_val = val.as_ref().map(|v| network.evaluate(&v.inputs, &v.targets, config.loss_type)).transpose();
    let (train_eval, val_eval) = match (final_train, final_val) {
        (Ok(t), Ok(v)) => (t, v),
        (Err(error), _) | (_, Err(error)) => {
            let epoch = history.len();
            return Ok(fail(error, epoch, history, config));
        }
    };

    let (best_epoch, best_loss, best_weights) = match best {
        Some((epoch, loss, weights)) => (Some(epoch), Some(loss), Some(weights)),
        None => (None, None, None),
    };

    info!(
        "training finished after {} epochs (best epoch {:?}): loss={:.6} acc={:.4}",
        history.len(),
        best_epoch,
        train_eval.loss,
        train_eval.accuracy
    );
    if let Some(ref tx) = config.progress_tx {
        let _ = tx.send(TrainingEvent::Completed {
            epochs_run: history.len(),
            best_epoch,
            early_stopped,
            train: train_eval,
            validation: val_eval,
        });
    }

    Ok(TrainingOutcome::Completed(TrainingRun {
        history,
        best_epoch,
        best_loss,
        best_weights,
        early_stopped,
        cancelled,
        train: train_eval,
        validation: val_eval,
    }))
}

fn stop_requested(config: &TrainConfig) -> bool {
    config
        .stop_flag
        .as_ref()
        .map_or(false, |flag| flag.load(Ordering::Relaxed))
}

fn fail(error: NnError, epoch: usize, history: Vec<EpochStats>, config: &TrainConfig) -> TrainingOutcome {
    warn!("training failed at epoch {epoch}: {error}");
    if let Some(ref tx) = config.progress_tx {
        let _ = tx.send(TrainingEvent::Failed { epoch, error: error.to_string() });
    }
    TrainingOutcome::Failed { error, partial_history: history }
}
