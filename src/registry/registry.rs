use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use log::{info, warn};

use crate::activation::{softmax, Activation};
use crate::error::{NnError, Result};
use crate::math::argmax;
use crate::network::Network;
use crate::preprocess::Preprocessor;
use crate::registry::anomaly::{learn_threshold, reconstruction_error, Severity};
use crate::registry::bundle::ExportBundle;
use crate::registry::config::ModelConfig;
use crate::registry::entry::{unix_now, ModelEntry, ModelInfo, ModelMetrics};
use crate::registry::results::{
    AnomalyReport, AnomalyScore, Classification, ClusterAssignment, Forecast, Prediction,
    PredictionValue, RankedClass,
};
use crate::registry::task::TaskType;
use crate::train::{train_loop, Dataset, TrainConfig, TrainingOutcome};

/// Registry type shared between threads; each handler locks it for the
/// duration of one call.
pub type SharedRegistry = Arc<Mutex<ModelRegistry>>;

/// Catalogue of named models. Constructed explicitly by the host and
/// passed to whoever needs it.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: BTreeMap<String, ModelEntry>,
}

impl ModelRegistry {
    pub fn new() -> ModelRegistry {
        ModelRegistry::default()
    }

    pub fn shared() -> SharedRegistry {
        Arc::new(Mutex::new(ModelRegistry::new()))
    }

    /// Stores `config` under `id`. Re-registering replaces the entry and
    /// drops any trained network.
    pub fn register_model(&mut self, id: impl Into<String>, config: ModelConfig) -> Result<()> {
        config.architecture.validate()?;
        let id = id.into();
        if let Some(labels) = &config.output_labels {
            if labels.len() != config.architecture.output_size {
                return Err(NnError::shape("output labels", labels.len(), config.architecture.output_size));
            }
        }
        info!("registered model '{id}' ({:?})", config.task);
        self.models.insert(id.clone(), ModelEntry::new(id, config));
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.models.contains_key(id)
    }

    /// Removes the entry for `id`, returning it.
    pub fn delete_model(&mut self, id: &str) -> Result<ModelEntry> {
        self.models.remove(id).ok_or_else(|| NnError::ModelNotFound(id.to_string()))
    }

    pub fn get_model_info(&self, id: &str) -> Result<ModelInfo> {
        Ok(self.entry(id)?.info())
    }

    /// Every registered model, ordered by id.
    pub fn list_models(&self) -> Vec<ModelInfo> {
        self.models.values().map(ModelEntry::info).collect()
    }

    fn entry(&self, id: &str) -> Result<&ModelEntry> {
        self.models.get(id).ok_or_else(|| NnError::ModelNotFound(id.to_string()))
    }

    fn trained(&self, id: &str) -> Result<(&ModelEntry, &Network)> {
        let entry = self.entry(id)?;
        match entry.network.as_ref() {
            Some(network) => Ok((entry, network)),
            None => Err(NnError::NotTrained(id.to_string())),
        }
    }

    /// Trains a fresh network for `id` on `dataset`.
    ///
    /// Preprocessing is fitted on the dataset inputs. Anomaly models learn
    /// to reconstruct their (preprocessed) inputs, so `dataset.targets` is
    /// ignored for them. A failed run leaves the previous entry untouched
    /// and is returned as `TrainingOutcome::Failed`.
    pub fn train_model(&mut self, id: &str, dataset: &Dataset, config: &TrainConfig) -> Result<TrainingOutcome> {
        let entry = self
            .models
            .get_mut(id)
            .ok_or_else(|| NnError::ModelNotFound(id.to_string()))?;

        let preprocessor = Preprocessor::fit(entry.config.preprocessing, &dataset.inputs)?;
        let inputs = preprocessor.transform_all(&dataset.inputs)?;
        let targets = if entry.config.task == TaskType::Anomaly {
            inputs.clone()
        } else {
            dataset.targets.clone()
        };
        let prepared = Dataset::new(inputs, targets)?;

        let arch = entry.config.architecture.clone();
        let mut network = match config.seed {
            Some(seed) => Network::with_seed(arch, seed)?,
            None => Network::new(arch)?,
        };

        let outcome = train_loop(&mut network, &prepared, config)?;
        match &outcome {
            TrainingOutcome::Completed(run) => {
                if entry.config.task == TaskType::Anomaly {
                    let errors = prepared
                        .inputs
                        .iter()
                        .map(|x| network.predict(x).map(|r| reconstruction_error(x, &r)))
                        .collect::<Result<Vec<f64>>>()?;
                    entry.anomaly_threshold = Some(learn_threshold(&errors));
                }
                entry.metrics = Some(ModelMetrics::from_run(run));
                entry.history = run.history.clone();
                entry.preprocessor = preprocessor;
                entry.network = Some(network);
                info!("model '{id}' trained in {} epochs", run.epochs_run());
            }
            TrainingOutcome::Failed { error, .. } => {
                warn!("training model '{id}' failed: {error}");
            }
        }
        Ok(outcome)
    }

    fn infer(entry: &ModelEntry, network: &Network, input: &[f64]) -> Result<(Vec<f64>, Vec<f64>)> {
        let x = entry.preprocessor.transform(input)?;
        let raw = network.predict(&x)?;
        Ok((x, raw))
    }

    /// Predicts for one input and post-processes by task: argmax and its
    /// probability for classifiers, reconstruction error for anomaly
    /// models, raw values with a magnitude confidence otherwise.
    pub fn predict(&self, id: &str, input: &[f64]) -> Result<Prediction> {
        let (entry, network) = self.trained(id)?;
        let (x, raw) = Self::infer(entry, network, input)?;
        Ok(Self::post_process(entry, &x, raw))
    }

    pub fn predict_batch(&self, id: &str, inputs: &[Vec<f64>]) -> Result<Vec<Prediction>> {
        let (entry, network) = self.trained(id)?;
        inputs
            .iter()
            .map(|input| {
                let (x, raw) = Self::infer(entry, network, input)?;
                Ok(Self::post_process(entry, &x, raw))
            })
            .collect()
    }

    fn post_process(entry: &ModelEntry, x: &[f64], raw: Vec<f64>) -> Prediction {
        match entry.config.task {
            TaskType::Classification | TaskType::Sequence => {
                let dist = distribution(&entry.config.architecture.output_activation, &raw);
                let index = argmax(&dist);
                Prediction {
                    prediction: PredictionValue::Class { index, label: label_for(entry, index) },
                    confidence: dist[index],
                    raw,
                }
            }
            TaskType::Anomaly => {
                let error = reconstruction_error(x, &raw);
                let threshold = entry.anomaly_threshold.unwrap_or(f64::INFINITY);
                Prediction {
                    prediction: PredictionValue::ReconstructionError { error, anomalous: error > threshold },
                    confidence: (error / threshold).min(1.0),
                    raw,
                }
            }
            TaskType::Regression | TaskType::TimeSeries | TaskType::Clustering => Prediction {
                prediction: PredictionValue::Values { values: raw.clone() },
                confidence: magnitude_confidence(raw[0]),
                raw,
            },
        }
    }

    /// Ranked class probabilities for one input. `top` holds at most
    /// `top_k` classes, most probable first; `distribution` holds all of them.
    pub fn classify(&self, id: &str, input: &[f64], top_k: usize) -> Result<Classification> {
        let (entry, network) = self.trained(id)?;
        let (_, raw) = Self::infer(entry, network, input)?;
        let dist = distribution(&entry.config.architecture.output_activation, &raw);
        let top = ranked(entry, &dist, top_k);
        let index = argmax(&dist);
        Ok(Classification {
            index,
            label: label_for(entry, index),
            probability: dist[index],
            top,
            distribution: dist,
        })
    }

    /// The `top_k` most likely next tokens for a sequence model.
    pub fn predict_sequence(&self, id: &str, input: &[f64], top_k: usize) -> Result<Vec<RankedClass>> {
        let (entry, network) = self.trained(id)?;
        let (_, raw) = Self::infer(entry, network, input)?;
        let dist = distribution(&entry.config.architecture.output_activation, &raw);
        Ok(ranked(entry, &dist, top_k))
    }

    /// Rolling multi-step forecast. The model's input width is the window
    /// size; each prediction's first output is appended to the window for
    /// the next step.
    pub fn predict_time_series(&self, id: &str, history: &[f64], steps: usize) -> Result<Vec<Forecast>> {
        let (entry, network) = self.trained(id)?;
        let window = entry.config.architecture.input_size;
        if history.len() < window {
            return Err(NnError::InsufficientData(format!(
                "need {window} past values, got {}",
                history.len()
            )));
        }
        let mut series = history[history.len() - window..].to_vec();
        let mut forecasts = Vec::with_capacity(steps);
        for step in 1..=steps {
            let (_, raw) = Self::infer(entry, network, &series[series.len() - window..])?;
            let value = raw[0];
            forecasts.push(Forecast { step, value, confidence: magnitude_confidence(value) });
            series.push(value);
        }
        Ok(forecasts)
    }

    /// Scores `data` against anomaly model `id`.
    ///
    /// If `id` is not registered it is registered with the default
    /// autoencoder architecture. If it has no trained network it is first
    /// trained on `normal_data`. `threshold` overrides the learned one.
    /// Models registered for any other task are rejected.
    pub fn detect_anomalies(
        &mut self,
        id: &str,
        data: &[Vec<f64>],
        normal_data: Option<&[Vec<f64>]>,
        threshold: Option<f64>,
        config: &TrainConfig,
    ) -> Result<AnomalyReport> {
        if !self.contains(id) {
            let width = normal_data
                .and_then(|d| d.first())
                .or_else(|| data.first())
                .map(|r| r.len())
                .ok_or_else(|| NnError::InsufficientData("no samples to size the autoencoder".into()))?;
            self.register_model(id, ModelConfig::for_task(TaskType::Anomaly, width, width))?;
        }
        let task = self.entry(id)?.config.task;
        if task != TaskType::Anomaly {
            return Err(NnError::Configuration(format!(
                "model '{id}' is a {task:?} model, not an anomaly detector"
            )));
        }
        if !self.entry(id)?.is_trained() {
            let normal = normal_data
                .filter(|d| !d.is_empty())
                .ok_or_else(|| NnError::InsufficientData(format!("model '{id}' is untrained and no normal data was given")))?;
            let dataset = Dataset::new(normal.to_vec(), normal.to_vec())?;
            if let TrainingOutcome::Failed { error, .. } = self.train_model(id, &dataset, config)? {
                return Err(error);
            }
        }

        let (entry, network) = self.trained(id)?;
        let threshold = match threshold.or(entry.anomaly_threshold) {
            Some(t) if t > 0.0 => t,
            Some(t) => return Err(NnError::Configuration(format!("anomaly threshold {t} must be positive"))),
            None => return Err(NnError::Configuration(format!("model '{id}' has no anomaly threshold"))),
        };

        let scores = data
            .iter()
            .enumerate()
            .map(|(index, input)| {
                let (x, raw) = Self::infer(entry, network, input)?;
                let error = reconstruction_error(&x, &raw);
                let anomalous = error > threshold;
                Ok(AnomalyScore {
                    index,
                    error,
                    anomalous,
                    severity: anomalous.then(|| Severity::classify(error, threshold)),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(AnomalyReport { threshold, scores })
    }

    /// Embeds every input and buckets it into one of `cluster_count` groups.
    ///
    /// This is not k-means: the cluster is a deterministic hash of the
    /// embedding's sum, `floor(|Σe| · 1000) mod cluster_count`. Identical
    /// embeddings always share a cluster, nearby ones usually do not.
    pub fn cluster_data(&self, id: &str, inputs: &[Vec<f64>], cluster_count: usize) -> Result<Vec<ClusterAssignment>> {
        if cluster_count == 0 {
            return Err(NnError::Configuration("cluster count must be at least 1".into()));
        }
        let (entry, network) = self.trained(id)?;
        inputs
            .iter()
            .map(|input| {
                let (_, embedding) = Self::infer(entry, network, input)?;
                let sum: f64 = embedding.iter().sum();
                let cluster = ((sum.abs() * 1000.0).floor() as u64 % cluster_count as u64) as usize;
                Ok(ClusterAssignment { cluster, embedding })
            })
            .collect()
    }

    /// Snapshot of a trained model; its network moves to `Exported`.
    pub fn export_model(&mut self, id: &str) -> Result<ExportBundle> {
        let entry = self
            .models
            .get_mut(id)
            .ok_or_else(|| NnError::ModelNotFound(id.to_string()))?;
        let network = entry
            .network
            .as_mut()
            .ok_or_else(|| NnError::NotTrained(id.to_string()))?;
        let weights = network.export_weights();
        info!("exported model '{id}'");
        Ok(ExportBundle {
            model_id: entry.id.clone(),
            config: entry.config.clone(),
            weights,
            preprocessor: entry.preprocessor.clone(),
            metrics: entry.metrics.clone(),
            history: entry.history.clone(),
            anomaly_threshold: entry.anomaly_threshold,
            exported_at: unix_now(),
        })
    }

    /// Rebuilds the network in `bundle` and registers it under its model
    /// id, replacing any existing entry. Returns the id.
    pub fn import_model(&mut self, bundle: ExportBundle) -> Result<String> {
        if bundle.config.architecture != bundle.weights.architecture {
            return Err(NnError::Configuration(
                "bundle config and weights describe different architectures".into(),
            ));
        }
        if let Some(labels) = &bundle.config.output_labels {
            if labels.len() != bundle.config.architecture.output_size {
                return Err(NnError::shape("output labels", labels.len(), bundle.config.architecture.output_size));
            }
        }
        let network = Network::from_bundle(&bundle.weights)?;
        let id = bundle.model_id;
        let mut entry = ModelEntry::new(id.clone(), bundle.config);
        entry.network = Some(network);
        entry.preprocessor = bundle.preprocessor;
        entry.metrics = bundle.metrics;
        entry.history = bundle.history;
        entry.anomaly_threshold = bundle.anomaly_threshold;
        self.models.insert(id.clone(), entry);
        info!("imported model '{id}'");
        Ok(id)
    }
}

/// Class probabilities from a raw output. Softmax outputs are used as is;
/// other activations are normalised by their sum, or passed through softmax
/// when they contain negative values or sum to zero.
fn distribution(output_activation: &Activation, raw: &[f64]) -> Vec<f64> {
    if *output_activation == Activation::Softmax {
        return raw.to_vec();
    }
    let sum: f64 = raw.iter().sum();
    if sum > 0.0 && raw.iter().all(|&p| p >= 0.0) {
        raw.iter().map(|p| p / sum).collect()
    } else {
        softmax(raw)
    }
}

fn label_for(entry: &ModelEntry, index: usize) -> Option<String> {
    entry
        .config
        .output_labels
        .as_ref()
        .and_then(|labels| labels.get(index).cloned())
}

fn ranked(entry: &ModelEntry, dist: &[f64], top_k: usize) -> Vec<RankedClass> {
    let mut order: Vec<usize> = (0..dist.len()).collect();
    order.sort_by(|&a, &b| dist[b].partial_cmp(&dist[a]).unwrap_or(std::cmp::Ordering::Equal));
    order
        .into_iter()
        .take(top_k)
        .map(|index| RankedClass { index, label: label_for(entry, index), probability: dist[index] })
        .collect()
}

/// Confidence of a regression output: its magnitude, capped at 1.
fn magnitude_confidence(value: f64) -> f64 {
    value.abs().min(1.0)
}
