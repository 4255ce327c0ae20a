use serde::{Serialize, Deserialize};

use crate::error::Result;
use crate::network::WeightBundle;
use crate::preprocess::Preprocessor;
use crate::registry::config::ModelConfig;
use crate::registry::entry::ModelMetrics;
use crate::train::EpochStats;

/// Self-describing snapshot of a trained model. Importing it reproduces
/// the exported model's predictions exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    pub model_id: String,
    pub config: ModelConfig,
    pub weights: WeightBundle,
    pub preprocessor: Preprocessor,
    pub metrics: Option<ModelMetrics>,
    pub history: Vec<EpochStats>,
    #[serde(default)]
    pub anomaly_threshold: Option<f64>,
    /// Seconds since the Unix epoch.
    pub exported_at: u64,
}

impl ExportBundle {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<ExportBundle> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes the bundle to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a bundle previously written by `save_json`.
    pub fn load_json(path: &str) -> Result<ExportBundle> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}
