use serde::{Serialize, Deserialize};

use crate::error::Result;
use crate::network::Architecture;
use crate::preprocess::Preprocessing;
use crate::registry::task::TaskType;

/// Declarative description of a registered model.
///
/// Can be saved to / loaded from JSON independently of any trained weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub task: TaskType,
    pub architecture: Architecture,
    #[serde(default)]
    pub preprocessing: Preprocessing,
    /// Free-form use-case tags supplied by the caller.
    #[serde(default)]
    pub use_cases: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Human-readable labels for the output units of classifiers.
    #[serde(default)]
    pub output_labels: Option<Vec<String>>,
}

impl ModelConfig {
    pub fn new(task: TaskType, architecture: Architecture) -> ModelConfig {
        ModelConfig {
            task,
            architecture,
            preprocessing: task.default_preprocessing(),
            use_cases: Vec::new(),
            description: None,
            output_labels: None,
        }
    }

    /// Config with the task's default architecture and preprocessing.
    pub fn for_task(task: TaskType, input_size: usize, output_size: usize) -> ModelConfig {
        ModelConfig::new(task, task.default_architecture(input_size, output_size))
    }

    pub fn with_preprocessing(mut self, preprocessing: Preprocessing) -> ModelConfig {
        self.preprocessing = preprocessing;
        self
    }

    pub fn with_labels(mut self, labels: Vec<String>) -> ModelConfig {
        self.output_labels = Some(labels);
        self
    }

    pub fn with_use_cases(mut self, use_cases: Vec<String>) -> ModelConfig {
        self.use_cases = use_cases;
        self
    }

    /// Serializes the config to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a `ModelConfig` from a JSON file.
    pub fn load_json(path: &str) -> Result<ModelConfig> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}
