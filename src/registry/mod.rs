pub mod anomaly;
pub mod bundle;
pub mod config;
pub mod entry;
pub mod registry;
pub mod results;
pub mod task;

pub use anomaly::{learn_threshold, reconstruction_error, Severity};
pub use bundle::ExportBundle;
pub use config::ModelConfig;
pub use entry::{ModelEntry, ModelInfo, ModelMetrics};
pub use registry::{ModelRegistry, SharedRegistry};
pub use results::{
    AnomalyReport, AnomalyScore, Classification, ClusterAssignment, Forecast, Prediction,
    PredictionValue, RankedClass,
};
pub use task::TaskType;
