pub mod error;
pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod loss;
pub mod optim;
pub mod train;
pub mod preprocess;
pub mod registry;

// Convenience re-exports
pub use error::{NnError, Result};
pub use math::Matrix;
pub use activation::Activation;
pub use layers::DenseLayer;
pub use network::{Architecture, EngineState, Evaluation, Network, WeightBundle, WeightInit};
pub use loss::LossType;
pub use optim::Optimizer;
pub use train::{train_loop, BatchMode, Dataset, EpochStats, TrainConfig, TrainingEvent, TrainingOutcome};
pub use preprocess::{Preprocessing, Preprocessor};
pub use registry::{ExportBundle, ModelConfig, ModelRegistry, SharedRegistry, TaskType};
