pub mod dataset;
pub mod epoch_stats;
pub mod train_config;
pub mod loop_fn;

pub use dataset::{Dataset, Sample};
pub use epoch_stats::{EpochStats, TrainingEvent};
pub use train_config::{BatchMode, TrainConfig};
pub use loop_fn::{train_loop, TrainingOutcome, TrainingRun};
