pub mod architecture;
pub mod cache;
pub mod network;
pub mod weights;

pub use architecture::{Architecture, WeightInit};
pub use cache::{ActivationCache, Gradients};
pub use network::{EngineState, Evaluation, Network};
pub use weights::WeightBundle;
