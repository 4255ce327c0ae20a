pub mod optimizer;
pub mod state;

pub use optimizer::Optimizer;
pub use state::OptimizerState;
