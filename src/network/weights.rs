use serde::{Serialize, Deserialize};

use crate::math::Matrix;
use crate::network::architecture::Architecture;

/// Deep copy of a network's parameters bound to the architecture they
/// were produced for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightBundle {
    pub architecture: Architecture,
    /// One `[inputs][outputs]` matrix per layer boundary.
    pub weights: Vec<Matrix>,
    pub biases: Vec<Vec<f64>>,
}
