pub mod dense;

pub use dense::{DenseLayer, ParamBuffer};
