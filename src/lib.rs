/// Error types
pub mod error;

/// Environment interface
pub mod env;

/// Conversion between structured parameter sets and flat vectors
pub mod flatten;

/// Neural network backed policy models
pub mod model;

/// Stochastic policies
pub mod policy;

/// Closed-form probability helpers
pub mod prob;

/// Rollouts and trajectory sampling
pub mod sample;

pub use error::{Error, Result};
