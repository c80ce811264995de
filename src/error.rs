use burn::record::RecorderError;
use rand::distributions::WeightedError;
use rand_distr::NormalError;
use thiserror::Error;

use crate::model::NetDims;

/// Errors raised by models, policies and the rollout engine
#[derive(Error, Debug)]
pub enum Error {
    /// A parameter value does not match the shape recorded for its slot
    #[error("parameter {index} (`{name}`) has shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        index: usize,
        name: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    /// A flat vector (or observation/action) has the wrong number of elements
    #[error("expected {expected} elements, found {found}")]
    LengthMismatch { expected: usize, found: usize },

    /// The number of parameter values differs from the number of recorded parameters
    #[error("expected {expected} parameter values, found {found}")]
    ParamCount { expected: usize, found: usize },

    #[error("{policy} does not support the {found} action space")]
    UnsupportedActionSpace {
        policy: &'static str,
        found: &'static str,
    },

    #[error("`{0}` is not implemented for this policy")]
    NotImplemented(&'static str),

    #[error("invalid action: {0}")]
    InvalidAction(String),

    /// An action space nothing can be sampled from
    #[error("invalid action space: {0}")]
    InvalidActionSpace(String),

    /// A serialized model state was produced by a model of different dimensions
    #[error("model state has dims {found:?}, expected {expected:?}")]
    IncompatibleState { expected: NetDims, found: NetDims },

    #[error("recorder error: {0}")]
    Record(String),

    #[error("invalid categorical distribution: {0}")]
    Weights(#[from] WeightedError),

    #[error("invalid normal distribution: {0}")]
    Normal(#[from] NormalError),

    #[error("environment error: {0}")]
    Environment(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("rollout worker disconnected before finishing the batch")]
    WorkerDisconnected,

    #[error("rollout worker {0} panicked")]
    WorkerPanicked(usize),

    #[error("failed to spawn rollout worker: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Wrap an error raised by an [`Environment`](crate::env::Environment)
    pub fn environment<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Environment(Box::new(err))
    }
}

impl From<RecorderError> for Error {
    fn from(err: RecorderError) -> Self {
        Self::Record(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
