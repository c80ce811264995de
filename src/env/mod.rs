use rand::{distributions::Uniform, thread_rng, Rng};
use rand_distr::StandardNormal;

use crate::error::Error;

/// Observations are flat vectors of `f32` features
pub type Observation = Vec<f32>;

/// An action taken in an environment
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Index into a discrete action space
    Discrete(usize),
    /// Point in a continuous action space
    Continuous(Vec<f32>),
}

/// The set of actions an environment accepts
#[derive(Debug, Clone, PartialEq)]
pub enum ActionSpace {
    /// `n` actions, indexed `0..n`
    Discrete(usize),
    /// A box `[low, high]` per dimension; infinite bounds are allowed
    Continuous { low: Vec<f32>, high: Vec<f32> },
}

impl ActionSpace {
    /// Continuous space of `dim` dimensions bounded by `[low, high]` in every dimension
    pub fn bounded(dim: usize, low: f32, high: f32) -> Self {
        Self::Continuous {
            low: vec![low; dim],
            high: vec![high; dim],
        }
    }

    /// Continuous space of `dim` unbounded dimensions
    pub fn unbounded(dim: usize) -> Self {
        Self::bounded(dim, f32::NEG_INFINITY, f32::INFINITY)
    }

    /// Cardinality of a discrete space, dimensionality of a continuous space
    pub fn dim(&self) -> usize {
        match self {
            Self::Discrete(n) => *n,
            Self::Continuous { low, .. } => low.len(),
        }
    }

    /// Human readable name of the kind of space
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Discrete(_) => "discrete",
            Self::Continuous { .. } => "continuous",
        }
    }

    /// Check that `action` is of the right kind and lies within the space
    pub fn contains(&self, action: &Action) -> bool {
        match (self, action) {
            (Self::Discrete(n), Action::Discrete(a)) => a < n,
            (Self::Continuous { low, high }, Action::Continuous(a)) => {
                a.len() == low.len()
                    && a.iter()
                        .zip(low.iter().zip(high))
                        .all(|(x, (l, h))| x >= l && x <= h)
            }
            _ => false,
        }
    }

    /// Sample an action uniformly from the space
    ///
    /// Unbounded dimensions of a continuous space are sampled from a standard normal instead.
    ///
    /// **Errors** with [`Error::InvalidActionSpace`] if the space is empty: zero discrete
    /// actions, or a dimension with `low > high` (or a NaN bound)
    pub fn sample(&self) -> crate::Result<Action> {
        let mut rng = thread_rng();
        match self {
            Self::Discrete(0) => Err(Error::InvalidActionSpace(String::from(
                "discrete space with no actions",
            ))),
            Self::Discrete(n) => Ok(Action::Discrete(rng.gen_range(0..*n))),
            Self::Continuous { low, high } => {
                if low.len() != high.len() {
                    return Err(Error::InvalidActionSpace(format!(
                        "{} lower bounds but {} upper bounds",
                        low.len(),
                        high.len()
                    )));
                }
                if let Some(i) = low.iter().zip(high).position(|(l, h)| !(l <= h)) {
                    return Err(Error::InvalidActionSpace(format!(
                        "dimension {i} has bounds [{}, {}]",
                        low[i], high[i]
                    )));
                }
                let action = low
                    .iter()
                    .zip(high)
                    .map(|(&l, &h)| {
                        if l.is_finite() && h.is_finite() {
                            rng.sample(Uniform::new_inclusive(l, h))
                        } else {
                            let x: f32 = rng.sample(StandardNormal);
                            x.clamp(l, h)
                        }
                    })
                    .collect();
                Ok(Action::Continuous(action))
            }
        }
    }
}

/// Shape of the observations an environment produces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationSpace {
    pub shape: Vec<usize>,
}

impl ObservationSpace {
    pub fn new(shape: impl Into<Vec<usize>>) -> Self {
        Self {
            shape: shape.into(),
        }
    }

    /// Number of observation features, taken from the first dimension
    pub fn dim(&self) -> usize {
        self.shape.first().copied().unwrap_or(0)
    }
}

/// The outcome of one environment step
#[derive(Debug, Clone)]
pub struct Step<I> {
    pub observation: Observation,
    pub reward: f32,
    pub done: bool,
    pub info: I,
}

/// An episodic environment a policy can be rolled out in
///
/// Implementations are supplied by the caller; the crate only drives them.
pub trait Environment {
    /// Auxiliary per-step information
    type Info;

    /// Errors raised while resetting or stepping
    type Error: std::error::Error + Send + Sync + 'static;

    fn action_space(&self) -> &ActionSpace;

    fn observation_space(&self) -> &ObservationSpace;

    /// Reset the environment to an initial state
    ///
    /// **Returns** the initial observation
    fn reset(&mut self) -> Result<Observation, Self::Error>;

    /// Advance the environment by one action
    fn step(&mut self, action: &Action) -> Result<Step<Self::Info>, Self::Error>;

    /// Render the current state, if the environment supports it
    fn render(&mut self) {}
}
