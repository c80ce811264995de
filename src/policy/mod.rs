use crate::{
    env::{Action, Environment},
    error::{Error, Result},
};

mod continuous;
mod discrete;
mod random;

pub use continuous::ContinuousPolicy;
pub use discrete::DiscretePolicy;
pub use random::RandomPolicy;

/// A stochastic policy that can be rolled out in an [`Environment`]
///
/// Only [`act`](Policy::act) and [`copy`](Policy::copy) are required. The training
/// surface (gradients, probabilities, parameters) fails with
/// [`Error::NotImplemented`] unless the policy is backed by a model.
pub trait Policy {
    /// Choose an action for the observation
    fn act(&self, obs: &[f32]) -> Result<Action>;

    /// Gradient of the probability (or density) of `action` at `obs` with respect to the
    /// flat parameter vector
    fn grad_act(&self, _action: &Action, _obs: &[f32]) -> Result<Vec<f32>> {
        Err(Error::NotImplemented("grad_act"))
    }

    /// Probability (discrete) or density (continuous) of `action` at `obs`
    fn prob_act(&self, _action: &Action, _obs: &[f32]) -> Result<f32> {
        Err(Error::NotImplemented("prob_act"))
    }

    /// Replace the policy's parameters with a flat vector
    fn set_params(&mut self, _params: &[f32]) -> Result<()> {
        Err(Error::NotImplemented("set_params"))
    }

    /// The policy's parameters as a flat vector
    fn params(&self) -> Result<Vec<f32>> {
        Err(Error::NotImplemented("params"))
    }

    /// An independent replica of the policy for use with `env`
    fn copy<E: Environment>(&self, env: &E) -> Result<Self>
    where
        Self: Sized;
}

fn discrete_action(action: &Action, d_u: usize) -> Result<usize> {
    match action {
        Action::Discrete(a) if *a < d_u => Ok(*a),
        other => Err(Error::InvalidAction(format!(
            "expected a discrete action below {d_u}, got {other:?}"
        ))),
    }
}

fn continuous_action(action: &Action) -> Result<&[f32]> {
    match action {
        Action::Continuous(a) => Ok(a),
        other => Err(Error::InvalidAction(format!(
            "expected a continuous action, got {other:?}"
        ))),
    }
}
