use burn::tensor::backend::AutodiffBackend;

use super::{discrete_action, Policy};
use crate::{
    env::{Action, ActionSpace, Environment},
    error::{Error, Result},
    model::DiscreteModel,
};

/// Stochastic policy over a discrete action space, backed by a [`DiscreteModel`]
pub struct DiscretePolicy<B: AutodiffBackend> {
    model: DiscreteModel<B>,
}

impl<B: AutodiffBackend> DiscretePolicy<B> {
    /// Build a freshly initialized policy sized for `env`
    ///
    /// **Errors** with [`Error::UnsupportedActionSpace`] unless `env` has a discrete action space
    pub fn new<E: Environment>(env: &E, device: &B::Device) -> Result<Self> {
        let d_u = match env.action_space() {
            ActionSpace::Discrete(n) => *n,
            other => {
                return Err(Error::UnsupportedActionSpace {
                    policy: "DiscretePolicy",
                    found: other.kind(),
                })
            }
        };
        let d_o = env.observation_space().dim();
        Ok(Self::from_model(DiscreteModel::new(d_u, d_o, device)))
    }

    pub fn from_model(model: DiscreteModel<B>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &DiscreteModel<B> {
        &self.model
    }

    /// Action probabilities at `obs`
    pub fn probs(&self, obs: &[f32]) -> Result<Vec<f32>> {
        self.model.probs(obs)
    }
}

impl<B: AutodiffBackend> Policy for DiscretePolicy<B> {
    fn act(&self, obs: &[f32]) -> Result<Action> {
        self.model.sample(obs).map(Action::Discrete)
    }

    fn grad_act(&self, action: &Action, obs: &[f32]) -> Result<Vec<f32>> {
        let a = discrete_action(action, self.model.d_u())?;
        self.model.grad_probs(a, obs)
    }

    fn prob_act(&self, action: &Action, obs: &[f32]) -> Result<f32> {
        let a = discrete_action(action, self.model.d_u())?;
        Ok(self.model.probs(obs)?[a])
    }

    fn set_params(&mut self, params: &[f32]) -> Result<()> {
        self.model.set_params(params)
    }

    fn params(&self) -> Result<Vec<f32>> {
        self.model.get_params()
    }

    fn copy<E: Environment>(&self, env: &E) -> Result<Self> {
        if !matches!(env.action_space(), ActionSpace::Discrete(_)) {
            return Err(Error::UnsupportedActionSpace {
                policy: "DiscretePolicy",
                found: env.action_space().kind(),
            });
        }
        Ok(Self::from_model(self.model.copy()?))
    }
}
