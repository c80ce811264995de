use burn::tensor::backend::AutodiffBackend;

use super::{continuous_action, Policy};
use crate::{
    env::{Action, ActionSpace, Environment},
    error::{Error, Result},
    model::ContinuousModel,
};

/// Stochastic Gaussian policy over a continuous action space, backed by a [`ContinuousModel`]
pub struct ContinuousPolicy<B: AutodiffBackend> {
    model: ContinuousModel<B>,
}

impl<B: AutodiffBackend> ContinuousPolicy<B> {
    /// Build a freshly initialized policy sized for `env`
    ///
    /// **Errors** with [`Error::UnsupportedActionSpace`] unless `env` has a continuous action space
    pub fn new<E: Environment>(env: &E, device: &B::Device) -> Result<Self> {
        let d_u = continuous_dim(env)?;
        let d_o = env.observation_space().dim();
        Ok(Self::from_model(ContinuousModel::new(d_u, d_o, device)))
    }

    pub fn from_model(model: ContinuousModel<B>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &ContinuousModel<B> {
        &self.model
    }

    /// Differential entropy of the action distribution at `obs`
    pub fn act_entropy(&self, obs: &[f32]) -> Result<f32> {
        self.model.entropy(obs)
    }

    /// Log-density of `action` at `obs`
    pub fn log_prob_act(&self, action: &Action, obs: &[f32]) -> Result<f32> {
        self.model.log_prob_act(continuous_action(action)?, obs)
    }
}

fn continuous_dim<E: Environment>(env: &E) -> Result<usize> {
    match env.action_space() {
        space @ ActionSpace::Continuous { .. } => Ok(space.dim()),
        other => Err(Error::UnsupportedActionSpace {
            policy: "ContinuousPolicy",
            found: other.kind(),
        }),
    }
}

impl<B: AutodiffBackend> Policy for ContinuousPolicy<B> {
    fn act(&self, obs: &[f32]) -> Result<Action> {
        self.model.sample_act(obs).map(Action::Continuous)
    }

    fn grad_act(&self, action: &Action, obs: &[f32]) -> Result<Vec<f32>> {
        self.model.grad_probs(continuous_action(action)?, obs)
    }

    fn prob_act(&self, action: &Action, obs: &[f32]) -> Result<f32> {
        self.model.prob_act(continuous_action(action)?, obs)
    }

    fn set_params(&mut self, params: &[f32]) -> Result<()> {
        self.model.set_params(params)
    }

    fn params(&self) -> Result<Vec<f32>> {
        self.model.get_params()
    }

    fn copy<E: Environment>(&self, env: &E) -> Result<Self> {
        continuous_dim(env)?;
        Ok(Self::from_model(self.model.copy()?))
    }
}
