use std::path::Path;

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::{activation::relu, backend::AutodiffBackend, ElementConversion},
};
use log::debug;
use rand::thread_rng;
use rand_distr::{Distribution, Normal};

use super::{to_vec, ModelCore, NetDims, PolicyNet};
use crate::{
    error::{self, Error},
    flatten::ParamFlatten,
    prob::{gauss_entropy, gauss_log_density, HALF_LN_2PI},
};

/// Diagonal Gaussian policy network: one ReLU hidden layer feeding a mean head and a
/// log standard deviation head
#[derive(Module, Debug)]
pub struct ContinuousNet<B: Backend> {
    fc1: Linear<B>,
    mu: Linear<B>,
    log_sigma: Linear<B>,
}

impl<B: Backend> ContinuousNet<B> {
    /// Mean and log standard deviation for a batch of observations
    ///
    /// `[batch, d_o]` -> (`[batch, d_u]`, `[batch, d_u]`)
    pub fn forward(&self, obs: Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let x = relu(self.fc1.forward(obs));
        (self.mu.forward(x.clone()), self.log_sigma.forward(x))
    }
}

impl<B: AutodiffBackend> PolicyNet<B> for ContinuousNet<B> {
    fn init(dims: NetDims, device: &B::Device) -> Self {
        Self {
            fc1: LinearConfig::new(dims.d_o, dims.hidden).init(device),
            mu: LinearConfig::new(dims.hidden, dims.d_u).init(device),
            log_sigma: LinearConfig::new(dims.hidden, dims.d_u).init(device),
        }
    }

    fn dims(&self) -> NetDims {
        let [d_o, hidden] = self.fc1.weight.dims();
        let [_, d_u] = self.mu.weight.dims();
        NetDims { d_u, d_o, hidden }
    }

    fn record_dims(record: &ContinuousNetRecord<B>) -> NetDims {
        let [d_o, hidden] = record.fc1.weight.dims();
        let [_, d_u] = record.mu.weight.dims();
        NetDims { d_u, d_o, hidden }
    }

    fn layers(&self) -> Vec<(&'static str, &Linear<B>)> {
        vec![
            ("fc1", &self.fc1),
            ("mu", &self.mu),
            ("log_sigma", &self.log_sigma),
        ]
    }

    fn map_layers<F>(self, mut f: F) -> Self
    where
        F: FnMut(Linear<B>) -> Linear<B>,
    {
        Self {
            fc1: f(self.fc1),
            mu: f(self.mu),
            log_sigma: f(self.log_sigma),
        }
    }
}

#[derive(Config, Debug)]
pub struct ContinuousModelConfig {
    /// Action dimensionality
    d_u: usize,
    /// Observation dimensionality
    d_o: usize,
    #[config(default = 5)]
    hidden: usize,
}

impl ContinuousModelConfig {
    pub fn init<B: AutodiffBackend>(&self, device: &B::Device) -> ContinuousModel<B> {
        let dims = NetDims {
            d_u: self.d_u,
            d_o: self.d_o,
            hidden: self.hidden,
        };
        ContinuousModel {
            core: ModelCore::new(ContinuousNet::init(dims, device), device),
        }
    }
}

/// A Gaussian with diagonal covariance over a `d_u`-dimensional action, conditioned on
/// a `d_o`-dimensional observation
///
/// `sigma = exp(log_sigma)`, so the standard deviation is always positive.
pub struct ContinuousModel<B: AutodiffBackend> {
    core: ModelCore<B, ContinuousNet<B>>,
}

impl<B: AutodiffBackend> ContinuousModel<B> {
    /// Initialize a model with random parameters and the default hidden width
    pub fn new(d_u: usize, d_o: usize, device: &B::Device) -> Self {
        ContinuousModelConfig::new(d_u, d_o).init(device)
    }

    /// Rebuild a model from bytes produced by [`export_state`](Self::export_state)
    pub fn import_state(bytes: &[u8], device: &B::Device) -> error::Result<Self> {
        Ok(Self {
            core: ModelCore::import_state(bytes, device)?,
        })
    }

    pub fn d_u(&self) -> usize {
        self.core.dims().d_u
    }

    pub fn d_o(&self) -> usize {
        self.core.dims().d_o
    }

    pub fn device(&self) -> &B::Device {
        self.core.device()
    }

    pub fn flatten(&self) -> &ParamFlatten {
        self.core.flatten()
    }

    /// Mean and standard deviation of the action distribution at `obs`
    pub fn probs(&self, obs: &[f32]) -> error::Result<(Vec<f32>, Vec<f32>)> {
        let obs = self.core.observation(obs)?;
        let (mu, log_sigma) = self.core.net().forward(obs);
        Ok((to_vec(mu), to_vec(log_sigma.exp())))
    }

    /// Draw an action from the distribution at `obs`
    pub fn sample_act(&self, obs: &[f32]) -> error::Result<Vec<f32>> {
        let (mu, sigma) = self.probs(obs)?;
        let mut rng = thread_rng();
        mu.into_iter()
            .zip(sigma)
            .map(|(m, s)| {
                Normal::new(m, s)
                    .map(|dist| dist.sample(&mut rng))
                    .map_err(Error::from)
            })
            .collect()
    }

    /// Joint log-density of `action` at `obs`, as a single element tensor
    fn log_density(&self, action: &[f32], obs: &[f32]) -> error::Result<Tensor<B, 1>> {
        let obs = self.core.observation(obs)?;
        let action = self.core.row(action, self.d_u())?;
        let (mu, log_sigma) = self.core.net().forward(obs);

        let z = (action - mu) / log_sigma.clone().exp();
        let log_density = (z.clone() * z).mul_scalar(-0.5) - log_sigma;
        Ok(log_density.sub_scalar(HALF_LN_2PI).sum())
    }

    /// Density of `action` at `obs`, the product of the per-dimension normal densities
    ///
    /// Underflows for high-dimensional actions; use [`log_prob_act`](Self::log_prob_act) there.
    pub fn prob_act(&self, action: &[f32], obs: &[f32]) -> error::Result<f32> {
        Ok(self.log_density(action, obs)?.exp().into_scalar().elem())
    }

    /// Log-density of `action` at `obs`, evaluated without building a gradient graph
    pub fn log_prob_act(&self, action: &[f32], obs: &[f32]) -> error::Result<f32> {
        if action.len() != self.d_u() {
            return Err(Error::LengthMismatch {
                expected: self.d_u(),
                found: action.len(),
            });
        }
        let (mu, sigma) = self.probs(obs)?;
        Ok(gauss_log_density(action, &mu, &sigma))
    }

    /// Gradient of [`prob_act`](Self::prob_act) with respect to every parameter,
    /// flattened in parameter order
    pub fn grad_probs(&self, action: &[f32], obs: &[f32]) -> error::Result<Vec<f32>> {
        let density = self.log_density(action, obs)?.exp();
        self.core.grads(density)
    }

    /// Differential entropy of the action distribution at `obs`
    pub fn entropy(&self, obs: &[f32]) -> error::Result<f32> {
        let (_, sigma) = self.probs(obs)?;
        Ok(gauss_entropy(&sigma))
    }

    pub fn get_params(&self) -> error::Result<Vec<f32>> {
        self.core.params()
    }

    /// Replace all parameters; a vector of the wrong length leaves the model untouched
    pub fn set_params(&mut self, params: &[f32]) -> error::Result<()> {
        self.core.set_params(params)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> error::Result<()> {
        self.core.save(path.as_ref())
    }

    pub fn restore(&mut self, path: impl AsRef<Path>) -> error::Result<()> {
        self.core.restore(path.as_ref())
    }

    /// Serialize the full parameter set to an opaque byte string
    pub fn export_state(&self) -> error::Result<Vec<u8>> {
        self.core.export_state()
    }

    /// An independent model holding a snapshot of the current parameters
    pub fn copy(&self) -> error::Result<Self> {
        let model = Self::import_state(&self.export_state()?, self.device())?;
        debug!("copied continuous policy model");
        Ok(model)
    }
}
