use std::path::Path;

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::{
        activation::{relu, softmax},
        backend::AutodiffBackend,
    },
};
use log::debug;
use rand::{
    distributions::{Distribution, WeightedIndex},
    thread_rng,
};

use super::{to_vec, ModelCore, NetDims, PolicyNet};
use crate::{
    error::{self, Error},
    flatten::ParamFlatten,
};

/// Categorical policy network: one ReLU hidden layer followed by a softmax output
#[derive(Module, Debug)]
pub struct DiscreteNet<B: Backend> {
    fc1: Linear<B>,
    fc2: Linear<B>,
}

impl<B: Backend> DiscreteNet<B> {
    /// Action probabilities for a batch of observations
    ///
    /// `[batch, d_o]` -> `[batch, d_u]`
    pub fn forward(&self, obs: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = relu(self.fc1.forward(obs));
        softmax(self.fc2.forward(x), 1)
    }
}

impl<B: AutodiffBackend> PolicyNet<B> for DiscreteNet<B> {
    fn init(dims: NetDims, device: &B::Device) -> Self {
        Self {
            fc1: LinearConfig::new(dims.d_o, dims.hidden).init(device),
            fc2: LinearConfig::new(dims.hidden, dims.d_u).init(device),
        }
    }

    fn dims(&self) -> NetDims {
        let [d_o, hidden] = self.fc1.weight.dims();
        let [_, d_u] = self.fc2.weight.dims();
        NetDims { d_u, d_o, hidden }
    }

    fn record_dims(record: &DiscreteNetRecord<B>) -> NetDims {
        let [d_o, hidden] = record.fc1.weight.dims();
        let [_, d_u] = record.fc2.weight.dims();
        NetDims { d_u, d_o, hidden }
    }

    fn layers(&self) -> Vec<(&'static str, &Linear<B>)> {
        vec![("fc1", &self.fc1), ("fc2", &self.fc2)]
    }

    fn map_layers<F>(self, mut f: F) -> Self
    where
        F: FnMut(Linear<B>) -> Linear<B>,
    {
        Self {
            fc1: f(self.fc1),
            fc2: f(self.fc2),
        }
    }
}

#[derive(Config, Debug)]
pub struct DiscreteModelConfig {
    /// Number of actions
    d_u: usize,
    /// Observation dimensionality
    d_o: usize,
    #[config(default = 5)]
    hidden: usize,
}

impl DiscreteModelConfig {
    pub fn init<B: AutodiffBackend>(&self, device: &B::Device) -> DiscreteModel<B> {
        let dims = NetDims {
            d_u: self.d_u,
            d_o: self.d_o,
            hidden: self.hidden,
        };
        DiscreteModel::from_core(ModelCore::new(DiscreteNet::init(dims, device), device))
    }
}

/// Probability of one fixed action, as a function of the network and an observation
type ActionProb<B> = Box<dyn Fn(&DiscreteNet<B>, Tensor<B, 2>) -> Tensor<B, 1> + Send + Sync>;

/// A categorical distribution over `d_u` actions conditioned on a `d_o`-dimensional observation
///
/// The model exclusively owns its network. Copies never alias parameters: [`copy`](Self::copy)
/// goes through a serialized snapshot.
pub struct DiscreteModel<B: AutodiffBackend> {
    core: ModelCore<B, DiscreteNet<B>>,
    action_probs: Vec<ActionProb<B>>,
}

impl<B: AutodiffBackend> DiscreteModel<B> {
    /// Initialize a model with random parameters and the default hidden width
    pub fn new(d_u: usize, d_o: usize, device: &B::Device) -> Self {
        DiscreteModelConfig::new(d_u, d_o).init(device)
    }

    fn from_core(core: ModelCore<B, DiscreteNet<B>>) -> Self {
        let action_probs = (0..core.dims().d_u)
            .map(|a| {
                Box::new(move |net: &DiscreteNet<B>, obs: Tensor<B, 2>| {
                    net.forward(obs).slice([0..1, a..a + 1]).reshape([1])
                }) as ActionProb<B>
            })
            .collect();
        Self { core, action_probs }
    }

    /// Rebuild a model from bytes produced by [`export_state`](Self::export_state)
    pub fn import_state(bytes: &[u8], device: &B::Device) -> error::Result<Self> {
        ModelCore::import_state(bytes, device).map(Self::from_core)
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

    /// Probability of each action at `obs`
    pub fn probs(&self, obs: &[f32]) -> error::Result<Vec<f32>> {
        let obs = self.core.observation(obs)?;
        Ok(to_vec(self.core.net().forward(obs)))
    }

    /// Draw an action index from the distribution at `obs`
    pub fn sample(&self, obs: &[f32]) -> error::Result<usize> {
        let probs = self.probs(obs)?;
        let dist = WeightedIndex::new(&probs)?;
        Ok(dist.sample(&mut thread_rng()))
    }

    /// Gradient of the probability of `action` at `obs` with respect to every parameter,
    /// flattened in parameter order
    pub fn grad_probs(&self, action: usize, obs: &[f32]) -> error::Result<Vec<f32>> {
        let prob = self.action_probs.get(action).ok_or_else(|| {
            Error::InvalidAction(format!(
                "action {action} out of range for {} actions",
                self.d_u()
            ))
        })?;
        let obs = self.core.observation(obs)?;
        self.core.grads(prob(self.core.net(), obs))
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
        debug!("copied discrete policy model");
        Ok(model)
    }
}
