use std::path::Path;

use burn::{
    module::{Param, ParamId},
    nn::Linear,
    prelude::*,
    record::{BinFileRecorder, FullPrecisionSettings, NamedMpkBytesRecorder, Recorder},
    tensor::{backend::AutodiffBackend, Data, DataSerialize, Shape},
};
use log::debug;

use crate::{
    error::{Error, Result},
    flatten::{ParamFlatten, ParamSpec},
};

pub mod continuous;
pub mod discrete;

pub use continuous::{ContinuousModel, ContinuousModelConfig, ContinuousNet};
pub use discrete::{DiscreteModel, DiscreteModelConfig, DiscreteNet};

/// Dimensions of a policy network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetDims {
    /// Number of discrete actions, or dimensionality of a continuous action
    pub d_u: usize,
    /// Dimensionality of an observation
    pub d_o: usize,
    /// Width of the hidden layer
    pub hidden: usize,
}

/// A feed-forward network of [`Linear`] layers used inside a policy model
///
/// The trainable parameters are the weight and bias of every layer, in the order
/// returned by [`layers`](PolicyNet::layers). That order is what the flat parameter
/// vector follows.
pub trait PolicyNet<B: AutodiffBackend>: Module<B> {
    /// Build a freshly initialized network
    fn init(dims: NetDims, device: &B::Device) -> Self;

    fn dims(&self) -> NetDims;

    /// Dimensions of the network a record was taken from
    fn record_dims(record: &<Self as Module<B>>::Record) -> NetDims;

    /// Named layers, in parameter order
    fn layers(&self) -> Vec<(&'static str, &Linear<B>)>;

    /// Rebuild the network by passing every layer through `f`, in parameter order
    fn map_layers<F>(self, f: F) -> Self
    where
        F: FnMut(Linear<B>) -> Linear<B>;

    fn param_specs(&self) -> Vec<ParamSpec> {
        self.layers()
            .into_iter()
            .flat_map(|(name, layer)| {
                let mut specs = vec![ParamSpec::new(
                    format!("{name}.weight"),
                    layer.weight.dims(),
                )];
                if let Some(bias) = &layer.bias {
                    specs.push(ParamSpec::new(format!("{name}.bias"), bias.dims()));
                }
                specs
            })
            .collect()
    }

    fn param_values(&self) -> Vec<DataSerialize<f32>> {
        self.layers()
            .into_iter()
            .flat_map(|(_, layer)| {
                let mut values = vec![serialize(layer.weight.val())];
                if let Some(bias) = &layer.bias {
                    values.push(serialize(bias.val()));
                }
                values
            })
            .collect()
    }

    /// Gradient of every parameter, zero for parameters the output does not depend on
    fn param_grads(&self, grads: &B::Gradients) -> Vec<DataSerialize<f32>> {
        self.layers()
            .into_iter()
            .flat_map(|(_, layer)| {
                let mut values = vec![param_grad(&layer.weight, grads)];
                if let Some(bias) = &layer.bias {
                    values.push(param_grad(bias, grads));
                }
                values
            })
            .collect()
    }

    /// Replace every parameter with the given values, in parameter order
    ///
    /// Values must already have been validated against [`param_specs`](PolicyNet::param_specs).
    fn load_param_values(self, values: Vec<DataSerialize<f32>>, device: &B::Device) -> Self {
        let mut values = values.into_iter();
        self.map_layers(|mut layer| {
            if let Some(weight) = values.next() {
                layer.weight = param_from(weight, device);
            }
            if layer.bias.is_some() {
                layer.bias = values.next().map(|bias| param_from(bias, device));
            }
            layer
        })
    }
}

pub(crate) fn serialize<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> DataSerialize<f32> {
    let data = tensor.into_data().convert::<f32>();
    DataSerialize::new(data.value, data.shape.dims.to_vec())
}

pub(crate) fn to_vec<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Vec<f32> {
    tensor.into_data().convert::<f32>().value
}

fn param_grad<B: AutodiffBackend, const D: usize>(
    param: &Param<Tensor<B, D>>,
    grads: &B::Gradients,
) -> DataSerialize<f32> {
    match param.grad(grads) {
        Some(grad) => serialize(grad),
        None => {
            let shape = param.dims().to_vec();
            DataSerialize::new(vec![0.0; shape.iter().product()], shape)
        }
    }
}

fn param_from<B: AutodiffBackend, const D: usize>(
    value: DataSerialize<f32>,
    device: &B::Device,
) -> Param<Tensor<B, D>> {
    Param::initialized(
        ParamId::new(),
        Tensor::<B, D>::from_floats(value, device).require_grad(),
    )
}

// parameters loaded from a record are not guaranteed to require gradients
fn track_grads<B: AutodiffBackend, N: PolicyNet<B>>(net: N, device: &B::Device) -> N {
    let values = net.param_values();
    net.load_param_values(values, device)
}

/// State shared by every policy model: the network it exclusively owns, the
/// flattener for its parameters and the device it lives on
pub(crate) struct ModelCore<B: AutodiffBackend, N> {
    net: N,
    flatten: ParamFlatten,
    device: B::Device,
}

impl<B, N> ModelCore<B, N>
where
    B: AutodiffBackend,
    N: PolicyNet<B>,
{
    pub fn new(net: N, device: &B::Device) -> Self {
        let flatten = ParamFlatten::new(net.param_specs());
        debug!(
            "built policy network {:?} with {} parameters",
            net.dims(),
            flatten.total_size()
        );
        Self {
            net,
            flatten,
            device: device.clone(),
        }
    }

    /// Rebuild a model from bytes produced by [`export_state`](Self::export_state)
    pub fn import_state(bytes: &[u8], device: &B::Device) -> Result<Self> {
        let recorder = NamedMpkBytesRecorder::<FullPrecisionSettings>::default();
        let record: <N as Module<B>>::Record =
            Recorder::<B>::load(&recorder, bytes.to_vec(), device)?;
        let net = N::init(N::record_dims(&record), device).load_record(record);
        Ok(Self::new(track_grads(net, device), device))
    }

    pub fn net(&self) -> &N {
        &self.net
    }

    pub fn dims(&self) -> NetDims {
        self.net.dims()
    }

    pub fn flatten(&self) -> &ParamFlatten {
        &self.flatten
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    /// A `[1, len]` tensor holding `values`, which must have exactly `len` elements
    pub fn row(&self, values: &[f32], len: usize) -> Result<Tensor<B, 2>> {
        if values.len() != len {
            return Err(Error::LengthMismatch {
                expected: len,
                found: values.len(),
            });
        }
        let data = Data::new(values.to_vec(), Shape::new([1, len]));
        Ok(Tensor::from_floats(data, &self.device))
    }

    pub fn observation(&self, obs: &[f32]) -> Result<Tensor<B, 2>> {
        self.row(obs, self.dims().d_o)
    }

    pub fn params(&self) -> Result<Vec<f32>> {
        self.flatten.pack(&self.net.param_values())
    }

    /// Replace all parameters; on error the current parameters are kept
    pub fn set_params(&mut self, params: &[f32]) -> Result<()> {
        let values = self.flatten.unpack(params)?;
        self.net = self.net.clone().load_param_values(values, &self.device);
        Ok(())
    }

    /// Flat gradient of the scalar `output` with respect to every parameter
    pub fn grads(&self, output: Tensor<B, 1>) -> Result<Vec<f32>> {
        let grads = output.backward();
        self.flatten.pack(&self.net.param_grads(&grads))
    }

    pub fn export_state(&self) -> Result<Vec<u8>> {
        let recorder = NamedMpkBytesRecorder::<FullPrecisionSettings>::default();
        Ok(Recorder::<B>::record(
            &recorder,
            self.net.clone().into_record(),
            (),
        )?)
    }

    /// Write a checkpoint to `path` (the recorder adds a `.bin` extension)
    pub fn save(&self, path: &Path) -> Result<()> {
        let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
        self.net.clone().save_file(path.to_path_buf(), &recorder)?;
        Ok(())
    }

    pub fn restore(&mut self, path: &Path) -> Result<()> {
        let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
        let record: <N as Module<B>>::Record =
            Recorder::<B>::load(&recorder, path.to_path_buf(), &self.device)?;
        self.load_checked(record)?;
        debug!("restored policy network from {}", path.display());
        Ok(())
    }

    fn load_checked(&mut self, record: <N as Module<B>>::Record) -> Result<()> {
        let expected = self.dims();
        let found = N::record_dims(&record);
        if found != expected {
            return Err(Error::IncompatibleState { expected, found });
        }
        self.net = track_grads(self.net.clone().load_record(record), &self.device);
        Ok(())
    }
}
