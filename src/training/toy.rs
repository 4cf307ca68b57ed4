//! Small networks with hand-checkable behavior for the training tests.

use burn::backend::{Autodiff, NdArray};
use burn::module::Param;
use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::tanh;

use crate::model::{Critic, ImageGenerator};

pub type TestBackend = Autodiff<NdArray<f32>>;

/// Linear projection of the noise reshaped to `[N, channels, size, size]`.
#[derive(Module, Debug)]
pub struct ToyGenerator<B: Backend> {
    pub linear: Linear<B>,
    channels: usize,
    size: usize,
}

impl<B: Backend> ToyGenerator<B> {
    pub fn new(z_dim: usize, channels: usize, size: usize, device: &B::Device) -> Self {
        ToyGenerator {
            linear: LinearConfig::new(z_dim, channels * size * size).init(device),
            channels,
            size,
        }
    }
}

impl<B: Backend> ImageGenerator<B> for ToyGenerator<B> {
    fn generate(&self, noise: Tensor<B, 2>) -> Tensor<B, 4> {
        let batch_size = noise.dims()[0];
        tanh(self.linear.forward(noise)).reshape([batch_size, self.channels, self.size, self.size])
    }
}

/// Flattened image through a single linear layer.
#[derive(Module, Debug)]
pub struct ToyCritic<B: Backend> {
    pub linear: Linear<B>,
}

impl<B: Backend> ToyCritic<B> {
    pub fn new(channels: usize, size: usize, device: &B::Device) -> Self {
        ToyCritic {
            linear: LinearConfig::new(channels * size * size, 1).init(device),
        }
    }
}

impl<B: Backend> Critic<B> for ToyCritic<B> {
    fn score(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        self.linear.forward(images.flatten::<2>(1, 3))
    }
}

/// `D(x) = x . w` with explicit weights, so `grad_x D = w` for every sample.
#[derive(Module, Debug)]
pub struct LinearCritic<B: Backend> {
    pub weight: Param<Tensor<B, 2>>,
}

impl<B: Backend> LinearCritic<B> {
    pub fn new<const N: usize>(weights: [f32; N], device: &B::Device) -> Self {
        let weight = Tensor::<B, 1>::from_floats(weights, device).reshape([N, 1]);
        LinearCritic {
            weight: Param::from_tensor(weight),
        }
    }
}

impl<B: Backend> Critic<B> for LinearCritic<B> {
    fn score(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        images.flatten::<2>(1, 3).matmul(self.weight.val())
    }
}

/// `D(x) = scale / 2 * |x|^2`, so `grad_x D = scale * x`.
#[derive(Module, Debug)]
pub struct QuadraticCritic<B: Backend> {
    pub scale: Param<Tensor<B, 1>>,
}

impl<B: Backend> QuadraticCritic<B> {
    pub fn new(scale: f32, device: &B::Device) -> Self {
        QuadraticCritic {
            scale: Param::from_tensor(Tensor::from_floats([scale], device)),
        }
    }
}

impl<B: Backend> Critic<B> for QuadraticCritic<B> {
    fn score(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        images
            .powf_scalar(2.0)
            .flatten::<2>(1, 3)
            .sum_dim(1)
            .mul(self.scale.val().unsqueeze::<2>())
            .mul_scalar(0.5)
    }
}

/// Flattened values of a tensor, for before/after comparisons.
pub fn snapshot<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Vec<f32> {
    tensor.into_data().convert::<f32>().to_vec().unwrap()
}
