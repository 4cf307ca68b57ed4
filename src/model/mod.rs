//! Generator/discriminator pair, the traits the training loop sees them
//! through, and the builder that initializes networks and optimizers.

mod discriminator;
mod generator;

use burn::module::AutodiffModule;
use burn::nn::Initializer;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, AdamConfig};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;

pub use discriminator::{Discriminator, DiscriminatorConfig};
pub use generator::{Generator, GeneratorConfig};

use crate::config::{ModelSection, TrainingSection};

/// A network mapping a noise batch `[N, z]` to an image batch `[N, C, S, S]`.
pub trait ImageGenerator<B: Backend> {
    fn generate(&self, noise: Tensor<B, 2>) -> Tensor<B, 4>;
}

/// A network scoring an image batch `[N, C, S, S]` as `[N, 1]`.
pub trait Critic<B: Backend> {
    fn score(&self, images: Tensor<B, 4>) -> Tensor<B, 2>;
}

/// A module whose parameters are detached from the autodiff graph.
///
/// Gradients still flow through a frozen critic back to its input, which is
/// what the generator step needs, but none are recorded for its own weights.
#[derive(Debug, Clone)]
pub struct Frozen<M> {
    module: M,
}

impl<M> Frozen<M> {
    pub fn new<B>(module: M) -> Self
    where
        B: AutodiffBackend,
        M: AutodiffModule<B>,
    {
        Frozen {
            module: module.no_grad(),
        }
    }

    pub fn module(&self) -> &M {
        &self.module
    }
}

/// Weight initializer shared by every conv/linear layer.
pub(crate) fn normal_init(std: f64) -> Initializer {
    Initializer::Normal { mean: 0.0, std }
}

/// Number of stride-2 stages between a 4x4 feature map and `image_size`.
pub(crate) fn upsampling_stages(image_size: usize) -> usize {
    (image_size.trailing_zeros() as usize).saturating_sub(2)
}

/// Architecture hyperparameters for both networks.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub generator: GeneratorConfig,
    pub discriminator: DiscriminatorConfig,
}

impl ModelConfig {
    pub fn from_section(model: &ModelSection) -> Self {
        ModelConfig {
            generator: GeneratorConfig::new(
                model.img_size,
                model.z_dim,
                model.g_conv_dim,
                model.channels,
            )
            .with_init_std(model.init_std),
            discriminator: DiscriminatorConfig::new(
                model.img_size,
                model.d_conv_dim,
                model.channels,
            )
            .with_init_std(model.init_std),
        }
    }

    /// Build both networks and log their structure.
    pub fn build<B: Backend>(&self, device: &B::Device) -> (Generator<B>, Discriminator<B>) {
        let generator = self.generator.init::<B>(device);
        let discriminator = self.discriminator.init::<B>(device);

        tracing::info!(params = generator.num_params(), "generator:\n{generator}");
        tracing::info!(
            params = discriminator.num_params(),
            "discriminator:\n{discriminator}"
        );

        (generator, discriminator)
    }
}

/// Adam optimizers for the pair, sharing the momentum coefficients.
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    pub beta1: f32,
    pub beta2: f32,
}

impl OptimizerConfig {
    pub fn from_section(training: &TrainingSection) -> Self {
        OptimizerConfig {
            beta1: training.beta1,
            beta2: training.beta2,
        }
    }

    fn adam(&self) -> AdamConfig {
        AdamConfig::new()
            .with_beta_1(self.beta1)
            .with_beta_2(self.beta2)
    }

    /// One optimizer per network; each only ever sees its own network's gradients.
    #[allow(clippy::type_complexity)]
    pub fn build<B, G, D>(&self) -> (OptimizerAdaptor<Adam, G, B>, OptimizerAdaptor<Adam, D, B>)
    where
        B: AutodiffBackend,
        G: AutodiffModule<B>,
        D: AutodiffModule<B>,
    {
        (self.adam().init(), self.adam().init())
    }
}
