use burn::nn::conv::{ConvTranspose2d, ConvTranspose2dConfig};
use burn::nn::{BatchNorm, BatchNormConfig};
use burn::prelude::*;
use burn::tensor::activation::{relu, tanh};

use super::{normal_init, upsampling_stages, ImageGenerator};

/// Transposed convolution, batch norm, ReLU.
#[derive(Module, Debug)]
pub struct UpBlock<B: Backend> {
    conv: ConvTranspose2d<B>,
    norm: BatchNorm<B, 2>,
}

impl<B: Backend> UpBlock<B> {
    fn new(
        channels: [usize; 2],
        stride: usize,
        padding: usize,
        init_std: f64,
        device: &B::Device,
    ) -> Self {
        UpBlock {
            conv: ConvTranspose2dConfig::new(channels, [4, 4])
                .with_stride([stride, stride])
                .with_padding([padding, padding])
                .with_bias(false)
                .with_initializer(normal_init(init_std))
                .init(device),
            norm: BatchNormConfig::new(channels[1]).init(device),
        }
    }

    fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        relu(self.norm.forward(self.conv.forward(input)))
    }
}

/// DCGAN generator.
///
/// ```text
/// Noise:   [batch, z]           -> [batch, z, 1, 1]
/// Project: z -> 8w, 4x4 kernel  => [batch, 8w, 4, 4]   (w = conv_dim, 64px)
/// Up:      8w -> 4w             => [batch, 4w, 8, 8]
/// Up:      4w -> 2w             => [batch, 2w, 16, 16]
/// Up:      2w -> w              => [batch, w, 32, 32]
/// Output:  w -> channels, tanh  => [batch, channels, 64, 64]
/// ```
///
/// The number of `Up` stages follows the configured image size.
#[derive(Module, Debug)]
pub struct Generator<B: Backend> {
    project: UpBlock<B>,
    blocks: Vec<UpBlock<B>>,
    output: ConvTranspose2d<B>,
}

#[derive(Config, Debug)]
pub struct GeneratorConfig {
    pub image_size: usize,
    pub z_dim: usize,
    pub conv_dim: usize,
    pub channels: usize,
    #[config(default = 0.02)]
    pub init_std: f64,
}

impl GeneratorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Generator<B> {
        let stages = upsampling_stages(self.image_size).max(1);
        let widest = self.conv_dim << (stages - 1);

        let project = UpBlock::new([self.z_dim, widest], 1, 0, self.init_std, device);
        let blocks = (1..stages)
            .map(|i| {
                let in_channels = self.conv_dim << (stages - i);
                UpBlock::new(
                    [in_channels, in_channels / 2],
                    2,
                    1,
                    self.init_std,
                    device,
                )
            })
            .collect();
        let output = ConvTranspose2dConfig::new([self.conv_dim, self.channels], [4, 4])
            .with_stride([2, 2])
            .with_padding([1, 1])
            .with_bias(false)
            .with_initializer(normal_init(self.init_std))
            .init(device);

        Generator {
            project,
            blocks,
            output,
        }
    }
}

impl<B: Backend> Generator<B> {
    /// Forward pass: noise [batch, z] -> images [batch, channels, size, size] in [-1, 1].
    pub fn forward(&self, noise: Tensor<B, 2>) -> Tensor<B, 4> {
        let [batch_size, z_dim] = noise.dims();
        let mut x = self
            .project
            .forward(noise.reshape([batch_size, z_dim, 1, 1]));
        for block in &self.blocks {
            x = block.forward(x);
        }
        tanh(self.output.forward(x))
    }
}

impl<B: Backend> ImageGenerator<B> for Generator<B> {
    fn generate(&self, noise: Tensor<B, 2>) -> Tensor<B, 4> {
        self.forward(noise)
    }
}
