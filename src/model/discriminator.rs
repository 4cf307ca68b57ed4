use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::PaddingConfig2d;
use burn::prelude::*;
use burn::tensor::activation::leaky_relu;

use super::{normal_init, upsampling_stages, Critic};

const NEGATIVE_SLOPE: f64 = 0.2;

/// DCGAN discriminator without normalization layers, so each sample's score
/// depends only on that sample.
///
/// ```text
/// Input:  [batch, channels, 64, 64]              (w = conv_dim)
/// Down:   channels -> w,  4x4 s2, LeakyReLU  =>  [batch, w, 32, 32]
/// Down:   w -> 2w                            =>  [batch, 2w, 16, 16]
/// Down:   2w -> 4w                           =>  [batch, 4w, 8, 8]
/// Down:   4w -> 8w                           =>  [batch, 8w, 4, 4]
/// Score:  8w -> 1, 4x4 s1                    =>  [batch, 1]
/// ```
#[derive(Module, Debug)]
pub struct Discriminator<B: Backend> {
    blocks: Vec<Conv2d<B>>,
    score: Conv2d<B>,
}

#[derive(Config, Debug)]
pub struct DiscriminatorConfig {
    pub image_size: usize,
    pub conv_dim: usize,
    pub channels: usize,
    #[config(default = 0.02)]
    pub init_std: f64,
}

impl DiscriminatorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Discriminator<B> {
        let stages = upsampling_stages(self.image_size).max(1);

        let blocks = (0..stages)
            .map(|i| {
                let in_channels = if i == 0 {
                    self.channels
                } else {
                    self.conv_dim << (i - 1)
                };
                Conv2dConfig::new([in_channels, self.conv_dim << i], [4, 4])
                    .with_stride([2, 2])
                    .with_padding(PaddingConfig2d::Explicit(1, 1))
                    .with_initializer(normal_init(self.init_std))
                    .init(device)
            })
            .collect();
        let score = Conv2dConfig::new([self.conv_dim << (stages - 1), 1], [4, 4])
            .with_initializer(normal_init(self.init_std))
            .init(device);

        Discriminator { blocks, score }
    }
}

impl<B: Backend> Discriminator<B> {
    /// Forward pass: images [batch, channels, size, size] -> scores [batch, 1].
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let batch_size = images.dims()[0];
        let mut x = images;
        for conv in &self.blocks {
            x = leaky_relu(conv.forward(x), NEGATIVE_SLOPE);
        }
        self.score.forward(x).reshape([batch_size, 1])
    }
}

impl<B: Backend> Critic<B> for Discriminator<B> {
    fn score(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        self.forward(images)
    }
}
