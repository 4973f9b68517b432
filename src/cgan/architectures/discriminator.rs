use burn::{
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        BatchNorm, BatchNormConfig, PaddingConfig2d,
    },
    tensor::{activation::leaky_relu, backend::Backend, Tensor},
};

use super::{dcgan_initializer, Geometry, ModelConfig};

const LEAKY_SLOPE: f64 = 0.2;

fn conv(channels: [usize; 2], kernel: usize, stride: usize, padding: usize) -> Conv2dConfig {
    Conv2dConfig::new(channels, [kernel, kernel])
        .with_stride([stride, stride])
        .with_padding(PaddingConfig2d::Explicit(padding, padding))
        .with_bias(false)
        .with_initializer(dcgan_initializer())
}

/// Strided convolution, batch-norm, LeakyReLU.
#[derive(Module, Debug)]
pub struct DownBlock<B: Backend> {
    conv: Conv2d<B>,
    norm: BatchNorm<B, 2>,
}

impl<B: Backend> DownBlock<B> {
    fn new(channels: [usize; 2], device: &B::Device) -> Self {
        Self {
            conv: conv(channels, 4, 2, 1).init(device),
            norm: BatchNormConfig::new(channels[1]).init(device),
        }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        leaky_relu(self.norm.forward(self.conv.forward(x)), LEAKY_SLOPE)
    }
}

/// Scores `[B, C + num_classes, H, W]` inputs (image stacked with its
/// condition map) and returns raw logits `[B, 1]`.
#[derive(Module, Debug)]
pub struct Discriminator<B: Backend> {
    input: Conv2d<B>,
    blocks: Vec<DownBlock<B>>,
    output: Conv2d<B>,
}

impl<B: Backend> Discriminator<B> {
    pub fn new(config: &ModelConfig, geometry: Geometry, device: &B::Device) -> Self {
        // first layer carries no batch-norm
        let input = conv([config.discriminator_input_channels(), config.ndf], 4, 2, 1).init(device);

        let mut blocks = Vec::with_capacity(geometry.doublings - 1);
        let mut channels = config.ndf;
        for _ in 1..geometry.doublings {
            blocks.push(DownBlock::new([channels, channels * 2], device));
            channels *= 2;
        }

        let output = conv([channels, 1], geometry.base, 1, 0).init(device);

        Self { input, blocks, output }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let batch = x.dims()[0];
        let mut x = leaky_relu(self.input.forward(x), LEAKY_SLOPE);
        for block in &self.blocks {
            x = block.forward(x);
        }
        self.output.forward(x).reshape([batch, 1])
    }
}
