use burn::{
    module::Module,
    nn::{
        conv::{ConvTranspose2d, ConvTranspose2dConfig},
        BatchNorm, BatchNormConfig,
    },
    tensor::{
        activation::{relu, tanh},
        backend::Backend,
        Tensor,
    },
};

use super::{dcgan_initializer, Geometry, ModelConfig};

/// Transposed convolution, batch-norm, ReLU.
#[derive(Module, Debug)]
pub struct UpBlock<B: Backend> {
    conv: ConvTranspose2d<B>,
    norm: BatchNorm<B, 2>,
}

impl<B: Backend> UpBlock<B> {
    fn new(
        channels: [usize; 2],
        kernel: usize,
        stride: usize,
        padding: usize,
        device: &B::Device,
    ) -> Self {
        let conv = ConvTranspose2dConfig::new(channels, [kernel, kernel])
            .with_stride([stride, stride])
            .with_padding([padding, padding])
            .with_bias(false)
            .with_initializer(dcgan_initializer())
            .init(device);
        let norm = BatchNormConfig::new(channels[1]).init(device);
        Self { conv, norm }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        relu(self.norm.forward(self.conv.forward(x)))
    }
}

/// Maps `[B, nz + num_classes]` conditional noise to `[B, C, H, W]` images in
/// `[-1, 1]`.
#[derive(Module, Debug)]
pub struct Generator<B: Backend> {
    blocks: Vec<UpBlock<B>>,
    output: ConvTranspose2d<B>,
    input_dim: usize,
}

impl<B: Backend> Generator<B> {
    pub fn new(config: &ModelConfig, geometry: Geometry, device: &B::Device) -> Self {
        let widest = config.ngf << (geometry.doublings - 1);

        // 1x1 -> base x base, then stride-2 doublings down to ngf channels
        let mut blocks = vec![UpBlock::new(
            [config.generator_input_dim(), widest],
            geometry.base,
            1,
            0,
            device,
        )];
        let mut channels = widest;
        for _ in 1..geometry.doublings {
            blocks.push(UpBlock::new([channels, channels / 2], 4, 2, 1, device));
            channels /= 2;
        }

        let output = ConvTranspose2dConfig::new([channels, config.num_channels], [4, 4])
            .with_stride([2, 2])
            .with_padding([1, 1])
            .with_bias(false)
            .with_initializer(dcgan_initializer())
            .init(device);

        Self {
            blocks,
            output,
            input_dim: config.generator_input_dim(),
        }
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    pub fn forward(&self, conditional_noise: Tensor<B, 2>) -> Tensor<B, 4> {
        let [batch, dim] = conditional_noise.dims();
        let mut x = conditional_noise.reshape([batch, dim, 1, 1]);
        for block in &self.blocks {
            x = block.forward(x);
        }
        tanh(self.output.forward(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_generator_output_shapes() {
        let device = Default::default();
        for (classes, channels, size) in [(10, 1, 28), (40, 3, 64)] {
            let config = ModelConfig::new(classes, channels, size)
                .with_nz(8)
                .with_ngf(4);
            let generator = config.init_generator::<TestBackend>(&device).unwrap();
            let noise = Tensor::<TestBackend, 2>::zeros([2, 8 + classes], &device);
            assert_eq!(generator.forward(noise).dims(), [2, channels, size, size]);
        }
    }

    #[test]
    fn test_generator_output_is_bounded() {
        let device = Default::default();
        let config = ModelConfig::new(2, 1, 8).with_nz(4).with_ngf(4);
        let generator = config.init_generator::<TestBackend>(&device).unwrap();
        let noise = Tensor::<TestBackend, 2>::ones([3, 6], &device) * 5.0;
        let values: Vec<f32> = generator.forward(noise).into_data().to_vec().unwrap();
        assert!(values.iter().all(|v| (-1.0..=1.0).contains(v)));
    }
}
