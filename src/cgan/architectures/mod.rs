//! Conditional DCGAN networks.
//!
//! Both networks follow the same spatial plan: an image of side `image_size` is
//! reached from a `base × base` map by `doublings` stride-2 layers, with
//! `image_size = base * 2^doublings`, `base <= 7` and `doublings >= 1`
//! (28 = 7·2², 64 = 4·2⁴).

pub mod discriminator;
pub mod generator;

use burn::{config::Config, nn::Initializer, tensor::backend::Backend};

use crate::error::{self, CganError};

pub use discriminator::Discriminator;
pub use generator::Generator;

/// Largest starting map the first transposed convolution produces.
pub const MAX_BASE: usize = 7;

/// DCGAN initialisation for convolution weights.
pub fn dcgan_initializer() -> Initializer {
    Initializer::Normal {
        mean: 0.0,
        std: 0.02,
    }
}

/// Spatial plan shared by the generator and the discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub base: usize,
    pub doublings: usize,
}

impl Geometry {
    pub fn for_image_size(image_size: usize) -> error::Result<Self> {
        let mut base = image_size;
        let mut doublings = 0;
        while base > 0 && base % 2 == 0 && (base > MAX_BASE || doublings == 0) {
            base /= 2;
            doublings += 1;
        }
        if doublings == 0 || base == 0 || base > MAX_BASE {
            return Err(CganError::InvalidImageSize(image_size));
        }
        Ok(Self { base, doublings })
    }

    pub fn image_size(&self) -> usize {
        self.base << self.doublings
    }
}

#[derive(Config, Debug)]
pub struct ModelConfig {
    /// Length of the condition vector.
    pub num_classes: usize,
    pub num_channels: usize,
    pub image_size: usize,
    /// Latent noise dimension.
    #[config(default = 100)]
    pub nz: usize,
    /// Generator width.
    #[config(default = 64)]
    pub ngf: usize,
    /// Discriminator width.
    #[config(default = 64)]
    pub ndf: usize,
}

impl ModelConfig {
    pub fn geometry(&self) -> error::Result<Geometry> {
        Geometry::for_image_size(self.image_size)
    }

    /// Generator input width: noise concatenated with the condition.
    pub fn generator_input_dim(&self) -> usize {
        self.nz + self.num_classes
    }

    /// Discriminator input channels: image channels plus the condition map.
    pub fn discriminator_input_channels(&self) -> usize {
        self.num_channels + self.num_classes
    }

    pub fn init_generator<B: Backend>(&self, device: &B::Device) -> error::Result<Generator<B>> {
        Ok(Generator::new(self, self.geometry()?, device))
    }

    pub fn init_discriminator<B: Backend>(&self, device: &B::Device) -> error::Result<Discriminator<B>> {
        Ok(Discriminator::new(self, self.geometry()?, device))
    }
}
