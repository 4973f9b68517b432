//! Labeled image datasets.
//!
//! Every dataset maps an index to an image in `[C, H, W]` layout and a condition
//! vector whose length equals the dataset's declared class count.

pub mod batcher;
pub mod celeba;
pub mod noisy_mnist;
pub mod transform;

use rand::rngs::StdRng;

use crate::error::{CganError, Result};

pub use batcher::{build_batch, condition_map, Batch, BatchLoader, EpochBatches};
pub use celeba::{CelebADataset, Split, Target, TargetPart, TargetTransform, TargetType};
pub use noisy_mnist::NoisyMnistDataset;
pub use transform::ImageTransform;

/// Decoded image, channel-major (`[C, H, W]`), already normalised.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    pub pixels: Vec<f32>,
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl ImageData {
    pub fn new(pixels: Vec<f32>, channels: usize, height: usize, width: usize) -> Self {
        debug_assert_eq!(pixels.len(), channels * height * width);
        Self {
            pixels,
            channels,
            height,
            width,
        }
    }

    pub fn filled(value: f32, channels: usize, height: usize, width: usize) -> Self {
        Self::new(vec![value; channels * height * width], channels, height, width)
    }

    pub fn shape(&self) -> [usize; 3] {
        [self.channels, self.height, self.width]
    }
}

/// One (image, condition) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub image: ImageData,
    pub condition: Vec<f32>,
}

/// Index-addressable source of conditioned images.
///
/// `get` receives the caller's RNG so random augmentations stay reproducible
/// from the run seed.
pub trait LabeledImageDataset: Send + Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Length of every condition vector.
    fn num_classes(&self) -> usize;

    fn num_channels(&self) -> usize;

    /// Square side length of every image.
    fn image_size(&self) -> usize;

    fn get(&self, index: usize, rng: &mut StdRng) -> Result<Sample>;
}

/// Fixed samples held in memory.
#[derive(Debug, Clone)]
pub struct InMemoryDataset {
    samples: Vec<Sample>,
    num_classes: usize,
    num_channels: usize,
    image_size: usize,
}

impl InMemoryDataset {
    pub fn new(samples: Vec<Sample>, num_classes: usize) -> Result<Self> {
        let first = samples.first().ok_or(CganError::EmptyDataset)?;
        let [num_channels, image_size, width] = first.image.shape();
        if image_size != width {
            return Err(CganError::InvalidConfig(format!(
                "images must be square, got {}x{}",
                image_size, width
            )));
        }

        for (index, sample) in samples.iter().enumerate() {
            let [c, h, w] = sample.image.shape();
            if [c, h, w] != [num_channels, image_size, width] {
                return Err(CganError::BatchShapeMismatch {
                    index,
                    expected: [1, num_channels, image_size, width],
                    found: [1, c, h, w],
                });
            }
            if sample.condition.len() != num_classes {
                return Err(CganError::ConditionLengthMismatch {
                    index,
                    expected: num_classes,
                    found: sample.condition.len(),
                });
            }
        }

        Ok(Self {
            samples,
            num_classes,
            num_channels,
            image_size,
        })
    }
}

impl LabeledImageDataset for InMemoryDataset {
    fn len(&self) -> usize {
        self.samples.len()
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn num_channels(&self) -> usize {
        self.num_channels
    }

    fn image_size(&self) -> usize {
        self.image_size
    }

    fn get(&self, index: usize, _rng: &mut StdRng) -> Result<Sample> {
        self.samples
            .get(index)
            .cloned()
            .ok_or_else(|| CganError::InvalidConfig(format!("index {} out of range", index)))
    }
}

/// One-hot encode `label` over `num_classes` entries.
pub fn one_hot(label: usize, num_classes: usize) -> Vec<f32> {
    let mut v = vec![0.0; num_classes];
    if label < num_classes {
        v[label] = 1.0;
    }
    v
}
