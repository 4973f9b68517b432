//! Epoch shuffling and batch assembly.
//!
//! Sample decoding fans out over a bounded rayon pool; each sample gets its own
//! RNG seeded from the caller's, so results do not depend on scheduling.

use burn::tensor::{backend::Backend, Tensor, TensorData};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use rayon::prelude::*;

use super::{LabeledImageDataset, Sample};
use crate::error::{CganError, Result};

/// Images `[B, C, H, W]` and conditions `[B, num_classes]`.
#[derive(Debug, Clone)]
pub struct Batch<B: Backend> {
    pub images: Tensor<B, 4>,
    pub conditions: Tensor<B, 2>,
}

impl<B: Backend> Batch<B> {
    pub fn size(&self) -> usize {
        self.images.dims()[0]
    }
}

/// Index order for one pass over the dataset.
#[derive(Debug, Clone)]
pub struct EpochBatches {
    batches: Vec<Vec<usize>>,
}

impl EpochBatches {
    /// Shuffle `0..len` and chunk it; the last batch may be short.
    pub fn shuffled(len: usize, batch_size: usize, rng: &mut StdRng) -> Self {
        let mut order: Vec<usize> = (0..len).collect();
        order.shuffle(rng);
        Self {
            batches: order.chunks(batch_size.max(1)).map(|c| c.to_vec()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[usize]> {
        self.batches.iter().map(|b| b.as_slice())
    }
}

pub struct BatchLoader {
    pool: rayon::ThreadPool,
    batch_size: usize,
}

impl BatchLoader {
    pub fn new(batch_size: usize, num_workers: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(CganError::InvalidConfig("batch_size must be positive".to_string()));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_workers.max(1))
            .thread_name(|i| format!("cgan-loader-{}", i))
            .build()
            .map_err(|e| CganError::InvalidConfig(format!("cannot start loader pool: {}", e)))?;
        Ok(Self { pool, batch_size })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn epoch(&self, len: usize, rng: &mut StdRng) -> EpochBatches {
        EpochBatches::shuffled(len, self.batch_size, rng)
    }

    /// Decode `indices` in parallel and stack them into a batch.
    pub fn load<B: Backend>(
        &self,
        dataset: &dyn LabeledImageDataset,
        indices: &[usize],
        rng: &mut StdRng,
        device: &B::Device,
    ) -> Result<Batch<B>> {
        let seeds: Vec<u64> = indices.iter().map(|_| rng.gen()).collect();
        let samples = self.pool.install(|| {
            indices
                .par_iter()
                .zip(seeds.par_iter())
                .map(|(&index, &seed)| {
                    let mut sample_rng = StdRng::seed_from_u64(seed);
                    dataset.get(index, &mut sample_rng)
                })
                .collect::<Result<Vec<Sample>>>()
        })?;
        build_batch(&samples, dataset.num_classes(), device)
    }
}

/// Stack samples; every image must share one shape and every condition must
/// have `num_classes` entries.
pub fn build_batch<B: Backend>(
    samples: &[Sample],
    num_classes: usize,
    device: &B::Device,
) -> Result<Batch<B>> {
    let first = samples.first().ok_or(CganError::EmptyDataset)?;
    let [c, h, w] = first.image.shape();
    let b = samples.len();

    let mut pixels = Vec::with_capacity(b * c * h * w);
    let mut conditions = Vec::with_capacity(b * num_classes);
    for (index, sample) in samples.iter().enumerate() {
        let [sc, sh, sw] = sample.image.shape();
        if [sc, sh, sw] != [c, h, w] {
            return Err(CganError::BatchShapeMismatch {
                index,
                expected: [b, c, h, w],
                found: [b, sc, sh, sw],
            });
        }
        if sample.condition.len() != num_classes {
            return Err(CganError::ConditionLengthMismatch {
                index,
                expected: num_classes,
                found: sample.condition.len(),
            });
        }
        pixels.extend_from_slice(&sample.image.pixels);
        conditions.extend_from_slice(&sample.condition);
    }

    Ok(Batch {
        images: Tensor::from_data(TensorData::new(pixels, [b, c, h, w]), device),
        conditions: Tensor::from_data(TensorData::new(conditions, [b, num_classes]), device),
    })
}

/// Broadcast `[B, C]` conditions to `[B, C, height, width]`.
pub fn condition_map<B: Backend>(conditions: Tensor<B, 2>, height: usize, width: usize) -> Tensor<B, 4> {
    let [b, c] = conditions.dims();
    conditions
        .reshape([b, c, 1, 1])
        .repeat_dim(2, height)
        .repeat_dim(3, width)
}
