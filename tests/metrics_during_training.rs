//! IS / FID / KID scalars at save events with an injected feature extractor.

use burn::backend::Autodiff;
use burn::tensor::Tensor;
use burn_ndarray::NdArray;
use cgan_rs::cgan::metrics::{ExtractedFeatures, FeatureExtractor};
use cgan_rs::cgan::sink::{self, MemoryScalarSink};
use cgan_rs::cgan::train::{Trainer, TrainingConfig};
use cgan_rs::test_utils::{one_hot_dataset, tiny_model_config};
use nalgebra::DMatrix;

type TestBackend = Autodiff<NdArray<f32>>;
type InferenceBackend = NdArray<f32>;

/// Per-channel spatial means as pooled features; logits are the same values
/// scaled down.
struct ChannelMeanExtractor;

impl FeatureExtractor<InferenceBackend> for ChannelMeanExtractor {
    fn extract(&self, images: Tensor<InferenceBackend, 4>) -> cgan_rs::Result<ExtractedFeatures> {
        let [b, c, h, w] = images.dims();
        assert_eq!(c, 3, "extractor input is always three-channel");
        let values: Vec<f32> = images.into_data().to_vec().unwrap();
        let pool = DMatrix::from_fn(b, c, |i, j| {
            let start = (i * c + j) * h * w;
            values[start..start + h * w].iter().map(|&v| v as f64).sum::<f64>() / (h * w) as f64
        });
        let logits = pool.clone() / 255.0;
        Ok(ExtractedFeatures { pool, logits })
    }
}

fn config() -> TrainingConfig {
    TrainingConfig::new(tiny_model_config(2, 1))
        .with_batch_size(4)
        .with_epochs(2)
        .with_grid_size(4)
        .with_compute_metrics(true)
}

#[test]
fn test_metrics_logged_at_each_save_event() {
    let run = tempfile::tempdir().unwrap();
    let device = Default::default();
    let dataset = one_hot_dataset(4, 2, 1, 8).unwrap();

    let mut trainer = Trainer::<TestBackend>::new(config(), run.path(), &device)
        .unwrap()
        .with_extractor(Box::new(ChannelMeanExtractor));
    let mut scalars = MemoryScalarSink::new();
    let summary = trainer.train(&dataset, &mut scalars).unwrap();

    // one batch per epoch, each one a save event
    assert_eq!(summary.checkpoints.len(), 2);
    let is = scalars.values(sink::METRIC_IS);
    let fid = scalars.values(sink::METRIC_FID);
    let kid = scalars.values(sink::METRIC_KID);
    assert_eq!(is.len(), 2);
    assert_eq!(fid.len(), 2);
    assert_eq!(kid.len(), 2);
    assert!(is.iter().all(|v| *v >= 1.0 - 1e-5));
    assert!(fid.iter().chain(kid.iter()).all(|v| v.is_finite()));

    let steps: Vec<usize> = scalars
        .records
        .iter()
        .filter(|r| r.tag == sink::METRIC_FID)
        .map(|r| r.step)
        .collect();
    assert_eq!(steps, vec![0, 1]);
}

#[test]
fn test_metrics_skipped_without_extractor() {
    let run = tempfile::tempdir().unwrap();
    let device = Default::default();
    let dataset = one_hot_dataset(4, 2, 1, 8).unwrap();

    let mut trainer = Trainer::<TestBackend>::new(config(), run.path(), &device).unwrap();
    let mut scalars = MemoryScalarSink::new();
    trainer.train(&dataset, &mut scalars).unwrap();

    assert!(scalars.values(sink::METRIC_IS).is_empty());
    assert_eq!(scalars.values(sink::LOSS_D).len(), 2);
}
