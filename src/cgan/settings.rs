//! Settings module for run configuration.
//!
//! Defaults are layered under an optional `cgan.toml` (or any file passed to
//! [`Settings::load`]) and then `CGAN__`-prefixed environment variables, e.g.
//! `CGAN__TRAINING__BATCH_SIZE=64`.

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::architectures::ModelConfig;
use super::data::{celeba, CelebADataset, ImageTransform, LabeledImageDataset, NoisyMnistDataset};
use super::train::{SampleSource, TrainingConfig};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatasetKind {
    #[serde(rename = "noisy_mnist")]
    NoisyMnist,
    #[serde(rename = "celeba")]
    CelebA,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSettings {
    pub kind: DatasetKind,
    pub root: PathBuf,
    /// Number of MNIST images kept.
    pub dataset_size: usize,
    /// Fraction of MNIST labels randomised.
    pub noise_level: f64,
    /// CelebA partition: train, valid, test or all.
    pub split: String,
    /// CelebA target types, in condition order.
    pub target_types: Vec<String>,
}

impl Default for DatasetSettings {
    fn default() -> Self {
        Self {
            kind: DatasetKind::NoisyMnist,
            root: PathBuf::from("data"),
            dataset_size: 50000,
            noise_level: 0.0,
            split: "train".to_string(),
            target_types: vec!["attr".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSettings {
    pub batch_size: usize,
    pub nz: usize,
    pub ngf: usize,
    pub ndf: usize,
    pub epochs: usize,
    pub lr: f64,
    pub lr_ratio: f64,
    pub beta1: f32,
    pub beta2: f32,
    pub save_frequency: usize,
    /// Drawn at random (and logged) when unset.
    pub seed: Option<u64>,
    pub net_g: Option<String>,
    pub net_d: Option<String>,
    pub dry_run: bool,
    pub num_workers: usize,
    pub compute_metrics: bool,
    pub grid_size: usize,
    pub sample_source: SampleSource,
    pub halt_on_non_finite_loss: bool,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            batch_size: 128,
            nz: 100,
            ngf: 64,
            ndf: 64,
            epochs: 5,
            lr: 2e-4,
            lr_ratio: 1.0,
            beta1: 0.5,
            beta2: 0.999,
            save_frequency: 50,
            seed: Some(1),
            net_g: None,
            net_d: None,
            dry_run: false,
            num_workers: 1,
            compute_metrics: false,
            grid_size: 100,
            sample_source: SampleSource::Fixed,
            halt_on_non_finite_loss: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSettings {
    /// Run directory; derived from the dataset settings when unset.
    pub logdir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    pub dataset: DatasetSettings,
    pub training: TrainingSettings,
    pub output: OutputSettings,
}

impl Settings {
    /// Defaults, then `cgan.toml` if present, then `CGAN__*` variables.
    pub fn new() -> std::result::Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Like [`Settings::new`] but reads `file` instead of `cgan.toml`.
    pub fn load(file: Option<&Path>) -> std::result::Result<Self, ConfigError> {
        let defaults = Config::try_from(&Settings::default())?;
        let file_source = match file {
            Some(path) => File::from(path).required(true),
            None => File::with_name("cgan").required(false),
        };
        let settings = Config::builder()
            .add_source(defaults)
            .add_source(file_source)
            .add_source(
                Environment::with_prefix("CGAN")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("dataset.target_types"),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Configured seed, or a fresh one in `1..=10000`.
    pub fn resolve_seed(&self) -> u64 {
        match self.training.seed {
            Some(seed) => seed,
            None => {
                let seed = rand::thread_rng().gen_range(1..=10000);
                log::info!("no seed configured, drew {}", seed);
                seed
            }
        }
    }

    pub fn run_dir(&self) -> PathBuf {
        if let Some(dir) = &self.output.logdir {
            return dir.clone();
        }
        match self.dataset.kind {
            DatasetKind::NoisyMnist => PathBuf::from(format!(
                "./pretrain/dataset_size={},noise_level={}",
                self.dataset.dataset_size, self.dataset.noise_level
            )),
            DatasetKind::CelebA => PathBuf::from(format!("./runs/celeba_{}", self.dataset.split)),
        }
    }

    pub fn open_dataset(&self, seed: u64) -> Result<Box<dyn LabeledImageDataset>> {
        let ds = &self.dataset;
        let dataset: Box<dyn LabeledImageDataset> = match ds.kind {
            DatasetKind::NoisyMnist => Box::new(NoisyMnistDataset::new(ds.dataset_size, ds.noise_level, &ds.root, seed)?),
            DatasetKind::CelebA => {
                let targets: Vec<&str> = ds.target_types.iter().map(String::as_str).collect();
                Box::new(CelebADataset::new(
                    &ds.root,
                    &ds.split,
                    &targets,
                    Some(ImageTransform::celeba(celeba::IMAGE_SIZE as u32)),
                    None,
                )?)
            }
        };
        log::info!("{:?} dataset: {} samples from {}", ds.kind, dataset.len(), ds.root.display());
        Ok(dataset)
    }

    /// Training configuration for `dataset`'s geometry.
    pub fn training_config(&self, dataset: &dyn LabeledImageDataset, seed: u64) -> TrainingConfig {
        let t = &self.training;
        let model = ModelConfig::new(dataset.num_classes(), dataset.num_channels(), dataset.image_size())
            .with_nz(t.nz)
            .with_ngf(t.ngf)
            .with_ndf(t.ndf);
        TrainingConfig::new(model)
            .with_epochs(t.epochs)
            .with_batch_size(t.batch_size)
            .with_lr(t.lr)
            .with_lr_ratio(t.lr_ratio)
            .with_beta1(t.beta1)
            .with_beta2(t.beta2)
            .with_save_frequency(t.save_frequency)
            .with_seed(seed)
            .with_dry_run(t.dry_run)
            .with_grid_size(t.grid_size)
            .with_sample_source(t.sample_source)
            .with_compute_metrics(t.compute_metrics)
            .with_halt_on_non_finite_loss(t.halt_on_non_finite_loss)
            .with_num_workers(t.num_workers)
            .with_net_g(t.net_g.clone())
            .with_net_d(t.net_d.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cgan::data::{one_hot, ImageData, InMemoryDataset, Sample};

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();

        assert_eq!(settings.dataset.kind, DatasetKind::NoisyMnist);
        assert_eq!(settings.dataset.dataset_size, 50000);
        assert_eq!(settings.training.batch_size, 128);
        assert_eq!(settings.training.save_frequency, 50);
        assert_eq!(settings.training.sample_source, SampleSource::Fixed);
        assert!(!settings.training.halt_on_non_finite_loss);
        assert!(settings.output.logdir.is_none());
    }

    #[test]
    fn test_settings_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.toml");
        std::fs::write(
            &path,
            r#"
[dataset]
kind = "celeba"
root = "/data/celeba"
split = "valid"

[training]
batch_size = 64
lr_ratio = 2.0
sample_source = "batch"
"#,
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.dataset.kind, DatasetKind::CelebA);
        assert_eq!(settings.dataset.split, "valid");
        assert_eq!(settings.dataset.target_types, vec!["attr".to_string()]);
        assert_eq!(settings.training.batch_size, 64);
        assert_eq!(settings.training.lr_ratio, 2.0);
        assert_eq!(settings.training.sample_source, SampleSource::Batch);
        // untouched keys keep their defaults
        assert_eq!(settings.training.nz, 100);
        assert_eq!(settings.run_dir(), PathBuf::from("./runs/celeba_valid"));
    }

    #[test]
    fn test_default_run_dir_names_mnist_parameters() {
        let mut settings = Settings::default();
        settings.dataset.dataset_size = 500;
        settings.dataset.noise_level = 0.25;
        assert_eq!(
            settings.run_dir(),
            PathBuf::from("./pretrain/dataset_size=500,noise_level=0.25")
        );
        settings.output.logdir = Some(PathBuf::from("/tmp/run"));
        assert_eq!(settings.run_dir(), PathBuf::from("/tmp/run"));
    }

    #[test]
    fn test_training_config_takes_dataset_geometry() {
        let samples = vec![Sample {
            image: ImageData::filled(0.0, 1, 28, 28),
            condition: one_hot(3, 10),
        }];
        let dataset = InMemoryDataset::new(samples, 10).unwrap();
        let mut settings = Settings::default();
        settings.training.net_g = Some("netG.mpk".to_string());

        let config = settings.training_config(&dataset, 7);
        assert_eq!(config.model.num_classes, 10);
        assert_eq!(config.model.image_size, 28);
        assert_eq!(config.seed, 7);
        assert_eq!(config.net_g.as_deref(), Some("netG.mpk"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_settings_serialization() {
        let settings = Settings::default();
        let json = serde_json::to_string(&settings).expect("Should serialize to JSON");
        assert!(json.contains("noisy_mnist"));
        assert!(json.contains("save_frequency"));

        let deserialized: Settings = serde_json::from_str(&json).expect("Should deserialize from JSON");
        assert_eq!(deserialized.training.lr, settings.training.lr);
        assert_eq!(deserialized.dataset.kind, settings.dataset.kind);
    }
}
