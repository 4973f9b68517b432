//! Conditional GAN: datasets, networks, adversarial training and run outputs.

pub mod architectures;
pub mod data;
pub mod loss_utils;
pub mod metrics;
pub mod settings;
pub mod sink;
pub mod train;

pub use architectures::{Discriminator, Generator, ModelConfig};
pub use settings::{DatasetKind, Settings};
pub use train::{train, RunState, SampleSource, Trainer, TrainingConfig, TrainingSummary};
