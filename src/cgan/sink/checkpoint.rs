//! Generator and discriminator snapshots.
//!
//! Files are written with burn's named MessagePack recorder at full precision
//! and overwritten in place when the same iteration is saved twice.

use std::fs;
use std::path::{Path, PathBuf};

use burn::{
    module::Module,
    record::{FullPrecisionSettings, NamedMpkFileRecorder},
    tensor::backend::Backend,
};

use crate::cgan::architectures::{Discriminator, Generator};
use crate::error::Result;

pub const GENERATOR_STEM: &str = "netG";
pub const DISCRIMINATOR_STEM: &str = "netD";

pub type CheckpointRecorder = NamedMpkFileRecorder<FullPrecisionSettings>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointPaths {
    pub generator: PathBuf,
    pub discriminator: PathBuf,
}

impl CheckpointPaths {
    /// Final file names inside `dir` (the recorder appends `.mpk`).
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            generator: dir.join(GENERATOR_STEM).with_extension("mpk"),
            discriminator: dir.join(DISCRIMINATOR_STEM).with_extension("mpk"),
        }
    }
}

pub fn save_checkpoints<B: Backend>(
    generator: &Generator<B>,
    discriminator: &Discriminator<B>,
    dir: &Path,
) -> Result<CheckpointPaths> {
    fs::create_dir_all(dir)?;
    let recorder = CheckpointRecorder::new();
    generator.clone().save_file(dir.join(GENERATOR_STEM), &recorder)?;
    discriminator.clone().save_file(dir.join(DISCRIMINATOR_STEM), &recorder)?;
    Ok(CheckpointPaths::in_dir(dir))
}

/// Load generator weights from `path` into `generator`.
pub fn load_generator<B: Backend>(generator: Generator<B>, path: &Path, device: &B::Device) -> Result<Generator<B>> {
    let loaded = generator.load_file(path.to_path_buf(), &CheckpointRecorder::new(), device)?;
    log::info!("loaded generator weights from {}", path.display());
    Ok(loaded)
}

pub fn load_discriminator<B: Backend>(
    discriminator: Discriminator<B>,
    path: &Path,
    device: &B::Device,
) -> Result<Discriminator<B>> {
    let loaded = discriminator.load_file(path.to_path_buf(), &CheckpointRecorder::new(), device)?;
    log::info!("loaded discriminator weights from {}", path.display());
    Ok(loaded)
}
