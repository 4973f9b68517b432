//! Scalar logging, sample grids and checkpoints.

pub mod checkpoint;
pub mod grid;

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use checkpoint::{load_discriminator, load_generator, save_checkpoints, CheckpointPaths};
pub use grid::{make_grid, save_grid, GRID_NROW, GRID_PADDING};

pub const LOSS_D: &str = "Loss/D";
pub const LOSS_G: &str = "Loss/G";
pub const PROB_REAL: &str = "Probability/D(x)";
pub const PROB_FAKE_BEFORE: &str = "Probability/D(G(z_1))";
pub const PROB_FAKE_AFTER: &str = "Probability/D(G(z_2))";
pub const METRIC_IS: &str = "Metric/IS";
pub const METRIC_FID: &str = "Metric/FID";
pub const METRIC_KID: &str = "Metric/KID";

/// One `(tag, value, step)` record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarRecord {
    pub tag: String,
    pub value: f32,
    pub step: usize,
    /// Seconds since the Unix epoch.
    pub wall_time: f64,
}

/// Append-only destination for training scalars.
pub trait ScalarSink {
    fn add_scalar(&mut self, tag: &str, value: f32, step: usize) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

fn wall_time() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Writes one JSON object per line to `<dir>/scalars.jsonl`.
pub struct JsonlScalarSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl JsonlScalarSink {
    pub const FILE_NAME: &'static str = "scalars.jsonl";

    pub fn create(dir: impl AsRef<Path>) -> Result<Self> {
        fs::create_dir_all(dir.as_ref())?;
        let path = dir.as_ref().join(Self::FILE_NAME);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record back from a scalar log.
    pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<ScalarRecord>> {
        let text = fs::read_to_string(path)?;
        text.lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).map_err(Into::into))
            .collect()
    }
}

impl ScalarSink for JsonlScalarSink {
    fn add_scalar(&mut self, tag: &str, value: f32, step: usize) -> Result<()> {
        let record = ScalarRecord {
            tag: tag.to_string(),
            value,
            step,
            wall_time: wall_time(),
        };
        serde_json::to_writer(&mut self.writer, &record)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

impl Drop for JsonlScalarSink {
    fn drop(&mut self) {
        if let Err(e) = self.writer.flush() {
            log::warn!("failed to flush {}: {}", self.path.display(), e);
        }
    }
}

/// Keeps records in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryScalarSink {
    pub records: Vec<ScalarRecord>,
}

impl MemoryScalarSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn values(&self, tag: &str) -> Vec<f32> {
        self.records
            .iter()
            .filter(|r| r.tag == tag)
            .map(|r| r.value)
            .collect()
    }
}

impl ScalarSink for MemoryScalarSink {
    fn add_scalar(&mut self, tag: &str, value: f32, step: usize) -> Result<()> {
        self.records.push(ScalarRecord {
            tag: tag.to_string(),
            value,
            step,
            wall_time: wall_time(),
        });
        Ok(())
    }
}

/// `<run>/iteration<N>`, the directory of one save event.
pub fn iteration_dir(run_dir: &Path, iteration: usize) -> PathBuf {
    run_dir.join(format!("iteration{}", iteration))
}
