//! Error type shared by the dataset, trainer and sink layers.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CganError {
    /// A target type string did not name one of `attr`, `bbox`, `landmarks`.
    #[error("Target type {0} is not recognized")]
    UnrecognizedTargetType(String),

    #[error("target_transform is specified but target_type is empty")]
    TargetTransformWithoutTargets,

    #[error("Unknown value '{0}' for argument split. Valid values are {{train, valid, test, all}}")]
    UnrecognizedSplit(String),

    #[error("expected {expected} attribute columns, found {found}")]
    UnexpectedAttributeCount { expected: usize, found: usize },

    /// Image sizes must factor as `s0 * 2^n` with `1 <= s0 <= 7` and `n >= 1`.
    #[error("image size {0} cannot be reached by stride-2 up-sampling from a base of at most 7")]
    InvalidImageSize(usize),

    #[error("metadata file {file} has no row for image {image_id}")]
    MissingMetadataRow { file: String, image_id: String },

    #[error("malformed IDX file {path:?}: {reason}")]
    MalformedIdx { path: PathBuf, reason: String },

    #[error("dataset is empty")]
    EmptyDataset,

    #[error("sample {index} has shape {found:?}, batch expects {expected:?}")]
    BatchShapeMismatch {
        index: usize,
        expected: [usize; 4],
        found: [usize; 4],
    },

    #[error("batch images are {found:?} (C, H, W), model expects {expected:?}")]
    ModelShapeMismatch {
        expected: [usize; 3],
        found: [usize; 3],
    },

    #[error("sample {index} has a condition of length {found}, dataset declares {expected} classes")]
    ConditionLengthMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("{tag} loss is not finite ({value}) at iteration {iteration}")]
    NonFiniteLoss {
        tag: &'static str,
        value: f32,
        iteration: usize,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("recorder error: {0}")]
    Recorder(#[from] burn::record::RecorderError),
}

pub type Result<T> = std::result::Result<T, CganError>;
