//! CelebA attribute dataset read from the Kaggle CSV layout.
//!
//! ```text
//! <root>/list_eval_partition.csv           image_id,partition
//! <root>/list_attr_celeba.csv              image_id,<40 attributes in {-1,1}>
//! <root>/list_bbox_celeba.csv              image_id,x_1,y_1,width,height
//! <root>/list_landmarks_align_celeba.csv   image_id,<10 coordinates>
//! <root>/img_align_celeba/img_align_celeba/<image_id>
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rand::rngs::StdRng;

use super::{ImageData, ImageTransform, LabeledImageDataset, Sample};
use crate::error::{CganError, Result};

pub const PARTITION_FILE: &str = "list_eval_partition.csv";
pub const ATTR_FILE: &str = "list_attr_celeba.csv";
pub const BBOX_FILE: &str = "list_bbox_celeba.csv";
pub const LANDMARKS_FILE: &str = "list_landmarks_align_celeba.csv";
pub const NUM_ATTRIBUTES: usize = 40;
pub const IMAGE_SIZE: usize = 64;

/// Dataset partition. `All` keeps every metadata row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Split {
    Train,
    Valid,
    Test,
    All,
}

impl Split {
    /// Partition index stored in `list_eval_partition.csv`.
    pub fn partition_index(self) -> Option<i64> {
        match self {
            Split::Train => Some(0),
            Split::Valid => Some(1),
            Split::Test => Some(2),
            Split::All => None,
        }
    }
}

impl FromStr for Split {
    type Err = CganError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "train" => Ok(Split::Train),
            "valid" => Ok(Split::Valid),
            "test" => Ok(Split::Test),
            "all" => Ok(Split::All),
            _ => Err(CganError::UnrecognizedSplit(s.to_string())),
        }
    }
}

/// Which metadata table feeds the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetType {
    Attr,
    BBox,
    Landmarks,
}

impl FromStr for TargetType {
    type Err = CganError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "attr" => Ok(TargetType::Attr),
            "bbox" => Ok(TargetType::BBox),
            "landmarks" => Ok(TargetType::Landmarks),
            other => Err(CganError::UnrecognizedTargetType(other.to_string())),
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TargetType::Attr => "attr",
            TargetType::BBox => "bbox",
            TargetType::Landmarks => "landmarks",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetPart {
    pub kind: TargetType,
    pub values: Vec<f32>,
}

/// One part per requested target type, in request order.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub parts: Vec<TargetPart>,
}

impl Target {
    /// Concatenation of every part's values.
    pub fn flatten(&self) -> Vec<f32> {
        self.parts.iter().flat_map(|p| p.values.iter().copied()).collect()
    }
}

pub type TargetTransform = Box<dyn Fn(Target) -> Target + Send + Sync>;

pub struct CelebADataset {
    root: PathBuf,
    split: Split,
    target_types: Vec<TargetType>,
    transform: Option<ImageTransform>,
    target_transform: Option<TargetTransform>,
    filenames: Vec<String>,
    attr: Vec<Vec<f32>>,
    bbox: Option<Vec<Vec<f32>>>,
    landmarks: Option<Vec<Vec<f32>>>,
    attr_names: Vec<String>,
}

impl fmt::Debug for CelebADataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CelebADataset")
            .field("root", &self.root)
            .field("split", &self.split)
            .field("target_types", &self.target_types)
            .field("len", &self.filenames.len())
            .finish()
    }
}

impl CelebADataset {
    /// Train split, attribute targets, 64×64 augmentation pipeline.
    pub fn with_defaults(root: impl AsRef<Path>) -> Result<Self> {
        Self::new(
            root,
            "train",
            &["attr"],
            Some(ImageTransform::celeba(IMAGE_SIZE as u32)),
            None,
        )
    }

    /// Target types and split are validated before any file is opened.
    pub fn new(
        root: impl AsRef<Path>,
        split: &str,
        target_types: &[&str],
        transform: Option<ImageTransform>,
        target_transform: Option<TargetTransform>,
    ) -> Result<Self> {
        let target_types = target_types
            .iter()
            .map(|t| t.parse::<TargetType>())
            .collect::<Result<Vec<_>>>()?;

        if target_types.is_empty() && target_transform.is_some() {
            return Err(CganError::TargetTransformWithoutTargets);
        }

        let split: Split = split.parse()?;
        let root = root.as_ref().to_path_buf();

        let partitions = read_partitions(&root.join(PARTITION_FILE))?;
        let filenames: Vec<String> = partitions
            .into_iter()
            .filter(|(_, p)| split.partition_index().map_or(true, |want| *p == want))
            .map(|(name, _)| name)
            .collect();

        let (attr_names, attr_rows) = read_table(&root.join(ATTR_FILE))?;
        if attr_names.len() != NUM_ATTRIBUTES {
            return Err(CganError::UnexpectedAttributeCount {
                expected: NUM_ATTRIBUTES,
                found: attr_names.len(),
            });
        }
        // {-1, 1} -> {0, 1}
        let attr = select_rows(&filenames, &attr_rows, ATTR_FILE)?
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|v| (v as i64 + 1).div_euclid(2) as f32)
                    .collect()
            })
            .collect();

        let bbox = if target_types.contains(&TargetType::BBox) {
            let (_, rows) = read_table(&root.join(BBOX_FILE))?;
            Some(select_rows(&filenames, &rows, BBOX_FILE)?)
        } else {
            None
        };

        let landmarks = if target_types.contains(&TargetType::Landmarks) {
            let (_, rows) = read_table(&root.join(LANDMARKS_FILE))?;
            Some(select_rows(&filenames, &rows, LANDMARKS_FILE)?)
        } else {
            None
        };

        log::info!(
            "CelebA {:?}: {} images, targets {:?}",
            split,
            filenames.len(),
            target_types
        );

        Ok(Self {
            root,
            split,
            target_types,
            transform,
            target_transform,
            filenames,
            attr,
            bbox,
            landmarks,
            attr_names,
        })
    }

    pub fn split(&self) -> Split {
        self.split
    }

    pub fn filenames(&self) -> &[String] {
        &self.filenames
    }

    pub fn attr_names(&self) -> &[String] {
        &self.attr_names
    }

    fn image_path(&self, index: usize) -> PathBuf {
        self.root
            .join("img_align_celeba")
            .join("img_align_celeba")
            .join(&self.filenames[index])
    }

    /// Target for `index` without touching the image file. `None` past the end.
    pub fn target(&self, index: usize) -> Option<Target> {
        if self.target_types.is_empty() || index >= self.filenames.len() {
            return None;
        }

        let parts = self
            .target_types
            .iter()
            .map(|&kind| {
                let values = match kind {
                    TargetType::Attr => self.attr[index].clone(),
                    // tables are loaded whenever their type is requested
                    TargetType::BBox => self.bbox.as_ref().map(|t| t[index].clone()).unwrap_or_default(),
                    TargetType::Landmarks => self
                        .landmarks
                        .as_ref()
                        .map(|t| t[index].clone())
                        .unwrap_or_default(),
                };
                TargetPart { kind, values }
            })
            .collect();

        let target = Target { parts };
        Some(match &self.target_transform {
            Some(f) => f(target),
            None => target,
        })
    }

    /// Decoded (optionally transformed) image and its target.
    pub fn get_item(&self, index: usize, rng: &mut StdRng) -> Result<(ImageData, Option<Target>)> {
        if index >= self.filenames.len() {
            return Err(CganError::InvalidConfig(format!("index {} out of range", index)));
        }
        let img = image::open(self.image_path(index))?;
        let image = match &self.transform {
            Some(t) => t.apply(img, rng),
            None => ImageTransform::unit_range().apply(img, rng),
        };
        log::debug!("loaded {}", self.filenames[index]);
        Ok((image, self.target(index)))
    }
}

impl LabeledImageDataset for CelebADataset {
    fn len(&self) -> usize {
        self.filenames.len()
    }

    fn num_classes(&self) -> usize {
        self.attr_names.len()
    }

    fn num_channels(&self) -> usize {
        3
    }

    fn image_size(&self) -> usize {
        IMAGE_SIZE
    }

    fn get(&self, index: usize, rng: &mut StdRng) -> Result<Sample> {
        let (image, target) = self.get_item(index, rng)?;
        Ok(Sample {
            image,
            condition: target.map(|t| t.flatten()).unwrap_or_default(),
        })
    }
}

fn read_partitions(path: &Path) -> Result<Vec<(String, i64)>> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let name = record.get(0).unwrap_or_default().trim().to_string();
        let partition = record
            .get(1)
            .and_then(|v| v.trim().parse::<i64>().ok())
            .ok_or_else(|| CganError::InvalidConfig(format!("bad partition row for {}", name)))?;
        rows.push((name, partition));
    }
    Ok(rows)
}

/// Header columns (minus the index column) and numeric rows keyed by image id.
fn read_table(path: &Path) -> Result<(Vec<String>, HashMap<String, Vec<f32>>)> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .skip(1)
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = HashMap::new();
    for record in reader.records() {
        let record = record?;
        let mut fields = record.iter();
        let name = fields.next().unwrap_or_default().trim().to_string();
        let values = fields
            .map(|v| {
                v.trim().parse::<f32>().map_err(|_| {
                    CganError::InvalidConfig(format!("non-numeric value '{}' in {:?}", v, path))
                })
            })
            .collect::<Result<Vec<f32>>>()?;
        rows.insert(name, values);
    }
    Ok((columns, rows))
}

fn select_rows(
    filenames: &[String],
    table: &HashMap<String, Vec<f32>>,
    file: &str,
) -> Result<Vec<Vec<f32>>> {
    filenames
        .iter()
        .map(|name| {
            table.get(name).cloned().ok_or_else(|| CganError::MissingMetadataRow {
                file: file.to_string(),
                image_id: name.clone(),
            })
        })
        .collect()
}
