//! MNIST subset with a fraction of labels randomised.

use std::fs;
use std::path::{Path, PathBuf};

use rand::{rngs::StdRng, seq::index::sample, Rng, SeedableRng};

use super::{one_hot, ImageData, LabeledImageDataset, Sample};
use crate::error::{CganError, Result};

pub const IMAGES_FILE: &str = "train-images-idx3-ubyte";
pub const LABELS_FILE: &str = "train-labels-idx1-ubyte";
pub const NUM_CLASSES: usize = 10;
pub const IMAGE_SIZE: usize = 28;

pub const IMAGES_MAGIC: u32 = 0x0000_0803;
pub const LABELS_MAGIC: u32 = 0x0000_0801;

#[derive(Debug, Clone)]
pub struct NoisyMnistDataset {
    images: Vec<u8>,
    labels: Vec<u8>,
    /// Labels after corruption; fixed for the lifetime of the dataset.
    noisy_labels: Vec<u8>,
    noise_level: f64,
}

impl NoisyMnistDataset {
    /// Keep the first `dataset_size` training images and randomise the labels of
    /// `round(noise_level * dataset_size)` of them, chosen with `seed`.
    pub fn new(dataset_size: usize, noise_level: f64, root: impl AsRef<Path>, seed: u64) -> Result<Self> {
        if !(0.0..=1.0).contains(&noise_level) {
            return Err(CganError::InvalidConfig(format!(
                "noise_level must be in [0, 1], got {}",
                noise_level
            )));
        }

        let root = resolve_root(root.as_ref());
        let (count, rows, cols, pixels) = read_idx_images(&root.join(IMAGES_FILE))?;
        if rows != IMAGE_SIZE || cols != IMAGE_SIZE {
            return Err(CganError::MalformedIdx {
                path: root.join(IMAGES_FILE),
                reason: format!("expected 28x28 images, found {}x{}", rows, cols),
            });
        }
        let labels = read_idx_labels(&root.join(LABELS_FILE))?;
        if labels.len() != count {
            return Err(CganError::MalformedIdx {
                path: root.join(LABELS_FILE),
                reason: format!("{} labels for {} images", labels.len(), count),
            });
        }

        let n = dataset_size.min(count);
        if n < dataset_size {
            log::warn!(
                "requested {} MNIST images but only {} are available",
                dataset_size,
                count
            );
        }

        Self::from_raw(
            pixels[..n * IMAGE_SIZE * IMAGE_SIZE].to_vec(),
            labels[..n].to_vec(),
            noise_level,
            seed,
        )
    }

    /// Build from raw 28×28 `u8` images and labels.
    pub fn from_raw(images: Vec<u8>, labels: Vec<u8>, noise_level: f64, seed: u64) -> Result<Self> {
        if labels.is_empty() {
            return Err(CganError::EmptyDataset);
        }
        if images.len() != labels.len() * IMAGE_SIZE * IMAGE_SIZE {
            return Err(CganError::InvalidConfig(format!(
                "{} pixel bytes do not match {} labels",
                images.len(),
                labels.len()
            )));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let num_noisy = (noise_level * labels.len() as f64).round() as usize;
        let mut noisy_labels = labels.clone();
        let picked = sample(&mut rng, labels.len(), num_noisy.min(labels.len()));
        for idx in picked.into_iter() {
            noisy_labels[idx] = rng.gen_range(0..NUM_CLASSES as u8);
        }

        log::info!(
            "NoisyMNIST: {} images, {} labels randomised (noise_level={})",
            labels.len(),
            num_noisy,
            noise_level
        );

        Ok(Self {
            images,
            labels,
            noisy_labels,
            noise_level,
        })
    }

    pub fn noise_level(&self) -> f64 {
        self.noise_level
    }

    /// Label actually served for `index`.
    pub fn label(&self, index: usize) -> usize {
        self.noisy_labels[index] as usize
    }

    pub fn clean_label(&self, index: usize) -> usize {
        self.labels[index] as usize
    }
}

impl LabeledImageDataset for NoisyMnistDataset {
    fn len(&self) -> usize {
        self.noisy_labels.len()
    }

    fn num_classes(&self) -> usize {
        NUM_CLASSES
    }

    fn num_channels(&self) -> usize {
        1
    }

    fn image_size(&self) -> usize {
        IMAGE_SIZE
    }

    fn get(&self, index: usize, _rng: &mut StdRng) -> Result<Sample> {
        if index >= self.len() {
            return Err(CganError::InvalidConfig(format!("index {} out of range", index)));
        }
        let area = IMAGE_SIZE * IMAGE_SIZE;
        let pixels = self.images[index * area..(index + 1) * area]
            .iter()
            .map(|&p| (p as f32 / 255.0 - 0.5) / 0.5)
            .collect();
        Ok(Sample {
            image: ImageData::new(pixels, 1, IMAGE_SIZE, IMAGE_SIZE),
            condition: one_hot(self.label(index), NUM_CLASSES),
        })
    }
}

/// Accept both `<root>` and the torchvision layout `<root>/MNIST/raw`.
fn resolve_root(root: &Path) -> PathBuf {
    let raw = root.join("MNIST").join("raw");
    if raw.join(IMAGES_FILE).exists() {
        raw
    } else {
        root.to_path_buf()
    }
}

fn read_u32(bytes: &[u8], offset: usize, path: &Path) -> Result<u32> {
    bytes
        .get(offset..offset + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| CganError::MalformedIdx {
            path: path.to_path_buf(),
            reason: "truncated header".to_string(),
        })
}

fn read_idx_images(path: &Path) -> Result<(usize, usize, usize, Vec<u8>)> {
    let bytes = fs::read(path)?;
    if read_u32(&bytes, 0, path)? != IMAGES_MAGIC {
        return Err(CganError::MalformedIdx {
            path: path.to_path_buf(),
            reason: "bad magic number for an image file".to_string(),
        });
    }
    let count = read_u32(&bytes, 4, path)? as usize;
    let rows = read_u32(&bytes, 8, path)? as usize;
    let cols = read_u32(&bytes, 12, path)? as usize;
    let body = &bytes[16..];
    if body.len() < count * rows * cols {
        return Err(CganError::MalformedIdx {
            path: path.to_path_buf(),
            reason: format!("expected {} pixel bytes, found {}", count * rows * cols, body.len()),
        });
    }
    Ok((count, rows, cols, body[..count * rows * cols].to_vec()))
}

fn read_idx_labels(path: &Path) -> Result<Vec<u8>> {
    let bytes = fs::read(path)?;
    if read_u32(&bytes, 0, path)? != LABELS_MAGIC {
        return Err(CganError::MalformedIdx {
            path: path.to_path_buf(),
            reason: "bad magic number for a label file".to_string(),
        });
    }
    let count = read_u32(&bytes, 4, path)? as usize;
    let body = &bytes[8..];
    if body.len() < count {
        return Err(CganError::MalformedIdx {
            path: path.to_path_buf(),
            reason: format!("expected {} labels, found {}", count, body.len()),
        });
    }
    Ok(body[..count].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_idx(dir: &Path, n: usize) {
        let mut images = Vec::new();
        images.extend_from_slice(&IMAGES_MAGIC.to_be_bytes());
        images.extend_from_slice(&(n as u32).to_be_bytes());
        images.extend_from_slice(&(IMAGE_SIZE as u32).to_be_bytes());
        images.extend_from_slice(&(IMAGE_SIZE as u32).to_be_bytes());
        for i in 0..n {
            images.extend(std::iter::repeat((i * 20) as u8).take(IMAGE_SIZE * IMAGE_SIZE));
        }
        fs::write(dir.join(IMAGES_FILE), images).unwrap();

        let mut labels = Vec::new();
        labels.extend_from_slice(&LABELS_MAGIC.to_be_bytes());
        labels.extend_from_slice(&(n as u32).to_be_bytes());
        labels.extend((0..n).map(|i| (i % NUM_CLASSES) as u8));
        fs::write(dir.join(LABELS_FILE), labels).unwrap();
    }

    #[test]
    fn test_reads_idx_subset() {
        let dir = tempfile::tempdir().unwrap();
        write_idx(dir.path(), 12);

        let ds = NoisyMnistDataset::new(5, 0.0, dir.path(), 1).unwrap();
        assert_eq!(ds.len(), 5);
        let mut rng = StdRng::seed_from_u64(0);
        let s = ds.get(3, &mut rng).unwrap();
        assert_eq!(s.image.shape(), [1, 28, 28]);
        assert_eq!(s.condition, one_hot(3, 10));
        assert!((s.image.pixels[0] - ((60.0 / 255.0 - 0.5) / 0.5)).abs() < 1e-6);
    }

    #[test]
    fn test_torchvision_layout_is_found() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("MNIST").join("raw");
        fs::create_dir_all(&raw).unwrap();
        write_idx(&raw, 3);
        assert_eq!(NoisyMnistDataset::new(10, 0.0, dir.path(), 0).unwrap().len(), 3);
    }

    #[test]
    fn test_noise_is_seeded_and_fixed() {
        let images = vec![0u8; 200 * IMAGE_SIZE * IMAGE_SIZE];
        let labels: Vec<u8> = (0..200).map(|i| (i % 10) as u8).collect();

        let a = NoisyMnistDataset::from_raw(images.clone(), labels.clone(), 0.5, 7).unwrap();
        let b = NoisyMnistDataset::from_raw(images, labels, 0.5, 7).unwrap();
        let labels_a: Vec<usize> = (0..200).map(|i| a.label(i)).collect();
        let labels_b: Vec<usize> = (0..200).map(|i| b.label(i)).collect();
        assert_eq!(labels_a, labels_b);

        // uniform redraws keep ~10% of corrupted labels unchanged
        let changed = (0..200).filter(|&i| a.label(i) != a.clean_label(i)).count();
        assert!(changed > 50 && changed <= 100, "changed = {}", changed);
    }

    #[test]
    fn test_zero_noise_keeps_labels() {
        let images = vec![0u8; 20 * IMAGE_SIZE * IMAGE_SIZE];
        let labels: Vec<u8> = (0..20).map(|i| (i % 10) as u8).collect();
        let ds = NoisyMnistDataset::from_raw(images, labels, 0.0, 3).unwrap();
        assert!((0..20).all(|i| ds.label(i) == ds.clean_label(i)));
    }

    #[test]
    fn test_rejects_bad_magic() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(IMAGES_FILE), [0u8; 16]).unwrap();
        assert!(matches!(
            NoisyMnistDataset::new(1, 0.0, dir.path(), 0),
            Err(CganError::MalformedIdx { .. })
        ));
    }
}
