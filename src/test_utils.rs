// Test utilities for fixture datasets and tensor construction
//
// Shared by unit tests, integration tests and benches. Everything here writes
// into caller-provided directories (normally a `tempfile::TempDir`).

use std::fs;
use std::io;
use std::path::Path;

use burn::tensor::{backend::Backend, Tensor, TensorData};
use image::{Rgb, RgbImage};

use crate::cgan::architectures::ModelConfig;
use crate::cgan::data::{celeba, noisy_mnist, one_hot, ImageData, InMemoryDataset, Sample};
use crate::error::Result;

/// Create f32 tensor from data slice with specified shape
pub fn tensor_from_f32_vec<B: Backend, const D: usize>(
    data: &[f32],
    shape: [usize; D],
    device: &B::Device,
) -> Tensor<B, D> {
    let expected_size: usize = shape.iter().product();
    assert_eq!(
        data.len(),
        expected_size,
        "Data length {} doesn't match shape {:?}",
        data.len(),
        shape
    );
    Tensor::from_data(TensorData::new(data.to_vec(), shape), device)
}

/// Small networks that still exercise every layer type: 8×8 images are one
/// stride-2 doubling of a 4×4 base.
pub fn tiny_model_config(num_classes: usize, num_channels: usize) -> ModelConfig {
    ModelConfig::new(num_classes, num_channels, 8)
        .with_nz(4)
        .with_ngf(4)
        .with_ndf(4)
}

/// `n` constant `channels×size×size` images, with labels cycling through
/// `num_classes` one-hot conditions.
pub fn one_hot_dataset(n: usize, num_classes: usize, channels: usize, size: usize) -> Result<InMemoryDataset> {
    let samples = (0..n)
        .map(|i| Sample {
            image: ImageData::filled(((i % 3) as f32 - 1.0) * 0.5, channels, size, size),
            condition: one_hot(i % num_classes, num_classes),
        })
        .collect();
    InMemoryDataset::new(samples, num_classes)
}

/// One row of a CelebA fixture.
#[derive(Debug, Clone)]
pub struct CelebaRow {
    pub image_id: String,
    pub partition: u8,
    /// Raw `{-1, 1}` attribute values, 40 of them.
    pub attrs: Vec<i8>,
}

impl CelebaRow {
    /// Attribute `k` set, all others cleared.
    pub fn with_attr(index: usize, partition: u8, k: usize) -> Self {
        let attrs = (0..celeba::NUM_ATTRIBUTES)
            .map(|j| if j == k { 1 } else { -1 })
            .collect();
        Self {
            image_id: format!("{:06}.jpg", index + 1),
            partition,
            attrs,
        }
    }
}

/// Write the four metadata CSVs and one small RGB image per row under `root`,
/// in the `img_align_celeba/img_align_celeba/` layout.
pub fn write_celeba_fixture(root: &Path, rows: &[CelebaRow], image_size: (u32, u32)) -> io::Result<()> {
    let image_dir = root.join("img_align_celeba").join("img_align_celeba");
    fs::create_dir_all(&image_dir)?;

    let mut partition = String::from("image_id,partition\n");
    let mut attr = String::from("image_id");
    for k in 0..celeba::NUM_ATTRIBUTES {
        attr.push_str(&format!(",Attr_{}", k));
    }
    attr.push('\n');
    let mut bbox = String::from("image_id,x_1,y_1,width,height\n");
    let mut landmarks = String::from(
        "image_id,lefteye_x,lefteye_y,righteye_x,righteye_y,nose_x,nose_y,leftmouth_x,leftmouth_y,rightmouth_x,rightmouth_y\n",
    );

    for (i, row) in rows.iter().enumerate() {
        partition.push_str(&format!("{},{}\n", row.image_id, row.partition));

        attr.push_str(&row.image_id);
        for v in &row.attrs {
            attr.push_str(&format!(",{}", v));
        }
        attr.push('\n');

        bbox.push_str(&format!("{},{},{},{},{}\n", row.image_id, i, i + 1, 10, 12));
        landmarks.push_str(&row.image_id);
        for k in 0..10 {
            landmarks.push_str(&format!(",{}", i * 10 + k));
        }
        landmarks.push('\n');

        let shade = (40 * (i % 6)) as u8;
        let img = RgbImage::from_fn(image_size.0, image_size.1, |x, _| Rgb([shade, x as u8, 255 - shade]));
        img.save(image_dir.join(&row.image_id)).map_err(io::Error::other)?;
    }

    fs::write(root.join(celeba::PARTITION_FILE), partition)?;
    fs::write(root.join(celeba::ATTR_FILE), attr)?;
    fs::write(root.join(celeba::BBOX_FILE), bbox)?;
    fs::write(root.join(celeba::LANDMARKS_FILE), landmarks)?;
    Ok(())
}

/// Write `n` flat 28×28 MNIST images with labels `i % 10` in IDX format under
/// `root`. Image `i` has every pixel set to `(i * 20) % 256`.
pub fn write_mnist_fixture(root: &Path, n: usize) -> io::Result<()> {
    fs::create_dir_all(root)?;
    let side = noisy_mnist::IMAGE_SIZE as u32;

    let mut images = Vec::with_capacity(16 + n * (side * side) as usize);
    images.extend_from_slice(&noisy_mnist::IMAGES_MAGIC.to_be_bytes());
    images.extend_from_slice(&(n as u32).to_be_bytes());
    images.extend_from_slice(&side.to_be_bytes());
    images.extend_from_slice(&side.to_be_bytes());
    for i in 0..n {
        images.extend(std::iter::repeat(((i * 20) % 256) as u8).take((side * side) as usize));
    }
    fs::write(root.join(noisy_mnist::IMAGES_FILE), images)?;

    let mut labels = Vec::with_capacity(8 + n);
    labels.extend_from_slice(&noisy_mnist::LABELS_MAGIC.to_be_bytes());
    labels.extend_from_slice(&(n as u32).to_be_bytes());
    labels.extend((0..n).map(|i| (i % noisy_mnist::NUM_CLASSES) as u8));
    fs::write(root.join(noisy_mnist::LABELS_FILE), labels)
}
