//! Image preprocessing: resize, centre crop, random flip, normalise.

use image::{imageops::FilterType, DynamicImage, GenericImageView};
use rand::{rngs::StdRng, Rng};

use super::ImageData;

/// Resize (shorter side) → centre crop → random horizontal flip → `[0,1]` →
/// per-channel `(x - mean) / std`.
#[derive(Debug, Clone)]
pub struct ImageTransform {
    pub size: u32,
    pub hflip_prob: f64,
    pub mean: f32,
    pub std: f32,
}

impl ImageTransform {
    /// The 64×64 RGB pipeline used for CelebA.
    pub fn celeba(size: u32) -> Self {
        Self {
            size,
            hflip_prob: 0.5,
            mean: 0.5,
            std: 0.5,
        }
    }

    /// Normalisation only, no geometry changes.
    pub fn normalize_only() -> Self {
        Self {
            size: 0,
            hflip_prob: 0.0,
            mean: 0.5,
            std: 0.5,
        }
    }

    /// Plain `[0, 1]` conversion.
    pub fn unit_range() -> Self {
        Self {
            size: 0,
            hflip_prob: 0.0,
            mean: 0.0,
            std: 1.0,
        }
    }

    pub fn apply(&self, img: DynamicImage, rng: &mut StdRng) -> ImageData {
        let mut img = if self.size > 0 {
            let resized = resize_shorter_side(img, self.size);
            center_crop(&resized, self.size)
        } else {
            img
        };

        if self.hflip_prob > 0.0 && rng.gen_bool(self.hflip_prob) {
            img = img.fliph();
        }

        to_normalized_chw(&img, self.mean, self.std)
    }
}

fn resize_shorter_side(img: DynamicImage, size: u32) -> DynamicImage {
    let (w, h) = img.dimensions();
    if w.min(h) == size {
        return img;
    }
    let (nw, nh) = if w <= h {
        (size, (size as u64 * h as u64 / w as u64) as u32)
    } else {
        ((size as u64 * w as u64 / h as u64) as u32, size)
    };
    img.resize_exact(nw, nh, FilterType::Triangle)
}

fn center_crop(img: &DynamicImage, size: u32) -> DynamicImage {
    let (w, h) = img.dimensions();
    let left = (w.saturating_sub(size) as f32 / 2.0).round() as u32;
    let top = (h.saturating_sub(size) as f32 / 2.0).round() as u32;
    img.crop_imm(left, top, size.min(w), size.min(h))
}

/// Convert to `[C, H, W]` floats; grayscale sources stay single-channel.
fn to_normalized_chw(img: &DynamicImage, mean: f32, std: f32) -> ImageData {
    let (w, h) = img.dimensions();
    let (w, h) = (w as usize, h as usize);
    match img {
        DynamicImage::ImageLuma8(gray) => {
            let pixels = gray
                .pixels()
                .map(|p| (p.0[0] as f32 / 255.0 - mean) / std)
                .collect();
            ImageData::new(pixels, 1, h, w)
        }
        other => {
            let rgb = other.to_rgb8();
            let mut pixels = vec![0.0f32; 3 * h * w];
            for (x, y, p) in rgb.enumerate_pixels() {
                let offset = y as usize * w + x as usize;
                for c in 0..3 {
                    pixels[c * h * w + offset] = (p.0[c] as f32 / 255.0 - mean) / std;
                }
            }
            ImageData::new(pixels, 3, h, w)
        }
    }
}
