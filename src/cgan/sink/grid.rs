//! Sample grids in the layout of torchvision's `make_grid`.

use std::fs;
use std::path::Path;

use burn::tensor::{backend::Backend, Tensor};
use image::{Rgb, RgbImage};

use crate::error::{CganError, Result};

pub const GRID_NROW: usize = 10;
pub const GRID_PADDING: usize = 2;

/// Tile `[B, C, H, W]` images (C = 1 or 3) into one RGB image, `nrow` per row,
/// with `padding` black pixels around each tile. Values are min-max scaled over
/// the whole batch.
pub fn make_grid<B: Backend>(images: Tensor<B, 4>, nrow: usize, padding: usize) -> Result<RgbImage> {
    let [b, c, h, w] = images.dims();
    if b == 0 || !(c == 1 || c == 3) {
        return Err(CganError::InvalidConfig(format!(
            "cannot tile a batch of shape {:?}",
            [b, c, h, w]
        )));
    }
    let values: Vec<f32> = images
        .into_data()
        .convert::<f32>()
        .to_vec()
        .map_err(|e| CganError::InvalidConfig(format!("unreadable sample batch: {:?}", e)))?;

    let (lo, hi) = values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let scale = 1.0 / (hi - lo).max(1e-5);

    let xmaps = nrow.min(b).max(1);
    let ymaps = b.div_ceil(xmaps);
    let cell_h = h + padding;
    let cell_w = w + padding;
    let mut grid = RgbImage::new(
        (xmaps * cell_w + padding) as u32,
        (ymaps * cell_h + padding) as u32,
    );

    let area = h * w;
    for k in 0..b {
        let (gy, gx) = (k / xmaps, k % xmaps);
        let offset = k * c * area;
        for y in 0..h {
            for x in 0..w {
                let mut rgb = [0u8; 3];
                for (ch, out) in rgb.iter_mut().enumerate() {
                    let src = if c == 1 { 0 } else { ch };
                    let v = (values[offset + src * area + y * w + x] - lo) * scale;
                    *out = (v * 255.0 + 0.5).clamp(0.0, 255.0) as u8;
                }
                grid.put_pixel(
                    (gx * cell_w + padding + x) as u32,
                    (gy * cell_h + padding + y) as u32,
                    Rgb(rgb),
                );
            }
        }
    }
    Ok(grid)
}

/// Render and write a PNG grid, creating parent directories.
pub fn save_grid<B: Backend>(images: Tensor<B, 4>, path: &Path) -> Result<()> {
    let grid = make_grid(images, GRID_NROW, GRID_PADDING)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    grid.save(path)?;
    log::debug!("wrote sample grid {}", path.display());
    Ok(())
}
