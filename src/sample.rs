//! Sample image grids written during training.

use std::fs;
use std::path::{Path, PathBuf};

use burn::prelude::*;
use image::{ImageFormat, Rgb, RgbImage};

use crate::error::SampleError;

/// Black border between and around grid cells, in pixels.
const GRID_PADDING: u32 = 2;

/// Map a value in `[-1, 1]` to a byte, clamping out-of-range values.
pub fn denormalize(value: f32) -> u8 {
    let unit = ((value + 1.0) / 2.0).clamp(0.0, 1.0);
    (unit * 255.0 + 0.5).clamp(0.0, 255.0) as u8
}

/// Lay an image batch `[N, C, H, W]` with values in `[-1, 1]` out as a grid
/// of `ceil(sqrt(N))` columns.
pub fn image_grid<B: Backend>(images: Tensor<B, 4>) -> Result<RgbImage, SampleError> {
    let [count, channels, height, width] = images.dims();
    if count == 0 {
        return Err(SampleError::EmptyBatch);
    }
    if channels != 1 && channels != 3 {
        return Err(SampleError::UnsupportedChannels(channels));
    }

    let values: Vec<f32> = images
        .into_data()
        .convert::<f32>()
        .to_vec()
        .map_err(|e| SampleError::TensorData(format!("{e:?}")))?;

    let columns = (count as f64).sqrt().ceil() as usize;
    let rows = count.div_ceil(columns);
    let (cell_w, cell_h) = (width as u32 + GRID_PADDING, height as u32 + GRID_PADDING);
    let mut grid = RgbImage::new(
        columns as u32 * cell_w + GRID_PADDING,
        rows as u32 * cell_h + GRID_PADDING,
    );

    let plane = height * width;
    for index in 0..count {
        let origin_x = (index % columns) as u32 * cell_w + GRID_PADDING;
        let origin_y = (index / columns) as u32 * cell_h + GRID_PADDING;
        let sample = &values[index * channels * plane..(index + 1) * channels * plane];

        for y in 0..height {
            for x in 0..width {
                let offset = y * width + x;
                let pixel = if channels == 1 {
                    let v = denormalize(sample[offset]);
                    [v, v, v]
                } else {
                    [
                        denormalize(sample[offset]),
                        denormalize(sample[plane + offset]),
                        denormalize(sample[2 * plane + offset]),
                    ]
                };
                grid.put_pixel(origin_x + x as u32, origin_y + y as u32, Rgb(pixel));
            }
        }
    }

    Ok(grid)
}

/// Write an image batch as a PNG grid, creating parent directories.
pub fn save_image_grid<B: Backend>(images: Tensor<B, 4>, path: &Path) -> Result<(), SampleError> {
    let grid = image_grid(images)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    grid.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Writes `real_images/<epoch>.png` and `fake_images/<epoch>.png` under a
/// sample directory.
#[derive(Debug, Clone)]
pub struct SampleWriter {
    dir: PathBuf,
}

impl SampleWriter {
    pub fn new(dir: PathBuf) -> Self {
        SampleWriter { dir }
    }

    pub fn real_path(&self, epoch: usize) -> PathBuf {
        self.dir.join("real_images").join(format!("{epoch}.png"))
    }

    pub fn fake_path(&self, epoch: usize) -> PathBuf {
        self.dir.join("fake_images").join(format!("{epoch}.png"))
    }

    pub fn write_real<B: Backend>(
        &self,
        epoch: usize,
        images: Tensor<B, 4>,
    ) -> Result<PathBuf, SampleError> {
        let path = self.real_path(epoch);
        save_image_grid(images, &path)?;
        Ok(path)
    }

    pub fn write_fake<B: Backend>(
        &self,
        epoch: usize,
        images: Tensor<B, 4>,
    ) -> Result<PathBuf, SampleError> {
        let path = self.fake_path(epoch);
        save_image_grid(images, &path)?;
        Ok(path)
    }
}
