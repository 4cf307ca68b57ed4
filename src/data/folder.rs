use std::path::{Path, PathBuf};

use burn::data::dataset::Dataset;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use walkdir::WalkDir;

use crate::data::batcher::{ImageItem, LoadedItem};
use crate::error::{DataError, ItemLoadError};

const SUPPORTED_FILES: [&str; 6] = ["png", "jpg", "jpeg", "bmp", "gif", "webp"];

/// Scale, crop and normalize a decoded image into an [`ImageItem`].
pub(crate) fn image_to_item(
    image: DynamicImage,
    size: usize,
    channels: usize,
) -> Result<ImageItem, DataError> {
    let side = size as u32;
    let resized = if image.width() == side && image.height() == side {
        image
    } else {
        image.resize_to_fill(side, side, FilterType::Triangle)
    };

    let plane = size * size;
    let mut pixels = vec![0.0f32; channels * plane];
    match channels {
        1 => {
            for (i, p) in resized.to_luma8().pixels().enumerate() {
                pixels[i] = normalize(p.0[0]);
            }
        }
        3 => {
            for (i, p) in resized.to_rgb8().pixels().enumerate() {
                for c in 0..3 {
                    pixels[c * plane + i] = normalize(p.0[c]);
                }
            }
        }
        other => return Err(DataError::UnsupportedChannels(other)),
    }

    Ok(ImageItem {
        pixels,
        channels,
        size,
    })
}

fn normalize(value: u8) -> f32 {
    value as f32 / 127.5 - 1.0
}

/// Every supported image file found recursively under a root directory.
///
/// Headers are checked when the dataset is built, so a file that cannot be
/// identified fails early. A file whose pixel data turns out to be unreadable
/// is yielded as an `Err` item and stops training when its batch arrives.
#[derive(Debug, Clone)]
pub struct ImageFolderDataset {
    paths: Vec<PathBuf>,
    size: usize,
    channels: usize,
}

impl ImageFolderDataset {
    pub fn new(root: &Path, size: usize, channels: usize) -> Result<Self, DataError> {
        if channels != 1 && channels != 3 {
            return Err(DataError::UnsupportedChannels(channels));
        }
        if !root.is_dir() {
            return Err(DataError::RootNotFound(root.to_path_buf()));
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(root).follow_links(true) {
            let entry = entry.map_err(|e| DataError::Walk {
                path: root.to_path_buf(),
                source: e,
            })?;
            if !entry.file_type().is_file() || !is_supported(entry.path()) {
                continue;
            }
            check_header(entry.path())?;
            paths.push(entry.into_path());
        }

        if paths.is_empty() {
            return Err(DataError::NoImages(root.to_path_buf()));
        }
        paths.sort();

        tracing::info!(root = %root.display(), images = paths.len(), "image folder dataset");
        Ok(ImageFolderDataset {
            paths,
            size,
            channels,
        })
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn load(&self, index: usize) -> Result<ImageItem, DataError> {
        let path = &self.paths[index];
        let image = image::open(path).map_err(|e| DataError::ImageRead {
            path: path.clone(),
            source: e,
        })?;
        image_to_item(image, self.size, self.channels)
    }
}

impl Dataset<LoadedItem> for ImageFolderDataset {
    fn get(&self, index: usize) -> Option<LoadedItem> {
        let path = self.paths.get(index)?;
        Some(
            self.load(index)
                .map_err(|e| ItemLoadError::new(path.display().to_string(), e)),
        )
    }

    fn len(&self) -> usize {
        self.paths.len()
    }
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_FILES.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn check_header(path: &Path) -> Result<(), DataError> {
    let read_error = |source| DataError::ImageRead {
        path: path.to_path_buf(),
        source,
    };
    ImageReader::open(path)
        .map_err(|e| read_error(image::ImageError::IoError(e)))?
        .with_guessed_format()
        .map_err(|e| read_error(image::ImageError::IoError(e)))?
        .into_dimensions()
        .map_err(read_error)?;
    Ok(())
}
