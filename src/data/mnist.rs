use burn::data::dataset::vision::{MnistDataset, MnistItem};
use burn::data::dataset::Dataset;
use image::{DynamicImage, GrayImage, Luma};

use crate::data::batcher::{ImageItem, LoadedItem};
use crate::data::folder::image_to_item;
use crate::error::{DataError, ItemLoadError};

/// Burn's MNIST training split, resized and replicated to the model's shape.
pub struct MnistImages {
    inner: MnistDataset,
    size: usize,
    channels: usize,
}

impl MnistImages {
    pub fn train(size: usize, channels: usize) -> Result<Self, DataError> {
        if channels != 1 && channels != 3 {
            return Err(DataError::UnsupportedChannels(channels));
        }
        let inner = MnistDataset::train();
        tracing::info!(images = inner.len(), "mnist training split");
        Ok(MnistImages {
            inner,
            size,
            channels,
        })
    }
}

/// Convert an MNIST digit (pixel values 0..=255) into an [`ImageItem`].
pub(crate) fn mnist_to_item(
    item: &MnistItem,
    size: usize,
    channels: usize,
) -> Result<ImageItem, DataError> {
    let (height, width) = (item.image.len() as u32, item.image[0].len() as u32);
    let gray = GrayImage::from_fn(width, height, |x, y| {
        Luma([item.image[y as usize][x as usize].clamp(0.0, 255.0) as u8])
    });
    image_to_item(DynamicImage::ImageLuma8(gray), size, channels)
}

impl Dataset<LoadedItem> for MnistImages {
    fn get(&self, index: usize) -> Option<LoadedItem> {
        let item = self.inner.get(index)?;
        Some(
            mnist_to_item(&item, self.size, self.channels)
                .map_err(|e| ItemLoadError::new(format!("mnist[{index}]"), e)),
        )
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}
