//! Training images: an image-folder dataset, an MNIST adapter, and the
//! batcher and loader that feed them to the training loop.

mod batcher;
mod folder;
mod mnist;

use std::sync::Arc;

use burn::data::dataloader::{DataLoader, DataLoaderBuilder};
use burn::data::dataset::Dataset;
use burn::prelude::*;
use serde::{Deserialize, Serialize};

pub use batcher::{ImageBatch, ImageBatcher, ImageItem, LoadedBatch, LoadedItem};
pub use folder::ImageFolderDataset;
pub use mnist::MnistImages;

use crate::config::{AppConfig, DataSection, ModelSection};
use crate::error::DataError;

/// Which dataset the images come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    /// Every image file under `dataroot`.
    #[default]
    Folder,
    /// Burn's MNIST training split, downloaded on first use.
    Mnist,
}

/// Open the configured dataset.
pub fn build_dataset(
    data: &DataSection,
    model: &ModelSection,
) -> Result<Box<dyn Dataset<LoadedItem>>, DataError> {
    match data.dataset {
        DatasetKind::Folder => Ok(Box::new(ImageFolderDataset::new(
            &data.dataroot,
            model.img_size,
            model.channels,
        )?)),
        DatasetKind::Mnist => Ok(Box::new(MnistImages::train(
            model.img_size,
            model.channels,
        )?)),
    }
}

/// Shuffled batch loader over a dataset, reshuffled every epoch.
///
/// Every index yields a batch entry; an unreadable image surfaces as an `Err`
/// batch rather than shortening the epoch.
pub fn build_loader<B: Backend>(
    dataset: Box<dyn Dataset<LoadedItem>>,
    config: &AppConfig,
    device: &B::Device,
) -> Arc<dyn DataLoader<B, LoadedBatch<B>>> {
    let mut builder = DataLoaderBuilder::new(ImageBatcher)
        .batch_size(config.training.batch_size)
        .shuffle(config.training.seed)
        .set_device(device.clone());
    if config.training.num_workers > 0 {
        builder = builder.num_workers(config.training.num_workers);
    }
    builder.build(dataset)
}
