use burn::data::dataloader::batcher::Batcher;
use burn::prelude::*;

use crate::error::ItemLoadError;

/// One image as `[channels, size, size]` values in `[-1, 1]`, channel-major.
#[derive(Debug, Clone)]
pub struct ImageItem {
    pub pixels: Vec<f32>,
    pub channels: usize,
    pub size: usize,
}

impl ImageItem {
    pub fn shape(&self) -> [usize; 3] {
        [self.channels, self.size, self.size]
    }
}

/// What a dataset yields per index. A failed load is kept as a value,
/// since the loader reads `None` as the end of the epoch.
pub type LoadedItem = Result<ImageItem, ItemLoadError>;

#[derive(Debug, Clone)]
pub struct ImageBatch<B: Backend> {
    /// `[N, C, S, S]`
    pub images: Tensor<B, 4>,
}

/// A stacked batch, or the first item in it that failed to load.
pub type LoadedBatch<B> = Result<ImageBatch<B>, ItemLoadError>;

#[derive(Debug, Clone, Default)]
pub struct ImageBatcher;

impl<B: Backend> Batcher<B, LoadedItem, LoadedBatch<B>> for ImageBatcher {
    fn batch(&self, items: Vec<LoadedItem>, device: &B::Device) -> LoadedBatch<B> {
        let images = items
            .into_iter()
            .map(|item| {
                let item = item?;
                let shape = item.shape();
                let data = TensorData::new(item.pixels, shape).convert::<B::FloatElem>();
                Ok(Tensor::<B, 3>::from_data(data, device))
            })
            .collect::<Result<Vec<_>, ItemLoadError>>()?;

        Ok(ImageBatch {
            images: Tensor::stack(images, 0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn test_batch_stacks_items() {
        let device = Default::default();
        let items = vec![
            Ok(ImageItem {
                pixels: vec![-1.0; 2 * 4 * 4],
                channels: 2,
                size: 4,
            }),
            Ok(ImageItem {
                pixels: vec![1.0; 2 * 4 * 4],
                channels: 2,
                size: 4,
            }),
        ];

        let batch: LoadedBatch<NdArray<f32>> = ImageBatcher.batch(items, &device);
        let batch = batch.unwrap();
        assert_eq!(batch.images.dims(), [2, 2, 4, 4]);

        let values: Vec<f32> = batch.images.into_data().to_vec().unwrap();
        assert_eq!(values[0], -1.0);
        assert_eq!(values[values.len() - 1], 1.0);
    }

    #[test]
    fn test_failed_item_fails_the_batch() {
        let device = Default::default();
        let failure = ItemLoadError::new("3.png", "truncated");
        let items = vec![
            Ok(ImageItem {
                pixels: vec![0.0; 4],
                channels: 1,
                size: 2,
            }),
            Err(failure.clone()),
        ];

        let batch: LoadedBatch<NdArray<f32>> = ImageBatcher.batch(items, &device);
        assert_eq!(batch.unwrap_err(), failure);
    }
}
