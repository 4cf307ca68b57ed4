use std::path::PathBuf;

/// Errors that can occur during checkpoint operations.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("checkpoint directory not found: {0}")]
    DirNotFound(PathBuf),

    #[error("no checkpoints found in {0}")]
    NoCheckpoints(PathBuf),

    #[error("failed to read metadata from {path}: {source}")]
    MetadataRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse metadata from {path}: {source}")]
    MetadataParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to save model: {0}")]
    ModelSave(String),

    #[error("failed to load model: {0}")]
    ModelLoad(String),

    #[error("checkpoint {field} is {saved} but the configured model has {current}")]
    IncompatibleModel {
        field: &'static str,
        saved: usize,
        current: usize,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while building or reading the training dataset.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("dataset root not found: {0}")]
    RootNotFound(PathBuf),

    #[error("no images found under {0}")]
    NoImages(PathBuf),

    #[error("failed to read image {path}: {source}")]
    ImageRead {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("unsupported channel count {0} (expected 1 or 3)")]
    UnsupportedChannels(usize),

    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },
}

/// A single dataset item that could not be loaded.
///
/// Travels through the data loader inside the batch so the training loop can
/// stop on it, which is why it holds the message rather than the source error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("failed to load {item}: {message}")]
pub struct ItemLoadError {
    pub item: String,
    pub message: String,
}

impl ItemLoadError {
    pub fn new(item: impl Into<String>, source: impl std::fmt::Display) -> Self {
        ItemLoadError {
            item: item.into(),
            message: source.to_string(),
        }
    }
}

/// Errors raised while writing sample image grids.
#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error("cannot write an empty image batch")]
    EmptyBatch,

    #[error("unsupported channel count {0} (expected 1 or 3)")]
    UnsupportedChannels(usize),

    #[error("failed to read tensor data: {0}")]
    TensorData(String),

    #[error("failed to encode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur during training.
#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("epoch {epoch} produced no batches")]
    EmptyDataset { epoch: usize },

    #[error("{network} loss became non-finite at epoch {epoch}, batch {batch}")]
    NonFiniteLoss {
        network: &'static str,
        epoch: usize,
        batch: usize,
    },

    #[error("epoch {epoch}, batch {batch}: {source}")]
    BatchLoad {
        epoch: usize,
        batch: usize,
        source: ItemLoadError,
    },

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("sample error: {0}")]
    Sample(#[from] SampleError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}
