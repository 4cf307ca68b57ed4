//! Checkpoint persistence: one directory per saved epoch holding both
//! networks' records and a JSON metadata file.

mod manager;
mod metadata;

pub use manager::{CheckpointData, CheckpointManager, CheckpointManagerConfig, CheckpointWeights};
pub use metadata::{CheckpointHyperparameters, CheckpointMetadata};
