use serde::{Deserialize, Serialize};

use crate::config::{AppConfig, ModelSection};
use crate::error::CheckpointError;
use crate::training::TrainingState;

/// Hyperparameters recorded in checkpoint metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointHyperparameters {
    pub img_size: usize,
    pub z_dim: usize,
    pub channels: usize,
    pub g_conv_dim: usize,
    pub d_conv_dim: usize,
    pub g_num: usize,
    pub batch_size: usize,
    pub g_lr: f64,
    pub d_lr: f64,
    pub beta1: f32,
    pub beta2: f32,
    pub penalty_k: f64,
    pub penalty_p: f64,
}

impl CheckpointHyperparameters {
    pub fn from_config(config: &AppConfig) -> Self {
        CheckpointHyperparameters {
            img_size: config.model.img_size,
            z_dim: config.model.z_dim,
            channels: config.model.channels,
            g_conv_dim: config.model.g_conv_dim,
            d_conv_dim: config.model.d_conv_dim,
            g_num: config.training.g_num,
            batch_size: config.training.batch_size,
            g_lr: config.training.g_lr,
            d_lr: config.training.d_lr,
            beta1: config.training.beta1,
            beta2: config.training.beta2,
            penalty_k: config.penalty.k,
            penalty_p: config.penalty.p,
        }
    }

    /// Reject a checkpoint whose networks were built with a different shape
    /// than `model` describes. Optimizer and schedule settings may change
    /// between runs.
    pub fn ensure_compatible(&self, model: &ModelSection) -> Result<(), CheckpointError> {
        let fields = [
            ("img_size", self.img_size, model.img_size),
            ("z_dim", self.z_dim, model.z_dim),
            ("channels", self.channels, model.channels),
            ("g_conv_dim", self.g_conv_dim, model.g_conv_dim),
            ("d_conv_dim", self.d_conv_dim, model.d_conv_dim),
        ];
        match fields.into_iter().find(|(_, saved, current)| saved != current) {
            Some((field, saved, current)) => Err(CheckpointError::IncompatibleModel {
                field,
                saved,
                current,
            }),
            None => Ok(()),
        }
    }
}

/// Top-level checkpoint metadata written to metadata.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub epoch: usize,
    pub timestamp: u64,
    pub model: String,
    pub g_loss: Option<f32>,
    pub d_loss: Option<f32>,
    pub state: TrainingState,
    pub hyperparameters: CheckpointHyperparameters,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_architecture_is_compatible() {
        let mut config = AppConfig::default();
        let saved = CheckpointHyperparameters::from_config(&config);

        config.training.g_lr = 1e-3;
        config.training.batch_size = 16;
        config.penalty.k = 5.0;
        assert!(saved.ensure_compatible(&config.model).is_ok());
    }

    #[test]
    fn test_changed_architecture_is_rejected() {
        let mut config = AppConfig::default();
        let saved = CheckpointHyperparameters::from_config(&config);

        config.model.img_size = 32;
        let err = saved.ensure_compatible(&config.model).unwrap_err();
        assert!(matches!(
            err,
            CheckpointError::IncompatibleModel {
                field: "img_size",
                saved: 64,
                current: 32
            }
        ));

        let mut config = AppConfig::default();
        config.model.d_conv_dim = 32;
        let err = saved.ensure_compatible(&config.model).unwrap_err();
        assert!(matches!(
            err,
            CheckpointError::IncompatibleModel {
                field: "d_conv_dim",
                ..
            }
        ));
    }
}
