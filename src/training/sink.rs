use std::path::PathBuf;

use burn::prelude::*;

use crate::checkpoint::{
    CheckpointHyperparameters, CheckpointManager, CheckpointManagerConfig, CheckpointWeights,
};
use crate::config::AppConfig;
use crate::error::TrainingError;
use crate::sample::SampleWriter;
use crate::training::scalars::ScalarLogger;
use crate::training::TrainingState;

/// Where the training loop sends its per-epoch outputs.
pub trait TrainingSink<B: Backend> {
    /// Per-epoch scalars from the last batch of `state.epoch`.
    fn scalars(&mut self, state: &TrainingState) -> Result<(), TrainingError>;

    /// The last real batch of `epoch` and the generator's output on the fixed noise.
    fn samples(
        &mut self,
        epoch: usize,
        real: Tensor<B, 4>,
        fake: Tensor<B, 4>,
    ) -> Result<(), TrainingError>;

    fn checkpoint(
        &mut self,
        state: &TrainingState,
        weights: &dyn CheckpointWeights,
    ) -> Result<(), TrainingError>;
}

/// Writes scalars, sample grids and checkpoints under the configured
/// versioned output directories.
pub struct RunArtifacts {
    scalars: Option<ScalarLogger>,
    samples: SampleWriter,
    checkpoints: CheckpointManager,
    hyperparameters: CheckpointHyperparameters,
}

impl RunArtifacts {
    pub fn from_config(config: &AppConfig) -> Result<Self, TrainingError> {
        let scalars = if config.output.scalar_log {
            Some(ScalarLogger::create(&config.output.log_dir())?)
        } else {
            None
        };
        Ok(RunArtifacts {
            scalars,
            samples: SampleWriter::new(config.output.sample_dir()),
            checkpoints: CheckpointManager::new(CheckpointManagerConfig {
                checkpoint_dir: config.output.checkpoint_dir(),
                keep_last_n: config.output.keep_last_n,
            }),
            hyperparameters: CheckpointHyperparameters::from_config(config),
        })
    }

    pub fn checkpoints(&self) -> &CheckpointManager {
        &self.checkpoints
    }

    pub fn scalar_log_path(&self) -> Option<PathBuf> {
        self.scalars.as_ref().map(|logger| logger.path().to_path_buf())
    }
}

impl<B: Backend> TrainingSink<B> for RunArtifacts {
    fn scalars(&mut self, state: &TrainingState) -> Result<(), TrainingError> {
        let Some(logger) = self.scalars.as_mut() else {
            return Ok(());
        };
        if let Some(d_loss) = state.d_loss {
            logger.log("d_loss", state.epoch, d_loss)?;
        }
        if let Some(g_loss) = state.g_loss {
            logger.log("g_loss", state.epoch, g_loss)?;
        }
        Ok(())
    }

    fn samples(
        &mut self,
        epoch: usize,
        real: Tensor<B, 4>,
        fake: Tensor<B, 4>,
    ) -> Result<(), TrainingError> {
        self.samples.write_real(epoch, real)?;
        let path = self.samples.write_fake(epoch, fake)?;
        tracing::debug!(epoch, path = %path.display(), "wrote sample grids");
        Ok(())
    }

    fn checkpoint(
        &mut self,
        state: &TrainingState,
        weights: &dyn CheckpointWeights,
    ) -> Result<(), TrainingError> {
        let path = self.checkpoints.save(weights, state, &self.hyperparameters)?;
        tracing::info!(epoch = state.epoch, path = %path.display(), "checkpoint saved");
        Ok(())
    }
}
