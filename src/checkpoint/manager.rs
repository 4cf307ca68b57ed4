use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::checkpoint::metadata::{CheckpointHyperparameters, CheckpointMetadata};
use crate::config::MODEL_NAME;
use crate::error::CheckpointError;
use crate::training::TrainingState;

const METADATA_FILE: &str = "metadata.json";
const LATEST_LINK: &str = "latest";

/// Something that can write and restore the network weights of a checkpoint.
pub trait CheckpointWeights {
    /// Save network weights into `dir`, which already exists.
    fn save_weights_to_dir(&self, dir: &Path) -> Result<(), CheckpointError>;
    /// Replace the current network weights with those saved in `dir`.
    fn load_weights_from_dir(&mut self, dir: &Path) -> Result<(), CheckpointError>;
}

/// Configuration for the checkpoint manager.
#[derive(Debug, Clone)]
pub struct CheckpointManagerConfig {
    pub checkpoint_dir: PathBuf,
    /// Number of newest checkpoints to keep; 0 keeps every checkpoint.
    ///
    /// When pruning, checkpoints with a higher epoch than the one just saved
    /// are left over from a run that was resumed at an earlier epoch, and are
    /// removed first.
    pub keep_last_n: usize,
}

/// A checkpoint found on disk.
#[derive(Debug)]
pub struct CheckpointData {
    pub path: PathBuf,
    pub metadata: CheckpointMetadata,
}

/// Manages saving, loading, listing, and pruning checkpoints.
pub struct CheckpointManager {
    config: CheckpointManagerConfig,
}

impl CheckpointManager {
    pub fn new(config: CheckpointManagerConfig) -> Self {
        fs::create_dir_all(&config.checkpoint_dir).ok();
        CheckpointManager { config }
    }

    pub fn checkpoint_dir(&self) -> &Path {
        &self.config.checkpoint_dir
    }

    /// Save a checkpoint named after `state.epoch`.
    pub fn save(
        &self,
        weights: &dyn CheckpointWeights,
        state: &TrainingState,
        hyperparameters: &CheckpointHyperparameters,
    ) -> Result<PathBuf, CheckpointError> {
        fs::create_dir_all(&self.config.checkpoint_dir)?;

        let dir_name = state.epoch.to_string();
        let tmp_dir = self.config.checkpoint_dir.join(format!("{}.tmp", dir_name));
        let final_dir = self.config.checkpoint_dir.join(&dir_name);

        if tmp_dir.exists() {
            fs::remove_dir_all(&tmp_dir)?;
        }
        fs::create_dir_all(&tmp_dir)?;

        weights.save_weights_to_dir(&tmp_dir)?;

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let metadata = CheckpointMetadata {
            epoch: state.epoch,
            timestamp,
            model: MODEL_NAME.to_string(),
            g_loss: state.g_loss,
            d_loss: state.d_loss,
            state: state.clone(),
            hyperparameters: hyperparameters.clone(),
        };
        let meta_json = serde_json::to_string_pretty(&metadata)?;
        fs::write(tmp_dir.join(METADATA_FILE), meta_json)?;

        // Atomic rename
        if final_dir.exists() {
            fs::remove_dir_all(&final_dir)?;
        }
        fs::rename(&tmp_dir, &final_dir)?;

        self.update_latest_symlink(&dir_name)?;
        self.prune_old_checkpoints(state.epoch)?;

        Ok(final_dir)
    }

    /// Load the checkpoint saved for `epoch`.
    pub fn load(&self, epoch: usize) -> Result<CheckpointData, CheckpointError> {
        let dir = self.config.checkpoint_dir.join(epoch.to_string());
        if !dir.is_dir() {
            return Err(CheckpointError::DirNotFound(dir));
        }
        self.load_checkpoint(&dir)
    }

    /// Load the checkpoint stored in `dir`.
    pub fn load_checkpoint(&self, dir: &Path) -> Result<CheckpointData, CheckpointError> {
        let meta_path = dir.join(METADATA_FILE);
        let meta_json = fs::read_to_string(&meta_path).map_err(|e| {
            CheckpointError::MetadataRead {
                path: meta_path.clone(),
                source: e,
            }
        })?;
        let metadata: CheckpointMetadata =
            serde_json::from_str(&meta_json).map_err(|e| CheckpointError::MetadataParse {
                path: meta_path,
                source: e,
            })?;

        Ok(CheckpointData {
            path: dir.to_path_buf(),
            metadata,
        })
    }

    /// Load the newest checkpoint, following the `latest` symlink when present.
    pub fn load_latest(&self) -> Result<CheckpointData, CheckpointError> {
        let latest_link = self.config.checkpoint_dir.join(LATEST_LINK);
        if let Ok(resolved) = fs::read_link(&latest_link) {
            let target = if resolved.is_relative() {
                self.config.checkpoint_dir.join(resolved)
            } else {
                resolved
            };
            if target.is_dir() {
                return self.load_checkpoint(&target);
            }
        }

        self.list()?
            .pop()
            .ok_or_else(|| CheckpointError::NoCheckpoints(self.config.checkpoint_dir.clone()))
    }

    /// List all checkpoints sorted by epoch (ascending).
    pub fn list(&self) -> Result<Vec<CheckpointData>, CheckpointError> {
        if !self.config.checkpoint_dir.is_dir() {
            return Err(CheckpointError::DirNotFound(
                self.config.checkpoint_dir.clone(),
            ));
        }

        let mut results = Vec::new();
        for entry in fs::read_dir(&self.config.checkpoint_dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_dir() || path.is_symlink() {
                continue;
            }
            let name = entry.file_name();
            if name.to_string_lossy().parse::<usize>().is_err() {
                continue;
            }
            if path.join(METADATA_FILE).exists() {
                results.push(self.load_checkpoint(&path)?);
            }
        }
        results.sort_by_key(|data| data.metadata.epoch);
        Ok(results)
    }

    /// Remove checkpoints past `saved_epoch`, then all but the newest
    /// `keep_last_n`. The checkpoint at `saved_epoch` always survives.
    fn prune_old_checkpoints(&self, saved_epoch: usize) -> Result<(), CheckpointError> {
        if self.config.keep_last_n == 0 {
            return Ok(());
        }
        let (kept, superseded): (Vec<_>, Vec<_>) = self
            .list()?
            .into_iter()
            .partition(|data| data.metadata.epoch <= saved_epoch);
        for data in &superseded {
            tracing::info!(
                epoch = data.metadata.epoch,
                saved_epoch,
                "removing checkpoint from an abandoned run"
            );
            fs::remove_dir_all(&data.path)?;
        }

        let excess = kept.len().saturating_sub(self.config.keep_last_n);
        for data in kept.iter().take(excess) {
            fs::remove_dir_all(&data.path)?;
        }
        Ok(())
    }

    /// Update the `latest` symlink to point to the given checkpoint directory name.
    #[cfg(unix)]
    fn update_latest_symlink(&self, dir_name: &str) -> Result<(), CheckpointError> {
        let link_path = self.config.checkpoint_dir.join(LATEST_LINK);
        // Remove old symlink if it exists
        if link_path.exists() || link_path.symlink_metadata().is_ok() {
            fs::remove_file(&link_path)?;
        }
        std::os::unix::fs::symlink(dir_name, &link_path)?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn update_latest_symlink(&self, _dir_name: &str) -> Result<(), CheckpointError> {
        Ok(())
    }
}
