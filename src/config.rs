use std::path::{Path, PathBuf};

use crate::data::DatasetKind;
use crate::error::ConfigError;
use crate::training::penalty::PenaltyConfig;

/// The only model tag this crate trains.
pub const MODEL_NAME: &str = "wgan-div";

/// Network architecture hyperparameters.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ModelSection {
    pub name: String,
    pub img_size: usize,
    pub z_dim: usize,
    pub channels: usize,
    pub g_conv_dim: usize,
    pub d_conv_dim: usize,
    pub init_std: f64,
}

impl Default for ModelSection {
    fn default() -> Self {
        ModelSection {
            name: MODEL_NAME.to_string(),
            img_size: 64,
            z_dim: 100,
            channels: 3,
            g_conv_dim: 64,
            d_conv_dim: 64,
            init_std: 0.02,
        }
    }
}

/// Optimization schedule and optimizer hyperparameters.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TrainingSection {
    pub epochs: usize,
    /// The generator is updated on batches where `batch_index % g_num == 0`.
    pub g_num: usize,
    pub batch_size: usize,
    pub num_workers: usize,
    pub g_lr: f64,
    pub d_lr: f64,
    pub beta1: f32,
    pub beta2: f32,
    pub seed: u64,
    /// Number of fixed noise vectors rendered into each fake sample grid.
    pub sample_count: usize,
    /// Epoch of a saved checkpoint to resume from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pretrained_model: Option<usize>,
}

impl Default for TrainingSection {
    fn default() -> Self {
        TrainingSection {
            epochs: 200,
            g_num: 5,
            batch_size: 64,
            num_workers: 2,
            g_lr: 2e-4,
            d_lr: 2e-4,
            beta1: 0.5,
            beta2: 0.999,
            seed: 42,
            sample_count: 100,
            pretrained_model: None,
        }
    }
}

/// Where training images come from.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DataSection {
    pub dataset: DatasetKind,
    pub dataroot: PathBuf,
}

impl Default for DataSection {
    fn default() -> Self {
        DataSection {
            dataset: DatasetKind::Folder,
            dataroot: PathBuf::from("data"),
        }
    }
}

/// Output roots. Each gets `version` appended as a subdirectory.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub log_path: PathBuf,
    pub sample_path: PathBuf,
    pub model_save_path: PathBuf,
    pub version: String,
    /// Append per-epoch `d_loss`/`g_loss` scalars to `scalars.jsonl`.
    pub scalar_log: bool,
    /// Keep only the newest N checkpoints; 0 keeps all of them.
    pub keep_last_n: usize,
}

impl Default for OutputSection {
    fn default() -> Self {
        OutputSection {
            log_path: PathBuf::from("logs"),
            sample_path: PathBuf::from("samples"),
            model_save_path: PathBuf::from("checkpoints"),
            version: "wgan_div".to_string(),
            scalar_log: true,
            keep_last_n: 0,
        }
    }
}

impl OutputSection {
    pub fn log_dir(&self) -> PathBuf {
        self.log_path.join(&self.version)
    }

    pub fn sample_dir(&self) -> PathBuf {
        self.sample_path.join(&self.version)
    }

    pub fn checkpoint_dir(&self) -> PathBuf {
        self.model_save_path.join(&self.version)
    }
}

/// Epoch intervals for logging, sampling and checkpointing.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct StepConfig {
    pub log_step: usize,
    pub sample_step: usize,
    pub model_save_step: usize,
}

impl Default for StepConfig {
    fn default() -> Self {
        StepConfig {
            log_step: 1,
            sample_step: 10,
            model_save_step: 10,
        }
    }
}

impl StepConfig {
    pub fn log_due(&self, epoch: usize) -> bool {
        epoch % self.log_step == 0
    }

    pub fn sample_due(&self, epoch: usize) -> bool {
        epoch % self.sample_step == 0
    }

    pub fn checkpoint_due(&self, epoch: usize) -> bool {
        epoch % self.model_save_step == 0
    }
}

/// Top-level application configuration, loadable from TOML.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub model: ModelSection,
    pub training: TrainingSection,
    pub penalty: PenaltyConfig,
    pub data: DataSection,
    pub output: OutputSection,
    pub steps: StepConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the file
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::warn!(
                "config file '{}' not found, using defaults",
                path.display()
            );
            Ok(Self::default())
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let model = &self.model;
        if model.name != MODEL_NAME {
            return Err(ConfigError::Validation(format!(
                "model.name must be '{MODEL_NAME}', got '{}'",
                model.name
            )));
        }
        if model.img_size < 8 || !model.img_size.is_power_of_two() {
            return Err(ConfigError::Validation(
                "model.img_size must be a power of two >= 8".into(),
            ));
        }
        if model.channels != 1 && model.channels != 3 {
            return Err(ConfigError::Validation(
                "model.channels must be 1 or 3".into(),
            ));
        }
        if model.z_dim == 0 {
            return Err(ConfigError::Validation("model.z_dim must be > 0".into()));
        }
        if model.g_conv_dim == 0 || model.d_conv_dim == 0 {
            return Err(ConfigError::Validation(
                "model.g_conv_dim and model.d_conv_dim must be > 0".into(),
            ));
        }
        if model.init_std <= 0.0 {
            return Err(ConfigError::Validation(
                "model.init_std must be > 0".into(),
            ));
        }

        let training = &self.training;
        if training.epochs == 0 {
            return Err(ConfigError::Validation(
                "training.epochs must be > 0".into(),
            ));
        }
        if training.g_num == 0 {
            return Err(ConfigError::Validation(
                "training.g_num must be > 0".into(),
            ));
        }
        if training.batch_size == 0 {
            return Err(ConfigError::Validation(
                "training.batch_size must be > 0".into(),
            ));
        }
        if training.g_lr <= 0.0 {
            return Err(ConfigError::Validation(
                "training.g_lr must be > 0".into(),
            ));
        }
        if training.d_lr <= 0.0 {
            return Err(ConfigError::Validation(
                "training.d_lr must be > 0".into(),
            ));
        }
        if !(0.0..1.0).contains(&training.beta1) {
            return Err(ConfigError::Validation(
                "training.beta1 must be in [0, 1)".into(),
            ));
        }
        if !(0.0..1.0).contains(&training.beta2) {
            return Err(ConfigError::Validation(
                "training.beta2 must be in [0, 1)".into(),
            ));
        }
        if training.sample_count == 0 {
            return Err(ConfigError::Validation(
                "training.sample_count must be > 0".into(),
            ));
        }
        if let Some(epoch) = training.pretrained_model {
            if epoch + 1 >= training.epochs {
                return Err(ConfigError::Validation(format!(
                    "training.pretrained_model ({epoch}) leaves no epochs to train (epochs = {})",
                    training.epochs
                )));
            }
        }

        if self.penalty.k <= 0.0 {
            return Err(ConfigError::Validation("penalty.k must be > 0".into()));
        }
        if self.penalty.p <= 0.0 {
            return Err(ConfigError::Validation("penalty.p must be > 0".into()));
        }
        if self.penalty.probe_step <= 0.0 {
            return Err(ConfigError::Validation(
                "penalty.probe_step must be > 0".into(),
            ));
        }

        if self.output.version.is_empty() {
            return Err(ConfigError::Validation(
                "output.version must not be empty".into(),
            ));
        }

        if self.steps.log_step == 0
            || self.steps.sample_step == 0
            || self.steps.model_save_step == 0
        {
            return Err(ConfigError::Validation(
                "steps.log_step, steps.sample_step and steps.model_save_step must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Generate a TOML string with all default values (useful for creating
    /// example config files).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&AppConfig::default()).expect("default config serializes")
    }
}
