#![recursion_limit = "256"]

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use wgan_div::checkpoint::{CheckpointData, CheckpointWeights};
use wgan_div::config::AppConfig;
use wgan_div::data::{build_dataset, build_loader};
use wgan_div::model::{ModelConfig, OptimizerConfig};
use wgan_div::training::{GanTrainer, RunArtifacts, TrainerConfig, WassersteinDivPenalty};

#[cfg(feature = "wgpu")]
type TrainBackend = burn::backend::Autodiff<burn::backend::Wgpu<f32, i32>>;
#[cfg(not(feature = "wgpu"))]
type TrainBackend = burn::backend::Autodiff<burn::backend::NdArray<f32>>;

/// Train a WGAN-div image generator.
#[derive(Parser)]
#[command(name = "train", about = "Train a WGAN-div image generator")]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Override number of training epochs
    #[arg(long)]
    epochs: Option<usize>,

    /// Override the run version (output subdirectory)
    #[arg(long)]
    version: Option<String>,

    /// Override the image folder
    #[arg(long)]
    dataroot: Option<PathBuf>,

    /// Resume training from the latest checkpoint of this version
    #[arg(long)]
    resume: bool,

    /// Log every batch
    #[arg(long, short)]
    verbose: bool,

    /// Print the default configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.print_config {
        print!("{}", AppConfig::default_toml());
        return Ok(());
    }

    wgan_div::logging::init(cli.verbose);

    // Load configuration
    let mut config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    // Apply CLI overrides
    if let Some(epochs) = cli.epochs {
        config.training.epochs = epochs;
    }
    if let Some(version) = cli.version {
        config.output.version = version;
    }
    if let Some(dataroot) = cli.dataroot {
        config.data.dataroot = dataroot;
    }
    config.validate().context("invalid configuration")?;

    let device: <TrainBackend as burn::tensor::backend::Backend>::Device = Default::default();
    let (generator, discriminator) =
        ModelConfig::from_section(&config.model).build::<TrainBackend>(&device);
    let mut trainer = GanTrainer::new(
        generator,
        discriminator,
        OptimizerConfig::from_section(&config.training).build(),
        WassersteinDivPenalty::new(config.penalty.clone()),
        TrainerConfig::from_config(&config),
        device.clone(),
    );

    let mut artifacts = RunArtifacts::from_config(&config).context("creating output directories")?;

    let start_epoch = match resume_from(&config, cli.resume, &artifacts)? {
        Some(checkpoint) => {
            checkpoint
                .metadata
                .hyperparameters
                .ensure_compatible(&config.model)
                .with_context(|| {
                    format!("checkpoint {} does not fit this model", checkpoint.path.display())
                })?;
            trainer
                .load_weights_from_dir(&checkpoint.path)
                .with_context(|| format!("loading weights from {}", checkpoint.path.display()))?;
            tracing::info!(
                epoch = checkpoint.metadata.epoch,
                path = %checkpoint.path.display(),
                "resumed from checkpoint"
            );
            checkpoint.metadata.epoch + 1
        }
        None => 0,
    };
    if start_epoch >= config.training.epochs {
        bail!(
            "checkpoint is at epoch {} but training.epochs is {}; nothing left to train",
            start_epoch - 1,
            config.training.epochs
        );
    }

    let dataset = build_dataset(&config.data, &config.model).context("opening dataset")?;
    let loader = build_loader::<TrainBackend>(dataset, &config, &device);

    trainer
        .fit(start_epoch, || loader.iter(), &mut artifacts)
        .context("training failed")?;

    if let Some(path) = artifacts.scalar_log_path() {
        tracing::info!(path = %path.display(), "scalar log");
    }
    Ok(())
}

/// The checkpoint to resume from: the configured epoch if set, otherwise the
/// latest one when `--resume` was given.
fn resume_from(
    config: &AppConfig,
    resume: bool,
    artifacts: &RunArtifacts,
) -> Result<Option<CheckpointData>> {
    let checkpoints = artifacts.checkpoints();
    if let Some(epoch) = config.training.pretrained_model {
        let data = checkpoints
            .load(epoch)
            .with_context(|| format!("loading pretrained model at epoch {epoch}"))?;
        return Ok(Some(data));
    }
    if !resume {
        return Ok(None);
    }
    match checkpoints.load_latest() {
        Ok(data) => Ok(Some(data)),
        Err(e) => {
            tracing::warn!("no checkpoint found ({e}), starting fresh");
            Ok(None)
        }
    }
}
