use std::path::Path;
use std::time::{Duration, Instant};

use burn::module::AutodiffModule;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::record::DefaultRecorder;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::{Distribution, ElementConversion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::checkpoint::CheckpointWeights;
use crate::config::{AppConfig, StepConfig};
use crate::data::{ImageBatch, LoadedBatch};
use crate::error::{CheckpointError, TrainingError};
use crate::model::{Critic, Frozen, ImageGenerator};
use crate::training::penalty::WassersteinDivPenalty;
use crate::training::sink::TrainingSink;
use crate::training::state::{updates_generator, TrainingState};

const GENERATOR_FILE: &str = "generator";
const DISCRIMINATOR_FILE: &str = "discriminator";

/// Loop schedule and step sizes.
#[derive(Debug, Clone)]
pub struct TrainerConfig {
    /// Training stops before this epoch.
    pub epochs: usize,
    pub g_num: usize,
    pub g_lr: f64,
    pub d_lr: f64,
    pub z_dim: usize,
    pub sample_count: usize,
    pub seed: u64,
    pub steps: StepConfig,
}

impl TrainerConfig {
    pub fn from_config(config: &AppConfig) -> Self {
        TrainerConfig {
            epochs: config.training.epochs,
            g_num: config.training.g_num,
            g_lr: config.training.g_lr,
            d_lr: config.training.d_lr,
            z_dim: config.model.z_dim,
            sample_count: config.training.sample_count,
            seed: config.training.seed,
            steps: config.steps,
        }
    }
}

/// Where a batch sits in the run, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPosition {
    pub epoch: usize,
    pub batch: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiscriminatorStepOutput {
    /// Total discriminator loss, penalty included.
    pub d_loss: f32,
    pub penalty: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchOutcome {
    pub d_loss: f32,
    pub penalty: f32,
    /// Set only on batches that also stepped the generator.
    pub g_loss: Option<f32>,
}

/// Adversarial trainer owning both networks and their optimizers.
pub struct GanTrainer<B, G, D>
where
    B: AutodiffBackend,
    G: AutodiffModule<B> + ImageGenerator<B>,
    D: AutodiffModule<B> + Critic<B>,
{
    generator: G,
    discriminator: D,
    g_optimizer: OptimizerAdaptor<Adam, G, B>,
    d_optimizer: OptimizerAdaptor<Adam, D, B>,
    penalty: WassersteinDivPenalty,
    config: TrainerConfig,
    fixed_noise: Tensor<B::InnerBackend, 2>,
    device: B::Device,
}

impl<B, G, D> GanTrainer<B, G, D>
where
    B: AutodiffBackend,
    G: AutodiffModule<B> + ImageGenerator<B>,
    D: AutodiffModule<B> + Critic<B>,
    G::InnerModule: ImageGenerator<B::InnerBackend>,
{
    pub fn new(
        generator: G,
        discriminator: D,
        optimizers: (OptimizerAdaptor<Adam, G, B>, OptimizerAdaptor<Adam, D, B>),
        penalty: WassersteinDivPenalty,
        config: TrainerConfig,
        device: B::Device,
    ) -> Self {
        let (g_optimizer, d_optimizer) = optimizers;
        let fixed_noise = fixed_noise::<B::InnerBackend>(
            config.sample_count,
            config.z_dim,
            config.seed,
            &device,
        );
        GanTrainer {
            generator,
            discriminator,
            g_optimizer,
            d_optimizer,
            penalty,
            config,
            fixed_noise,
            device,
        }
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn discriminator(&self) -> &D {
        &self.discriminator
    }

    pub fn fixed_noise(&self) -> &Tensor<B::InnerBackend, 2> {
        &self.fixed_noise
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Standard-normal noise `[batch_size, z_dim]` for one batch.
    pub fn sample_noise(&self, batch_size: usize) -> Tensor<B, 2> {
        Tensor::random(
            [batch_size, self.config.z_dim],
            Distribution::Normal(0.0, 1.0),
            &self.device,
        )
    }

    /// One discriminator update on a real batch and fakes generated from `noise`.
    ///
    /// The fakes are detached, so only discriminator gradients exist.
    pub fn discriminator_step(
        &mut self,
        position: BatchPosition,
        real: Tensor<B, 4>,
        noise: Tensor<B, 2>,
    ) -> Result<DiscriminatorStepOutput, TrainingError> {
        let real_scores = self.discriminator.score(real.clone());
        let fake = self.generator.generate(noise).detach();
        let fake_scores = self.discriminator.score(fake.clone());

        let penalty = self.penalty.compute(
            &self.discriminator,
            real,
            real_scores.clone(),
            fake,
            fake_scores.clone(),
        );
        let loss = real_scores.mean().neg() + fake_scores.mean() + penalty.clone();

        let d_loss = scalar(loss.clone());
        let penalty = scalar(penalty);
        ensure_finite("discriminator", d_loss, position)?;

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.discriminator);
        self.discriminator = self
            .d_optimizer
            .step(self.config.d_lr, self.discriminator.clone(), grads);

        Ok(DiscriminatorStepOutput { d_loss, penalty })
    }

    /// One generator update against a frozen copy of the discriminator.
    pub fn generator_step(
        &mut self,
        position: BatchPosition,
        noise: Tensor<B, 2>,
    ) -> Result<f32, TrainingError> {
        let critic = Frozen::new::<B>(self.discriminator.clone());
        let fake = self.generator.generate(noise);
        let loss = critic.module().score(fake).mean().neg();

        let g_loss = scalar(loss.clone());
        ensure_finite("generator", g_loss, position)?;

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.generator);
        self.generator = self
            .g_optimizer
            .step(self.config.g_lr, self.generator.clone(), grads);

        Ok(g_loss)
    }

    /// Discriminator step on every batch, generator step every `g_num`-th,
    /// both driven by the same noise.
    pub fn train_batch(
        &mut self,
        batch: usize,
        real: Tensor<B, 4>,
        noise: Tensor<B, 2>,
        state: &mut TrainingState,
    ) -> Result<BatchOutcome, TrainingError> {
        let position = BatchPosition {
            epoch: state.epoch,
            batch,
        };

        let d_out = self.discriminator_step(position, real, noise.clone())?;
        state.record_discriminator(batch, d_out.d_loss, d_out.penalty);

        let g_loss = if updates_generator(batch, self.config.g_num) {
            let g_loss = self.generator_step(position, noise)?;
            state.record_generator(g_loss);
            Some(g_loss)
        } else {
            None
        };

        tracing::debug!(
            epoch = state.epoch,
            batch,
            d_loss = d_out.d_loss,
            penalty = d_out.penalty,
            g_loss = ?g_loss,
            "batch"
        );

        Ok(BatchOutcome {
            d_loss: d_out.d_loss,
            penalty: d_out.penalty,
            g_loss,
        })
    }

    /// Train on every batch of one epoch. Returns the last real batch.
    ///
    /// A batch holding an unreadable item stops the epoch with
    /// [`TrainingError::BatchLoad`].
    pub fn run_epoch<I>(
        &mut self,
        epoch: usize,
        batches: I,
        state: &mut TrainingState,
    ) -> Result<Tensor<B, 4>, TrainingError>
    where
        I: IntoIterator<Item = LoadedBatch<B>>,
    {
        state.begin_epoch(epoch);

        let mut last_real = None;
        for (batch, loaded) in batches.into_iter().enumerate() {
            let ImageBatch { images } = loaded.map_err(|source| {
                tracing::error!(epoch, batch, "{source}");
                TrainingError::BatchLoad {
                    epoch,
                    batch,
                    source,
                }
            })?;
            let noise = self.sample_noise(images.dims()[0]);
            self.train_batch(batch, images.clone(), noise, state)?;
            last_real = Some(images);
        }

        last_real.ok_or(TrainingError::EmptyDataset { epoch })
    }

    /// Generator output on the fixed noise, in inference mode.
    pub fn sample_fixed(&self) -> Tensor<B::InnerBackend, 4> {
        self.generator.valid().generate(self.fixed_noise.clone())
    }

    /// Run epochs `start_epoch..epochs`, calling `batches` once per epoch for
    /// a fresh pass over the data.
    pub fn fit<F, I, S>(
        &mut self,
        start_epoch: usize,
        mut batches: F,
        sink: &mut S,
    ) -> Result<TrainingState, TrainingError>
    where
        F: FnMut() -> I,
        I: IntoIterator<Item = LoadedBatch<B>>,
        S: TrainingSink<B::InnerBackend>,
    {
        let epochs = self.config.epochs;
        let steps = self.config.steps;
        let mut state = TrainingState::starting_at(start_epoch);

        tracing::info!(start_epoch, epochs, g_num = self.config.g_num, "starting training");

        for epoch in start_epoch..epochs {
            let start = Instant::now();
            let last_real = self.run_epoch(epoch, batches(), &mut state)?;

            sink.scalars(&state)?;

            if steps.log_due(epoch) {
                tracing::info!(
                    "Elapsed [{}], epoch [{}/{}], d_loss: {:.4}, g_loss: {:.4}",
                    format_elapsed(start.elapsed()),
                    epoch,
                    epochs,
                    state.d_loss.unwrap_or(f32::NAN),
                    state.g_loss.unwrap_or(f32::NAN),
                );
            }

            if steps.sample_due(epoch) {
                sink.samples(epoch, last_real.inner(), self.sample_fixed())?;
            }

            if steps.checkpoint_due(epoch) {
                sink.checkpoint(&state, &*self)?;
            }
        }

        tracing::info!(
            generator_updates = state.generator_updates,
            discriminator_updates = state.discriminator_updates,
            "training complete"
        );
        Ok(state)
    }
}

impl<B, G, D> CheckpointWeights for GanTrainer<B, G, D>
where
    B: AutodiffBackend,
    G: AutodiffModule<B> + ImageGenerator<B>,
    D: AutodiffModule<B> + Critic<B>,
{
    fn save_weights_to_dir(&self, dir: &Path) -> Result<(), CheckpointError> {
        let recorder = DefaultRecorder::default();
        self.generator
            .clone()
            .save_file(dir.join(GENERATOR_FILE), &recorder)
            .map_err(|e| CheckpointError::ModelSave(e.to_string()))?;
        self.discriminator
            .clone()
            .save_file(dir.join(DISCRIMINATOR_FILE), &recorder)
            .map_err(|e| CheckpointError::ModelSave(e.to_string()))?;
        Ok(())
    }

    fn load_weights_from_dir(&mut self, dir: &Path) -> Result<(), CheckpointError> {
        let recorder = DefaultRecorder::default();
        self.generator = self
            .generator
            .clone()
            .load_file(dir.join(GENERATOR_FILE), &recorder, &self.device)
            .map_err(|e| CheckpointError::ModelLoad(e.to_string()))?;
        self.discriminator = self
            .discriminator
            .clone()
            .load_file(dir.join(DISCRIMINATOR_FILE), &recorder, &self.device)
            .map_err(|e| CheckpointError::ModelLoad(e.to_string()))?;
        Ok(())
    }
}

/// `count x z_dim` standard-normal values drawn from a seeded generator.
pub fn fixed_noise<B: Backend>(
    count: usize,
    z_dim: usize,
    seed: u64,
    device: &B::Device,
) -> Tensor<B, 2> {
    let mut rng = StdRng::seed_from_u64(seed);
    let values: Vec<f32> = (0..count * z_dim)
        .map(|_| rng.sample::<f32, _>(StandardNormal))
        .collect();
    Tensor::from_data(
        TensorData::new(values, [count, z_dim]).convert::<B::FloatElem>(),
        device,
    )
}

/// `H:MM:SS.ffffff`, with the fraction left off when it is zero.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let clock = format!("{}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60);
    match elapsed.subsec_micros() {
        0 => clock,
        micros => format!("{clock}.{micros:06}"),
    }
}

fn scalar<B: Backend>(tensor: Tensor<B, 1>) -> f32 {
    tensor.into_scalar().elem::<f32>()
}

fn ensure_finite(
    network: &'static str,
    loss: f32,
    position: BatchPosition,
) -> Result<(), TrainingError> {
    if loss.is_finite() {
        Ok(())
    } else {
        tracing::error!(network, epoch = position.epoch, batch = position.batch, "non-finite loss");
        Err(TrainingError::NonFiniteLoss {
            network,
            epoch: position.epoch,
            batch: position.batch,
        })
    }
}
