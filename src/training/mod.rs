//! Adversarial training: the WGAN-div penalty, the training loop and state,
//! and the sinks that receive per-epoch scalars, samples and checkpoints.

pub mod penalty;
pub mod scalars;
pub mod sink;
pub mod state;
pub mod trainer;

#[cfg(test)]
pub(crate) mod toy;

pub use penalty::{PenaltyConfig, WassersteinDivPenalty};
pub use scalars::{ScalarLogger, ScalarRecord};
pub use sink::{RunArtifacts, TrainingSink};
pub use state::TrainingState;
pub use trainer::{GanTrainer, TrainerConfig};
