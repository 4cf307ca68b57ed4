use serde::{Deserialize, Serialize};

/// Whether batch `batch_index` also takes a generator step.
pub fn updates_generator(batch_index: usize, g_num: usize) -> bool {
    batch_index % g_num == 0
}

/// Counters and last losses of a training run.
///
/// Losses are those of the most recent batch, not epoch averages; they stay
/// `None` until the first step of their network has run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingState {
    pub epoch: usize,
    /// Index of the current batch within `epoch`.
    pub batch: usize,
    /// Batches processed since the run started.
    pub global_step: usize,
    pub discriminator_updates: usize,
    pub generator_updates: usize,
    pub d_loss: Option<f32>,
    pub g_loss: Option<f32>,
    pub penalty: Option<f32>,
}

impl TrainingState {
    /// State at the start of `epoch`, used when resuming from a checkpoint.
    pub fn starting_at(epoch: usize) -> Self {
        TrainingState {
            epoch,
            ..Default::default()
        }
    }

    pub(crate) fn begin_epoch(&mut self, epoch: usize) {
        self.epoch = epoch;
        self.batch = 0;
    }

    pub(crate) fn record_discriminator(&mut self, batch: usize, d_loss: f32, penalty: f32) {
        self.batch = batch;
        self.global_step += 1;
        self.discriminator_updates += 1;
        self.d_loss = Some(d_loss);
        self.penalty = Some(penalty);
    }

    pub(crate) fn record_generator(&mut self, g_loss: f32) {
        self.generator_updates += 1;
        self.g_loss = Some(g_loss);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_updates_generator_schedule() {
        let picked: Vec<usize> = (0..12).filter(|&i| updates_generator(i, 5)).collect();
        assert_eq!(picked, vec![0, 5, 10]);
        assert!((0..4).all(|i| updates_generator(i, 1)));
    }

    #[test]
    fn test_record_counters() {
        let mut state = TrainingState::default();
        state.begin_epoch(2);
        state.record_discriminator(0, -1.5, 0.25);
        state.record_generator(0.75);
        state.record_discriminator(1, -1.0, 0.5);

        assert_eq!(state.epoch, 2);
        assert_eq!(state.batch, 1);
        assert_eq!(state.global_step, 2);
        assert_eq!(state.discriminator_updates, 2);
        assert_eq!(state.generator_updates, 1);
        assert_eq!(state.d_loss, Some(-1.0));
        assert_eq!(state.g_loss, Some(0.75));
        assert_eq!(state.penalty, Some(0.5));
    }

    #[test]
    fn test_state_serde() {
        let mut state = TrainingState::starting_at(4);
        state.record_discriminator(3, 0.5, 0.1);
        let json = serde_json::to_string(&state).unwrap();
        let back: TrainingState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
        assert_eq!(back.g_loss, None);
    }
}
