//! Wasserstein-divergence gradient penalty.
//!
//! ```text
//! penalty = k/2 * mean_i( |grad_x D(real_i)|^p + |grad_x D(fake_i)|^p )
//! ```
//!
//! Burn's autodiff is first order, so the per-sample gradient norm is assembled
//! from two pieces:
//!
//! * its value comes from a probe pass: a no-grad copy of the critic scores a
//!   detached, grad-requiring copy of the input and `sum(scores).backward()`
//!   yields the exact input gradient;
//! * its derivative with respect to the critic weights comes from the
//!   directional difference `(D(x + h*u) - D(x)) / h` along the detached unit
//!   gradient direction `u`, computed with the trainable critic.
//!
//! The two are joined as `surrogate - detach(surrogate) + exact`, whose value
//! is the exact norm and whose gradient is the surrogate's. For a critic that
//! is linear in its input the surrogate's weight gradient is exact.

use burn::module::AutodiffModule;
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;

use crate::model::Critic;

/// Keeps the unit direction finite when a sample's gradient vanishes.
const DIRECTION_EPS: f64 = 1e-12;

/// Penalty hyperparameters.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PenaltyConfig {
    /// Coefficient; the batch mean is scaled by `k / 2`.
    pub k: f64,
    /// Power applied to each per-sample gradient norm.
    pub p: f64,
    /// Finite-difference step along the gradient direction.
    pub probe_step: f64,
}

impl Default for PenaltyConfig {
    fn default() -> Self {
        PenaltyConfig {
            k: 2.0,
            p: 6.0,
            probe_step: 1e-3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WassersteinDivPenalty {
    config: PenaltyConfig,
}

impl WassersteinDivPenalty {
    pub fn new(config: PenaltyConfig) -> Self {
        WassersteinDivPenalty { config }
    }

    pub fn config(&self) -> &PenaltyConfig {
        &self.config
    }

    /// Scalar penalty term for the discriminator loss.
    ///
    /// `real_scores` and `fake_scores` must be `critic.score(real)` and
    /// `critic.score(fake)`; they are reused as the base point of the
    /// directional difference.
    pub fn compute<B, D>(
        &self,
        critic: &D,
        real: Tensor<B, 4>,
        real_scores: Tensor<B, 2>,
        fake: Tensor<B, 4>,
        fake_scores: Tensor<B, 2>,
    ) -> Tensor<B, 1>
    where
        B: AutodiffBackend,
        D: AutodiffModule<B> + Critic<B>,
    {
        let real_norm = self.input_gradient_norm(critic, real, real_scores);
        let fake_norm = self.input_gradient_norm(critic, fake, fake_scores);

        (real_norm.powf_scalar(self.config.p) + fake_norm.powf_scalar(self.config.p))
            .mean()
            .mul_scalar(self.config.k / 2.0)
    }

    /// Per-sample L2 norm of `d critic(x) / d x`, shape `[N, 1]`.
    pub fn input_gradient_norm<B, D>(
        &self,
        critic: &D,
        inputs: Tensor<B, 4>,
        scores: Tensor<B, 2>,
    ) -> Tensor<B, 2>
    where
        B: AutodiffBackend,
        D: AutodiffModule<B> + Critic<B>,
    {
        let dims = inputs.dims();
        let [batch_size, channels, height, width] = dims;

        let probe = inputs.clone().detach().require_grad();
        let grads = critic
            .clone()
            .no_grad()
            .score(probe.clone())
            .sum()
            .backward();
        let input_grad = probe
            .grad(&grads)
            .unwrap_or_else(|| Tensor::zeros(dims, &inputs.device()))
            .reshape([batch_size, channels * height * width]);

        let norm = input_grad.clone().powf_scalar(2.0).sum_dim(1).sqrt();
        let direction = (input_grad / norm.clone().add_scalar(DIRECTION_EPS))
            .reshape([batch_size, channels, height, width]);

        let step = self.config.probe_step;
        let shifted = critic.score(inputs + Tensor::from_inner(direction).mul_scalar(step));
        let surrogate = (shifted - scores).div_scalar(step);

        surrogate.clone() - surrogate.detach() + Tensor::from_inner(norm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::toy::{LinearCritic, QuadraticCritic, TestBackend};

    fn values<const D: usize>(tensor: Tensor<TestBackend, D>) -> Vec<f32> {
        tensor.into_data().to_vec().unwrap()
    }

    fn assert_close(actual: f32, expected: f32, tolerance: f32) {
        assert!(
            (actual - expected).abs() <= tolerance * expected.abs().max(1.0),
            "expected {expected}, got {actual}"
        );
    }

    fn penalty(k: f64, p: f64) -> WassersteinDivPenalty {
        WassersteinDivPenalty::new(PenaltyConfig {
            k,
            p,
            probe_step: 1e-3,
        })
    }

    #[test]
    fn test_linear_critic_penalty_value() {
        let device = Default::default();
        // w = [1.2, 1.6], |w| = 2, so every sample has gradient norm 2.
        let critic = LinearCritic::<TestBackend>::new([1.2, 1.6], &device);
        let real = Tensor::<TestBackend, 4>::from_floats([[[[0.5, -1.0]]], [[[2.0, 0.25]]]], &device);
        let fake = Tensor::<TestBackend, 4>::from_floats([[[[0.0, 0.0]]], [[[-0.3, 0.7]]]], &device);

        let real_scores = critic.score(real.clone());
        let fake_scores = critic.score(fake.clone());

        // k/2 * (2^2 + 2^2) = 8
        let gp = penalty(2.0, 2.0).compute(&critic, real.clone(), real_scores.clone(), fake.clone(), fake_scores.clone());
        assert_close(values(gp)[0], 8.0, 1e-5);

        // Default k = 2, p = 6: 1 * (2^6 + 2^6) = 128
        let gp = WassersteinDivPenalty::new(PenaltyConfig::default())
            .compute(&critic, real, real_scores, fake, fake_scores);
        assert_close(values(gp)[0], 128.0, 1e-5);
    }

    #[test]
    fn test_quadratic_critic_per_sample_norms() {
        let device = Default::default();
        // D(x) = 0.5 * |x|^2, so grad_x D = x and the norm is |x| per sample.
        let critic = QuadraticCritic::<TestBackend>::new(1.0, &device);
        let real = Tensor::<TestBackend, 4>::from_floats([[[[3.0, 4.0]]], [[[0.0, 1.0]]]], &device);
        let fake = Tensor::<TestBackend, 4>::from_floats([[[[1.0, 0.0]]], [[[0.0, 2.0]]]], &device);

        let gp = penalty(2.0, 2.0);
        let norms = values(gp.input_gradient_norm(&critic, real.clone(), critic.score(real.clone())));
        assert_close(norms[0], 5.0, 1e-5);
        assert_close(norms[1], 1.0, 1e-5);

        // mean(25 + 1, 1 + 4) with k/2 = 1: (26 + 5) / 2 = 15.5
        let value = gp.compute(
            &critic,
            real.clone(),
            critic.score(real),
            fake.clone(),
            critic.score(fake),
        );
        assert_close(values(value)[0], 15.5, 1e-4);
    }

    #[test]
    fn test_penalty_gradient_reaches_critic_weights() {
        let device = Default::default();
        let critic = LinearCritic::<TestBackend>::new([1.2, 1.6], &device);
        let real = Tensor::<TestBackend, 4>::from_floats([[[[0.1, 0.2]]], [[[0.3, -0.4]]]], &device);
        let fake = Tensor::<TestBackend, 4>::from_floats([[[[-0.2, 0.05]]], [[[0.0, 0.3]]]], &device);

        let gp = penalty(2.0, 2.0).compute(
            &critic,
            real.clone(),
            critic.score(real),
            fake.clone(),
            critic.score(fake),
        );
        let grads = gp.backward();
        let weight_grad: Vec<f32> = critic
            .weight
            .val()
            .grad(&grads)
            .expect("penalty must produce a weight gradient")
            .into_data()
            .to_vec()
            .unwrap();

        // d/dw k*|w|^p = k * p * |w|^(p-2) * w = 4 * [1.2, 1.6]
        assert_close(weight_grad[0], 4.8, 1e-2);
        assert_close(weight_grad[1], 6.4, 1e-2);
    }

    #[test]
    fn test_input_independent_critic_has_zero_penalty() {
        let device = Default::default();
        let critic = LinearCritic::<TestBackend>::new([0.0, 0.0], &device);
        let images = Tensor::<TestBackend, 4>::from_floats([[[[1.0, 2.0]]]], &device);

        let gp = penalty(2.0, 6.0).compute(
            &critic,
            images.clone(),
            critic.score(images.clone()),
            images.clone(),
            critic.score(images),
        );
        let value = values(gp)[0];
        assert!(value.is_finite());
        assert!(value.abs() < 1e-6);
    }
}
