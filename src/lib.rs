//! # WGAN-div
//!
//! Trains a DCGAN-style generator/discriminator pair with the Wasserstein
//! divergence objective on the Burn ML framework.
//!
//! ## Modules
//!
//! - [`model`]: Generator, discriminator, and the optimizer builder
//! - [`training`]: Gradient penalty, adversarial loop, training state, sinks
//! - [`data`]: Image-folder and MNIST datasets, batcher, loader
//! - [`sample`]: PNG sample grids
//! - [`checkpoint`]: Model persistence and versioning
//! - [`config`]: TOML configuration loading and validation
//! - [`logging`]: `tracing` subscriber setup
//! - [`error`]: Structured error types

#![recursion_limit = "256"]

pub mod checkpoint;
pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod model;
pub mod sample;
pub mod training;
