//! Core library for `Catalog`.
//!
//! Contains the secret-injection deploy pipeline: access token validation,
//! job batch decoding, secret path derivation, environment merge, and the
//! per-job submission loop with partial-failure aggregation. The secret store
//! and the orchestrator are reached only through the [`SecretStore`] and
//! [`Orchestrator`] traits, so this crate knows nothing about Vault or
//! Marathon wire formats.
//!
//! [`SecretStore`]: secret::SecretStore
//! [`Orchestrator`]: orchestrator::Orchestrator

pub mod env;
pub mod error;
pub mod job;
pub mod memory;
pub mod orchestrator;
pub mod pipeline;
pub mod secret;
pub mod token;
