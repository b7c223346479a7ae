//! Configuration and plan assembly for the `escrow-gas` binary.
//!
//! - [`config`] - TOML configuration with environment expansion
//! - [`plan`] - Wall-clock derivation of deadlines and the experiment plan
//! - [`error`] - Binary error types

pub mod config;
pub mod error;
pub mod plan;
