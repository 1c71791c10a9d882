//! Logsift core: shared errors and configuration loading.
//!
//! This crate provides the foundational types used across all logsift crates.
//! It has no internal logsift dependencies and no index-engine dependency.
//!
//! # Modules
//!
//! - [`error`]: Error types and Result alias
//! - [`config`]: TOML configuration loading and path expansion

pub mod config;
pub mod error;

// Re-export key types at crate root for convenience
pub use error::{Error, Result};
