//! TOML configuration loading.
//!
//! Config structs across logsift derive `Deserialize` with per-field serde
//! defaults, so a partial (or empty) file is always valid. These helpers
//! only take care of reading, parsing and error mapping.
//!
//! # Usage
//!
//! ```rust
//! use logsift_core::config::from_toml_str;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Settings {
//!     #[serde(default)]
//!     name: String,
//! }
//!
//! let settings: Settings = from_toml_str("name = \"demo\"").unwrap();
//! assert_eq!(settings.name, "demo");
//! ```

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Parse a configuration value from a TOML string.
pub fn from_toml_str<T: DeserializeOwned>(content: &str) -> Result<T> {
    toml::from_str(content).map_err(|e| Error::config(format!("Invalid TOML: {e}")))
}

/// Read and parse a TOML configuration file.
///
/// The path is expanded with [`expand_path`] first.
pub fn from_toml_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = expand_path(&path.as_ref().to_string_lossy())?;
    let content = std::fs::read_to_string(&path).map_err(|e| Error::io_with_path(e, &path))?;

    log::debug!("Loaded configuration from {}", path.display());

    toml::from_str(&content)
        .map_err(|e| Error::config(format!("Failed to parse {}: {e}", path.display())))
}

/// Expand `~` and `$VAR` / `${VAR}` references in a configured path.
pub fn expand_path(raw: &str) -> Result<PathBuf> {
    shellexpand::full(raw)
        .map(|expanded| PathBuf::from(expanded.as_ref()))
        .map_err(|e| Error::config(format!("Cannot expand path `{raw}`: {e}")))
}

// ============================================================================
// Tests
// ============================================================================
