//! Configuration of the settings client.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support
//! - Environment variable overrides
//! - Component-wise validation
mod client;
mod discovery;
pub use client::*;
pub use discovery::*;


use std::env;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Prefix of environment variables overriding configuration values,
/// e.g. `MINICONF__CLIENT__REQUEST_TIMEOUT_IN_MS=500`.
pub const ENV_PREFIX: &str = "MINICONF";

/// Main configuration container
///
/// Combines all component configurations with hierarchical override support:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables (highest priority)
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct MiniconfConfig {
    /// Request/response behaviour of the client
    #[serde(default)]
    pub client: ClientConfig,
    /// Device discovery window
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

impl MiniconfConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Sources are merged in the following order (later sources override earlier):
    /// 1. Type defaults
    /// 2. Configuration file from `CONFIG_PATH` environment variable (if set)
    /// 3. Environment variables with `MINICONF__` prefix
    ///
    /// Callers must call [`validate()`](Self::validate) before use.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("MINICONF__DISCOVERY__REL_TIMEOUT", "5.0");
    /// let cfg = MiniconfConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(environment());

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies additional overrides from a file without validation.
    ///
    /// Merging order (later sources override earlier):
    /// 1. Current configuration values
    /// 2. New configuration file
    /// 3. Latest environment variables
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(environment())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates every component and returns the validated instance.
    pub fn validate(self) -> Result<Self> {
        self.client.validate()?;
        self.discovery.validate()?;
        Ok(self)
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
}
