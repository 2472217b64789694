// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Driver configuration.
//!
//! Sources in priority order (lowest to highest):
//! 1. Code defaults
//! 2. System config file at `/etc/ncclsim/driver.toml`
//! 3. TOML file from `--config` or the `NCCLSIM_DRIVER_CONFIG` environment variable
//! 4. Environment variables (`NCCLSIM_DRIVER_*`, `NCCLSIM_DRIVER_PACING_*`)
//! 5. Programmatic overrides merged by the caller (command line flags)

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment, Provider,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::resolver::DEFAULT_LIBRARY;

pub const CONFIG_PATH_ENV: &str = "NCCLSIM_DRIVER_CONFIG";
pub const SYSTEM_CONFIG_PATH: &str = "/etc/ncclsim/driver.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to extract configuration: {0}")]
    Extraction(#[from] Box<figment::Error>),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] ValidationErrors),
}

/// Top-level driver configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_rank"))]
pub struct DriverConfig {
    /// Library to load when none is given on the command line.
    pub library: PathBuf,

    /// Group size of the shared communicator.
    #[validate(range(min = 1))]
    pub world_size: i32,

    /// Rank of this process in the shared communicator.
    #[validate(range(min = 0))]
    pub rank: i32,

    #[validate(nested)]
    #[serde(default)]
    pub pacing: PacingConfig,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            library: PathBuf::from(".").join(DEFAULT_LIBRARY),
            world_size: 8,
            rank: 0,
            pacing: PacingConfig::default(),
        }
    }
}

/// Scaling of the sleeps scenarios insert between calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PacingConfig {
    /// 1.0 keeps the nominal spacing, 0.0 removes it.
    #[validate(custom(function = "validate_finite"))]
    #[validate(range(min = 0.0, max = 100.0))]
    pub scale: f64,
}

impl PacingConfig {
    pub fn scaled(&self, nominal: Duration) -> Duration {
        nominal.mul_f64(self.scale)
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self { scale: 1.0 }
    }
}

// NaN slips through range checks since every comparison with it is false.
fn validate_finite(value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::new("not_finite"));
    }
    Ok(())
}

fn validate_rank(config: &DriverConfig) -> Result<(), ValidationError> {
    if config.rank >= config.world_size {
        let mut error = ValidationError::new("rank_out_of_range");
        error.message = Some(
            format!(
                "rank ({}) must be less than world_size ({})",
                config.rank, config.world_size
            )
            .into(),
        );
        return Err(error);
    }
    Ok(())
}

impl DriverConfig {
    /// Figment with every source merged, reading the config file path from
    /// the environment.
    pub fn figment() -> Figment {
        Self::figment_for(None)
    }

    /// Figment with every source merged; `config_file` takes the place of
    /// `NCCLSIM_DRIVER_CONFIG` when given.
    pub fn figment_for(config_file: Option<&Path>) -> Figment {
        let config_path = config_file
            .map(Path::to_path_buf)
            .unwrap_or_else(|| std::env::var(CONFIG_PATH_ENV).unwrap_or_default().into());

        Figment::new()
            .merge(Serialized::defaults(DriverConfig::default()))
            .merge(Toml::file(SYSTEM_CONFIG_PATH))
            .merge(Toml::file(&config_path))
            // NCCLSIM_DRIVER_LIBRARY, NCCLSIM_DRIVER_WORLD_SIZE, NCCLSIM_DRIVER_RANK
            .merge(Env::prefixed("NCCLSIM_DRIVER_").only(&["library", "world_size", "rank"]))
            // NCCLSIM_DRIVER_PACING_SCALE
            .merge(
                Env::prefixed("NCCLSIM_DRIVER_PACING_")
                    .map(|k| format!("pacing.{}", k.as_str().to_lowercase()).into()),
            )
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::extract_from(Self::figment())
    }

    /// Extract and validate configuration from any provider.
    ///
    /// ```rust,ignore
    /// let config = DriverConfig::extract_from(
    ///     DriverConfig::figment()
    ///         .merge(("world_size", 4))
    ///         .merge(("pacing.scale", 0.0)),
    /// )?;
    /// ```
    pub fn extract_from<T: Provider>(provider: T) -> Result<Self, ConfigError> {
        let config: Self = Figment::from(provider)
            .extract()
            .map_err(|e| ConfigError::Extraction(Box::new(e)))?;
        config.validate()?;
        Ok(config)
    }
}
