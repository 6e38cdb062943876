// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Installation parameters.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConverterError;
use crate::types::{require_valid_address, Address, MAX_CONVERSION_FEE};

/// Reserve defined at installation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialReserve {
    pub token: Address,
    pub weight: u32,
}

/// Everything fixed when a converter is installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConverterConfig {
    /// The converter's own identity.
    pub address: Address,
    /// Flexible token governed by the converter.
    pub token: Address,
    /// Score registry used to resolve the network and its own successor.
    pub registry: Address,
    pub owner: Address,
    /// Lifetime fee ceiling in ppm.
    #[serde(default)]
    pub max_conversion_fee: u32,
    #[serde(default)]
    pub initial_reserve: Option<InitialReserve>,
}

impl ConverterConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConverterError> {
        require_valid_address(&self.address)?;
        require_valid_address(&self.token)?;
        require_valid_address(&self.registry)?;
        require_valid_address(&self.owner)?;
        if self.max_conversion_fee > MAX_CONVERSION_FEE {
            return Err(ConverterError::InvalidFee(self.max_conversion_fee));
        }
        Ok(())
    }
}

/// Errors loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(#[from] ConverterError),
}
