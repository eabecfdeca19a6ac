// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Configuration for the Fleet variable processor.
//!
//! A [`ProcessorConfig`] is built in code with [`ProcessorConfig::builder`]
//! or loaded from a TOML file:
//!
//! ```toml
//! scep_proxy_path = "/mdm/scep/proxy/"
//! request_timeout_seconds = 30
//! ndes_timeout_seconds = 30
//! max_value_chars_in_error = 100
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FleetVarError, Result};

/// Default path of the SCEP proxy endpoint on the MDM server.
pub const DEFAULT_SCEP_PROXY_PATH: &str = "/mdm/scep/proxy/";

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_MAX_VALUE_CHARS_IN_ERROR: usize = 100;

/// Configuration for a [`FleetVarProcessor`](crate::FleetVarProcessor).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorConfig {
    /// Path of the SCEP proxy endpoint, appended to the MDM URL.
    pub scep_proxy_path: String,

    /// Deadline applied to every datastore and CA provider call.
    pub request_timeout: Duration,

    /// HTTP timeout of the NDES and Smallstep challenge client.
    pub ndes_timeout: Duration,

    /// Profile values quoted in error messages are cut to this many characters.
    pub max_value_chars_in_error: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            scep_proxy_path: DEFAULT_SCEP_PROXY_PATH.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
            ndes_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
            max_value_chars_in_error: DEFAULT_MAX_VALUE_CHARS_IN_ERROR,
        }
    }
}

impl ProcessorConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ProcessorConfigBuilder {
        ProcessorConfigBuilder::new()
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid, contains unknown keys, or
    /// fails validation.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let file: ProcessorConfigFile = toml::from_str(toml_str)
            .map_err(|e| FleetVarError::config(format!("Invalid TOML: {e}")))?;
        file.try_into()
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| FleetVarError::config(format!("Failed to read {}: {e}", path.display())))?;
        Self::from_toml(&contents)
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(&ProcessorConfigFile::from(self))
            .map_err(|e| FleetVarError::config(format!("TOML serialize: {e}")))
    }

    /// Check the configuration for invalid values.
    ///
    /// # Errors
    ///
    /// Returns an error if a timeout is zero or the proxy path is not an
    /// absolute path ending in `/`.
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout.is_zero() {
            return Err(FleetVarError::config("request_timeout must be greater than zero"));
        }
        if self.ndes_timeout.is_zero() {
            return Err(FleetVarError::config("ndes_timeout must be greater than zero"));
        }
        if !self.scep_proxy_path.starts_with('/') || !self.scep_proxy_path.ends_with('/') {
            return Err(FleetVarError::config(format!(
                "scep_proxy_path must start and end with '/': {}",
                self.scep_proxy_path
            )));
        }
        Ok(())
    }
}

/// On-disk form of [`ProcessorConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProcessorConfigFile {
    #[serde(default = "default_scep_proxy_path")]
    scep_proxy_path: String,

    #[serde(default = "default_timeout")]
    request_timeout_seconds: u64,

    #[serde(default = "default_timeout")]
    ndes_timeout_seconds: u64,

    #[serde(default = "default_max_value_chars_in_error")]
    max_value_chars_in_error: usize,
}

fn default_scep_proxy_path() -> String {
    DEFAULT_SCEP_PROXY_PATH.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

fn default_max_value_chars_in_error() -> usize {
    DEFAULT_MAX_VALUE_CHARS_IN_ERROR
}

impl TryFrom<ProcessorConfigFile> for ProcessorConfig {
    type Error = FleetVarError;

    fn try_from(file: ProcessorConfigFile) -> Result<Self> {
        let config = Self {
            scep_proxy_path: file.scep_proxy_path,
            request_timeout: Duration::from_secs(file.request_timeout_seconds),
            ndes_timeout: Duration::from_secs(file.ndes_timeout_seconds),
            max_value_chars_in_error: file.max_value_chars_in_error,
        };
        config.validate()?;
        Ok(config)
    }
}

impl From<&ProcessorConfig> for ProcessorConfigFile {
    fn from(config: &ProcessorConfig) -> Self {
        Self {
            scep_proxy_path: config.scep_proxy_path.clone(),
            request_timeout_seconds: config.request_timeout.as_secs(),
            ndes_timeout_seconds: config.ndes_timeout.as_secs(),
            max_value_chars_in_error: config.max_value_chars_in_error,
        }
    }
}

/// Builder for [`ProcessorConfig`].
#[derive(Debug, Default)]
pub struct ProcessorConfigBuilder {
    scep_proxy_path: Option<String>,
    request_timeout: Option<Duration>,
    ndes_timeout: Option<Duration>,
    max_value_chars_in_error: Option<usize>,
}

impl ProcessorConfigBuilder {
    /// Create a new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the SCEP proxy path.
    pub fn scep_proxy_path(mut self, path: impl Into<String>) -> Self {
        self.scep_proxy_path = Some(path.into());
        self
    }

    /// Set the deadline for datastore and CA provider calls.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Set the HTTP timeout of the challenge client.
    pub fn ndes_timeout(mut self, timeout: Duration) -> Self {
        self.ndes_timeout = Some(timeout);
        self
    }

    /// Set how many characters of a profile value are quoted in errors.
    pub fn max_value_chars_in_error(mut self, max: usize) -> Self {
        self.max_value_chars_in_error = Some(max);
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting configuration is invalid.
    pub fn build(self) -> Result<ProcessorConfig> {
        let defaults = ProcessorConfig::default();
        let config = ProcessorConfig {
            scep_proxy_path: self.scep_proxy_path.unwrap_or(defaults.scep_proxy_path),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            ndes_timeout: self.ndes_timeout.unwrap_or(defaults.ndes_timeout),
            max_value_chars_in_error: self
                .max_value_chars_in_error
                .unwrap_or(defaults.max_value_chars_in_error),
        };
        config.validate()?;
        Ok(config)
    }
}
