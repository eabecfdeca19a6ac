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

//! Domain types consumed by the validator and the substitution engine.
//!
//! This module provides the application configuration, certificate authority
//! records, license information and host identity types.

mod ca;
mod host;

pub use ca::{
    CaAssetKind, CaConfigAsset, CaKind, CustomScepProxyCa, DigiCertCa, DigiCertCertificate,
    GroupedCertificateAuthorities, NdesScepProxyCa, SmallstepScepProxyCa,
};
pub use host::{ExecutionContext, HostEndUser, HostInfo};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{FleetVarError, Result};

/// Target platform of a profile or script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// macOS, iOS and iPadOS.
    Apple,
    /// Windows.
    Windows,
}

impl Platform {
    /// Parse from string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "apple" | "darwin" | "macos" | "ios" | "ipados" => Some(Self::Apple),
            "windows" => Some(Self::Windows),
            _ => None,
        }
    }

    /// Whether SCEP profiles on this platform must carry a renewal ID.
    pub fn supports_scep_renewal(&self) -> bool {
        matches!(self, Self::Apple)
    }
}

/// License tier of the deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseTier {
    /// Free tier.
    #[default]
    Free,
    /// Premium tier.
    Premium,
}

/// License information of the deployment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseInfo {
    /// License tier.
    pub tier: LicenseTier,
}

impl LicenseInfo {
    /// A premium license.
    pub fn premium() -> Self {
        Self {
            tier: LicenseTier::Premium,
        }
    }

    /// A free license.
    pub fn free() -> Self {
        Self {
            tier: LicenseTier::Free,
        }
    }

    /// Whether this is a premium license.
    pub fn is_premium(&self) -> bool {
        self.tier == LicenseTier::Premium
    }
}

/// Certificate authority integrations held by the application config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Integrations {
    /// DigiCert integrations.
    #[serde(default)]
    pub digicert: Vec<DigiCertCa>,
    /// Custom SCEP proxy integrations.
    #[serde(default)]
    pub custom_scep_proxy: Vec<CustomScepProxyCa>,
    /// The NDES integration, if configured.
    #[serde(default)]
    pub ndes_scep_proxy: Option<NdesScepProxyCa>,
    /// Smallstep integrations.
    #[serde(default)]
    pub smallstep: Vec<SmallstepScepProxyCa>,
}

/// Global application configuration as read from the datastore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Public Fleet server URL.
    pub server_url: Url,
    /// Dedicated MDM URL, when it differs from the server URL.
    #[serde(default)]
    pub mdm_url: Option<Url>,
    /// Certificate authority integrations.
    #[serde(default)]
    pub integrations: Integrations,
}

impl AppConfig {
    /// Create a config with the given server URL and no integrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn new(server_url: &str) -> Result<Self> {
        Ok(Self {
            server_url: Url::parse(server_url)?,
            mdm_url: None,
            integrations: Integrations::default(),
        })
    }

    /// URL devices use to reach MDM endpoints, without a trailing slash.
    pub fn mdm_url(&self) -> String {
        let url = self.mdm_url.as_ref().unwrap_or(&self.server_url);
        url.as_str().trim_end_matches('/').to_string()
    }

    /// Group the configured integrations by CA type.
    pub fn grouped_certificate_authorities(&self) -> GroupedCertificateAuthorities {
        GroupedCertificateAuthorities {
            digicert: self.integrations.digicert.clone(),
            custom_scep_proxy: self.integrations.custom_scep_proxy.clone(),
            ndes_scep: self.integrations.ndes_scep_proxy.clone(),
            smallstep: self.integrations.smallstep.clone(),
        }
    }

    /// Parse an application config from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| FleetVarError::config(format!("Invalid app config: {e}")))
    }
}
