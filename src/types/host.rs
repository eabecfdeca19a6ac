// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)

//! Host identity and execution context.

use serde::{Deserialize, Serialize};

use super::{LicenseInfo, Platform};

/// The host a script or profile is being prepared for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInfo {
    /// Fleet host ID.
    pub id: u64,
    /// Hardware UUID.
    pub uuid: String,
    /// Hardware serial number.
    pub hardware_serial: String,
    /// Host platform, when known.
    #[serde(default)]
    pub platform: Option<Platform>,
}

impl HostInfo {
    /// Create a host with the given UUID and serial.
    pub fn new(id: u64, uuid: impl Into<String>, hardware_serial: impl Into<String>) -> Self {
        Self {
            id,
            uuid: uuid.into(),
            hardware_serial: hardware_serial.into(),
            platform: None,
        }
    }
}

/// Identity provider data about the host's end user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostEndUser {
    /// IdP user name, usually an email address.
    pub idp_username: String,
    /// IdP email address.
    #[serde(default)]
    pub idp_email: String,
    /// IdP group names.
    #[serde(default)]
    pub idp_groups: Vec<String>,
    /// IdP department.
    #[serde(default)]
    pub idp_department: String,
}

impl HostEndUser {
    /// Local part of the IdP user name (text before the first `@`).
    pub fn idp_username_local_part(&self) -> &str {
        match self.idp_username.split_once('@') {
            Some((local, _)) => local,
            None => &self.idp_username,
        }
    }
}

/// Per-call context supplied by the script execution or profile delivery caller.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    /// Host being targeted; substitution fails without it.
    pub host: Option<HostInfo>,
    /// License of the Fleet deployment.
    pub license: Option<LicenseInfo>,
}

impl ExecutionContext {
    /// Create a context for the given host and license.
    pub fn new(host: HostInfo, license: LicenseInfo) -> Self {
        Self {
            host: Some(host),
            license: Some(license),
        }
    }

    /// Whether the deployment has a premium license.
    pub fn is_premium(&self) -> bool {
        self.license.as_ref().is_some_and(LicenseInfo::is_premium)
    }
}
