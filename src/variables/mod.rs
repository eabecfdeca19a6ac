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

//! Fleet variable catalogue, scanner and replacement helpers.
//!
//! Fleet variables are placeholders of the form `$FLEET_VAR_<NAME>` or
//! `${FLEET_VAR_<NAME>}`. Some names are fixed (`HOST_UUID`,
//! `SCEP_RENEWAL_ID`, ...); others are a fixed prefix followed by the name of
//! a configured certificate authority (`DIGICERT_DATA_<CA_NAME>`, ...).
//!
//! # Example
//!
//! ```
//! use fleetvars::variables::{self, FleetVariable};
//!
//! let found = variables::find("CN=$FLEET_VAR_HOST_UUID OU=${FLEET_VAR_DIGICERT_DATA_acme}");
//! let parsed: Vec<FleetVariable> = found.iter().map(|v| FleetVariable::parse(v)).collect();
//! assert!(parsed.contains(&FleetVariable::HostUuid));
//! assert!(parsed.contains(&FleetVariable::DigiCertData("acme".into())));
//! ```

mod replace;
mod scan;

pub use replace::{ContentKind, replace_exact_prefix_variable, replace_variable};
pub use scan::{contains_fleet_variables, find, find_keep_duplicates, validate_declaration_variables};

use crate::types::CaKind;

/// Prefix shared by every Fleet variable name.
pub const FLEET_VAR_PREFIX: &str = "FLEET_VAR_";

/// Host hardware UUID.
pub const HOST_UUID: &str = "HOST_UUID";
/// Host hardware serial number.
pub const HOST_HARDWARE_SERIAL: &str = "HOST_HARDWARE_SERIAL";
/// End user email from the identity provider.
pub const HOST_END_USER_EMAIL_IDP: &str = "HOST_END_USER_EMAIL_IDP";
/// End user IdP user name.
pub const HOST_END_USER_IDP_USERNAME: &str = "HOST_END_USER_IDP_USERNAME";
/// Local part of the end user IdP user name.
pub const HOST_END_USER_IDP_USERNAME_LOCAL_PART: &str = "HOST_END_USER_IDP_USERNAME_LOCAL_PART";
/// End user IdP groups.
pub const HOST_END_USER_IDP_GROUPS: &str = "HOST_END_USER_IDP_GROUPS";
/// End user IdP department.
pub const HOST_END_USER_IDP_DEPARTMENT: &str = "HOST_END_USER_IDP_DEPARTMENT";
/// One-time NDES challenge.
pub const NDES_SCEP_CHALLENGE: &str = "NDES_SCEP_CHALLENGE";
/// Fleet SCEP proxy URL for NDES.
pub const NDES_SCEP_PROXY_URL: &str = "NDES_SCEP_PROXY_URL";
/// Renewal correlation ID shared by all SCEP CA types.
pub const SCEP_RENEWAL_ID: &str = "SCEP_RENEWAL_ID";

/// DigiCert PKCS#12 data, suffixed with the CA name.
pub const DIGICERT_DATA_PREFIX: &str = "DIGICERT_DATA_";
/// DigiCert PKCS#12 password, suffixed with the CA name.
pub const DIGICERT_PASSWORD_PREFIX: &str = "DIGICERT_PASSWORD_";
/// Custom SCEP challenge, suffixed with the CA name.
pub const CUSTOM_SCEP_CHALLENGE_PREFIX: &str = "CUSTOM_SCEP_CHALLENGE_";
/// Custom SCEP proxy URL, suffixed with the CA name.
pub const CUSTOM_SCEP_PROXY_URL_PREFIX: &str = "CUSTOM_SCEP_PROXY_URL_";
/// Smallstep SCEP challenge, suffixed with the CA name.
pub const SMALLSTEP_SCEP_CHALLENGE_PREFIX: &str = "SMALLSTEP_SCEP_CHALLENGE_";
/// Smallstep SCEP proxy URL, suffixed with the CA name.
pub const SMALLSTEP_SCEP_PROXY_URL_PREFIX: &str = "SMALLSTEP_SCEP_PROXY_URL_";

/// Message used when the renewal ID appears without any URL/challenge variable.
pub const SCEP_RENEWAL_ID_WITHOUT_URL_CHALLENGE_MSG: &str = "Variable \"$FLEET_VAR_SCEP_RENEWAL_ID\" can't be used if variables for SCEP URL and challenge are not specified.";

/// Message used when an NDES profile is incomplete.
pub const NDES_VARIABLES_MISSING_MSG: &str = "SCEP profile for NDES certificate authority requires: $FLEET_VAR_NDES_SCEP_CHALLENGE, $FLEET_VAR_NDES_SCEP_PROXY_URL, and $FLEET_VAR_SCEP_RENEWAL_ID variables.";

/// A Fleet variable name, classified.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FleetVariable {
    /// `HOST_UUID`
    HostUuid,
    /// `HOST_HARDWARE_SERIAL`
    HostHardwareSerial,
    /// `HOST_END_USER_EMAIL_IDP`
    HostEndUserEmailIdp,
    /// `HOST_END_USER_IDP_USERNAME`
    HostEndUserIdpUsername,
    /// `HOST_END_USER_IDP_USERNAME_LOCAL_PART`
    HostEndUserIdpUsernameLocalPart,
    /// `HOST_END_USER_IDP_GROUPS`
    HostEndUserIdpGroups,
    /// `HOST_END_USER_IDP_DEPARTMENT`
    HostEndUserIdpDepartment,
    /// `NDES_SCEP_CHALLENGE`
    NdesScepChallenge,
    /// `NDES_SCEP_PROXY_URL`
    NdesScepProxyUrl,
    /// `SCEP_RENEWAL_ID`
    ScepRenewalId,
    /// `DIGICERT_DATA_<CA>`
    DigiCertData(String),
    /// `DIGICERT_PASSWORD_<CA>`
    DigiCertPassword(String),
    /// `CUSTOM_SCEP_CHALLENGE_<CA>`
    CustomScepChallenge(String),
    /// `CUSTOM_SCEP_PROXY_URL_<CA>`
    CustomScepProxyUrl(String),
    /// `SMALLSTEP_SCEP_CHALLENGE_<CA>`
    SmallstepScepChallenge(String),
    /// `SMALLSTEP_SCEP_PROXY_URL_<CA>`
    SmallstepScepProxyUrl(String),
    /// Anything else that looked like a Fleet variable.
    Unknown(String),
}

const PREFIXED: [(&str, fn(String) -> FleetVariable); 6] = [
    (DIGICERT_DATA_PREFIX, FleetVariable::DigiCertData),
    (DIGICERT_PASSWORD_PREFIX, FleetVariable::DigiCertPassword),
    (CUSTOM_SCEP_CHALLENGE_PREFIX, FleetVariable::CustomScepChallenge),
    (CUSTOM_SCEP_PROXY_URL_PREFIX, FleetVariable::CustomScepProxyUrl),
    (SMALLSTEP_SCEP_CHALLENGE_PREFIX, FleetVariable::SmallstepScepChallenge),
    (SMALLSTEP_SCEP_PROXY_URL_PREFIX, FleetVariable::SmallstepScepProxyUrl),
];

impl FleetVariable {
    /// Classify a variable name as returned by the scanner (without `FLEET_VAR_`).
    pub fn parse(name: &str) -> Self {
        match name {
            HOST_UUID => return Self::HostUuid,
            HOST_HARDWARE_SERIAL => return Self::HostHardwareSerial,
            HOST_END_USER_EMAIL_IDP => return Self::HostEndUserEmailIdp,
            HOST_END_USER_IDP_USERNAME => return Self::HostEndUserIdpUsername,
            HOST_END_USER_IDP_USERNAME_LOCAL_PART => return Self::HostEndUserIdpUsernameLocalPart,
            HOST_END_USER_IDP_GROUPS => return Self::HostEndUserIdpGroups,
            HOST_END_USER_IDP_DEPARTMENT => return Self::HostEndUserIdpDepartment,
            NDES_SCEP_CHALLENGE => return Self::NdesScepChallenge,
            NDES_SCEP_PROXY_URL => return Self::NdesScepProxyUrl,
            SCEP_RENEWAL_ID => return Self::ScepRenewalId,
            _ => {}
        }

        for (prefix, build) in PREFIXED {
            if let Some(ca_name) = name.strip_prefix(prefix) {
                return build(ca_name.to_string());
            }
        }

        Self::Unknown(name.to_string())
    }

    /// The variable name without the `FLEET_VAR_` prefix.
    pub fn name(&self) -> String {
        match self {
            Self::HostUuid => HOST_UUID.to_string(),
            Self::HostHardwareSerial => HOST_HARDWARE_SERIAL.to_string(),
            Self::HostEndUserEmailIdp => HOST_END_USER_EMAIL_IDP.to_string(),
            Self::HostEndUserIdpUsername => HOST_END_USER_IDP_USERNAME.to_string(),
            Self::HostEndUserIdpUsernameLocalPart => HOST_END_USER_IDP_USERNAME_LOCAL_PART.to_string(),
            Self::HostEndUserIdpGroups => HOST_END_USER_IDP_GROUPS.to_string(),
            Self::HostEndUserIdpDepartment => HOST_END_USER_IDP_DEPARTMENT.to_string(),
            Self::NdesScepChallenge => NDES_SCEP_CHALLENGE.to_string(),
            Self::NdesScepProxyUrl => NDES_SCEP_PROXY_URL.to_string(),
            Self::ScepRenewalId => SCEP_RENEWAL_ID.to_string(),
            Self::DigiCertData(ca) => format!("{DIGICERT_DATA_PREFIX}{ca}"),
            Self::DigiCertPassword(ca) => format!("{DIGICERT_PASSWORD_PREFIX}{ca}"),
            Self::CustomScepChallenge(ca) => format!("{CUSTOM_SCEP_CHALLENGE_PREFIX}{ca}"),
            Self::CustomScepProxyUrl(ca) => format!("{CUSTOM_SCEP_PROXY_URL_PREFIX}{ca}"),
            Self::SmallstepScepChallenge(ca) => format!("{SMALLSTEP_SCEP_CHALLENGE_PREFIX}{ca}"),
            Self::SmallstepScepProxyUrl(ca) => format!("{SMALLSTEP_SCEP_PROXY_URL_PREFIX}{ca}"),
            Self::Unknown(name) => name.clone(),
        }
    }

    /// The placeholder as written in content, e.g. `$FLEET_VAR_HOST_UUID`.
    pub fn placeholder(&self) -> String {
        format!("${FLEET_VAR_PREFIX}{}", self.name())
    }

    /// CA name suffix of a prefixed variable.
    pub fn ca_name(&self) -> Option<&str> {
        match self {
            Self::DigiCertData(ca)
            | Self::DigiCertPassword(ca)
            | Self::CustomScepChallenge(ca)
            | Self::CustomScepProxyUrl(ca)
            | Self::SmallstepScepChallenge(ca)
            | Self::SmallstepScepProxyUrl(ca) => Some(ca),
            _ => None,
        }
    }

    /// Prefix of a CA-name-suffixed variable.
    pub fn prefix(&self) -> Option<&'static str> {
        match self {
            Self::DigiCertData(_) => Some(DIGICERT_DATA_PREFIX),
            Self::DigiCertPassword(_) => Some(DIGICERT_PASSWORD_PREFIX),
            Self::CustomScepChallenge(_) => Some(CUSTOM_SCEP_CHALLENGE_PREFIX),
            Self::CustomScepProxyUrl(_) => Some(CUSTOM_SCEP_PROXY_URL_PREFIX),
            Self::SmallstepScepChallenge(_) => Some(SMALLSTEP_SCEP_CHALLENGE_PREFIX),
            Self::SmallstepScepProxyUrl(_) => Some(SMALLSTEP_SCEP_PROXY_URL_PREFIX),
            _ => None,
        }
    }

    /// Certificate authority type backing this variable.
    ///
    /// The renewal ID is shared by all SCEP types and returns `None`.
    pub fn ca_kind(&self) -> Option<CaKind> {
        match self {
            Self::DigiCertData(_) | Self::DigiCertPassword(_) => Some(CaKind::DigiCert),
            Self::CustomScepChallenge(_) | Self::CustomScepProxyUrl(_) => {
                Some(CaKind::CustomScepProxy)
            }
            Self::SmallstepScepChallenge(_) | Self::SmallstepScepProxyUrl(_) => {
                Some(CaKind::Smallstep)
            }
            Self::NdesScepChallenge | Self::NdesScepProxyUrl => Some(CaKind::NdesScepProxy),
            _ => None,
        }
    }

    /// Whether the value comes from the host's IdP end user record.
    pub fn is_end_user_idp(&self) -> bool {
        matches!(
            self,
            Self::HostEndUserEmailIdp
                | Self::HostEndUserIdpUsername
                | Self::HostEndUserIdpUsernameLocalPart
                | Self::HostEndUserIdpGroups
                | Self::HostEndUserIdpDepartment
        )
    }
}

impl std::fmt::Display for FleetVariable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{FLEET_VAR_PREFIX}{}", self.name())
    }
}
