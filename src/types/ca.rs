// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)

//! Certificate authority integration records.
//!
//! Stored configuration never carries secrets: API tokens, challenges and
//! passwords live in the config-asset store and are copied into these
//! records only for the duration of a single substitution pass.

use serde::{Deserialize, Serialize};

/// The four certificate authority integration types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaKind {
    /// DigiCert Trust Lifecycle Manager.
    DigiCert,
    /// Any SCEP server reached through the Fleet SCEP proxy.
    CustomScepProxy,
    /// Microsoft NDES.
    NdesScepProxy,
    /// Smallstep SCEP with webhook challenges.
    Smallstep,
}

impl CaKind {
    /// Human-readable name used in error messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::DigiCert => "DigiCert",
            Self::CustomScepProxy => "custom SCEP",
            Self::NdesScepProxy => "NDES",
            Self::Smallstep => "Smallstep",
        }
    }
}

impl std::fmt::Display for CaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// DigiCert CA integration.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigiCertCa {
    /// Unique CA name referenced by `DIGICERT_*_<name>` variables.
    pub name: String,
    /// DigiCert instance URL.
    pub url: String,
    /// API token, filled from the config-asset store.
    #[serde(default, skip_serializing)]
    pub api_token: String,
    /// Certificate profile GUID.
    pub profile_id: String,
    /// Subject CN template; may contain Fleet variables.
    pub certificate_common_name: String,
    /// UPN SAN templates; may contain Fleet variables.
    #[serde(default)]
    pub certificate_user_principal_names: Vec<String>,
    /// Seat ID template; may contain Fleet variables.
    pub certificate_seat_id: String,
}

impl std::fmt::Debug for DigiCertCa {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigiCertCa")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("api_token", &!self.api_token.is_empty())
            .field("profile_id", &self.profile_id)
            .field("certificate_common_name", &self.certificate_common_name)
            .field(
                "certificate_user_principal_names",
                &self.certificate_user_principal_names,
            )
            .field("certificate_seat_id", &self.certificate_seat_id)
            .finish()
    }
}

/// Custom SCEP server proxied by Fleet.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomScepProxyCa {
    /// Unique CA name referenced by `CUSTOM_SCEP_*_<name>` variables.
    pub name: String,
    /// Upstream SCEP URL.
    pub url: String,
    /// Static challenge, filled from the config-asset store.
    #[serde(default, skip_serializing)]
    pub challenge: String,
}

impl std::fmt::Debug for CustomScepProxyCa {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomScepProxyCa")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("challenge", &!self.challenge.is_empty())
            .finish()
    }
}

/// Microsoft NDES SCEP server. There is at most one per deployment.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NdesScepProxyCa {
    /// NDES SCEP URL.
    pub url: String,
    /// NDES admin page that hands out one-time challenges.
    pub admin_url: String,
    /// Service account user name.
    pub username: String,
    /// Service account password, filled from the config-asset store.
    #[serde(default, skip_serializing)]
    pub password: String,
}

impl std::fmt::Debug for NdesScepProxyCa {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NdesScepProxyCa")
            .field("url", &self.url)
            .field("admin_url", &self.admin_url)
            .field("username", &self.username)
            .field("password", &!self.password.is_empty())
            .finish()
    }
}

/// Smallstep SCEP server with webhook-issued challenges.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmallstepScepProxyCa {
    /// Unique CA name referenced by `SMALLSTEP_SCEP_*_<name>` variables.
    pub name: String,
    /// Smallstep SCEP URL.
    pub url: String,
    /// Webhook endpoint returning a challenge.
    pub challenge_url: String,
    /// Webhook user name.
    pub username: String,
    /// Webhook password, filled from the config-asset store.
    #[serde(default, skip_serializing)]
    pub password: String,
}

impl std::fmt::Debug for SmallstepScepProxyCa {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmallstepScepProxyCa")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("challenge_url", &self.challenge_url)
            .field("username", &self.username)
            .field("password", &!self.password.is_empty())
            .finish()
    }
}

/// Configured CAs grouped by type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupedCertificateAuthorities {
    /// DigiCert integrations.
    #[serde(default)]
    pub digicert: Vec<DigiCertCa>,
    /// Custom SCEP proxy integrations.
    #[serde(default)]
    pub custom_scep_proxy: Vec<CustomScepProxyCa>,
    /// The NDES integration, if any.
    #[serde(default)]
    pub ndes_scep: Option<NdesScepProxyCa>,
    /// Smallstep integrations.
    #[serde(default)]
    pub smallstep: Vec<SmallstepScepProxyCa>,
}

impl GroupedCertificateAuthorities {
    /// Look up a DigiCert CA by name.
    pub fn digicert(&self, name: &str) -> Option<&DigiCertCa> {
        self.digicert.iter().find(|ca| ca.name == name)
    }

    /// Look up a custom SCEP CA by name.
    pub fn custom_scep(&self, name: &str) -> Option<&CustomScepProxyCa> {
        self.custom_scep_proxy.iter().find(|ca| ca.name == name)
    }

    /// Look up a Smallstep CA by name.
    pub fn smallstep(&self, name: &str) -> Option<&SmallstepScepProxyCa> {
        self.smallstep.iter().find(|ca| ca.name == name)
    }

    /// Whether a CA of the given kind and name exists.
    ///
    /// NDES has no name dimension; any name matches when NDES is configured.
    pub fn contains(&self, kind: CaKind, name: &str) -> bool {
        match kind {
            CaKind::DigiCert => self.digicert(name).is_some(),
            CaKind::CustomScepProxy => self.custom_scep(name).is_some(),
            CaKind::NdesScepProxy => self.ndes_scep.is_some(),
            CaKind::Smallstep => self.smallstep(name).is_some(),
        }
    }
}

/// Kind of secret stored for a CA in the config-asset store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaAssetKind {
    /// DigiCert API token.
    DigiCertApiToken,
    /// Static custom SCEP challenge.
    CustomScepChallenge,
    /// NDES service account password.
    NdesPassword,
    /// Smallstep webhook password.
    SmallstepPassword,
}

/// A secret value stored for a CA.
#[derive(Clone, PartialEq, Eq)]
pub struct CaConfigAsset {
    /// Owning CA name (`NDES` for the NDES integration).
    pub name: String,
    /// Asset kind.
    pub kind: CaAssetKind,
    /// Secret bytes.
    pub value: Vec<u8>,
}

impl CaConfigAsset {
    /// Create a new asset.
    pub fn new(name: impl Into<String>, kind: CaAssetKind, value: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            kind,
            value: value.into(),
        }
    }

    /// Secret value as text.
    pub fn value_string(&self) -> String {
        String::from_utf8_lossy(&self.value).into_owned()
    }
}

impl std::fmt::Debug for CaConfigAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaConfigAsset")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("value_len", &self.value.len())
            .finish()
    }
}

/// Certificate issued by DigiCert, packaged as PKCS#12.
#[derive(Clone, PartialEq, Eq)]
pub struct DigiCertCertificate {
    /// PKCS#12 blob.
    pub pfx_data: Vec<u8>,
    /// Password protecting the PKCS#12 blob.
    pub password: String,
    /// Certificate serial number.
    pub serial_number: String,
    /// Start of validity (Unix seconds).
    pub not_valid_before: i64,
    /// End of validity (Unix seconds).
    pub not_valid_after: i64,
}

impl std::fmt::Debug for DigiCertCertificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigiCertCertificate")
            .field("pfx_len", &self.pfx_data.len())
            .field("serial_number", &self.serial_number)
            .field("not_valid_before", &self.not_valid_before)
            .field("not_valid_after", &self.not_valid_after)
            .finish()
    }
}
