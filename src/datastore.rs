// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)

//! Datastore operations consumed by the substitution engine.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    AppConfig, CaAssetKind, CaConfigAsset, GroupedCertificateAuthorities, HostEndUser, HostInfo,
};

/// Name under which the NDES service account password is stored.
pub const NDES_ASSET_NAME: &str = "NDES";

/// Read access to configuration and secrets, plus SCEP challenge minting.
///
/// Implementations must be safe to share between concurrent substitution
/// runs; the engine keeps no state between calls.
#[async_trait]
pub trait Datastore: Send + Sync {
    /// Load the global application configuration.
    async fn app_config(&self) -> Result<AppConfig>;

    /// Load the configured CAs grouped by type.
    async fn grouped_certificate_authorities(&self) -> Result<GroupedCertificateAuthorities> {
        Ok(self.app_config().await?.grouped_certificate_authorities())
    }

    /// Load a CA's stored secret.
    ///
    /// Returns `Ok(None)` when no secret of that kind is stored for `name`.
    async fn ca_config_asset(&self, name: &str, kind: CaAssetKind) -> Result<Option<CaConfigAsset>>;

    /// Mint a fresh single-use SCEP challenge.
    async fn new_challenge(&self) -> Result<String>;

    /// Load the IdP end user associated with a host, if any.
    async fn host_end_user(&self, host: &HostInfo) -> Result<Option<HostEndUser>>;
}
