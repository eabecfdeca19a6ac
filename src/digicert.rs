// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)

//! DigiCert certificate issuance.
//!
//! The engine fills the CA's templated fields (common name, seat ID, UPNs)
//! for the target host before calling [`DigiCertService::get_certificate`],
//! then places the base64-encoded PKCS#12 blob and its password in the
//! profile.

use async_trait::async_trait;
use base64::prelude::*;

use crate::error::Result;
use crate::types::{DigiCertCa, DigiCertCertificate};

/// Issues certificates from a DigiCert Trust Lifecycle Manager profile.
#[async_trait]
pub trait DigiCertService: Send + Sync {
    /// Request a certificate for the fully resolved CA configuration.
    ///
    /// `ca.api_token` is populated from the config-asset store.
    async fn get_certificate(&self, ca: &DigiCertCa) -> Result<DigiCertCertificate>;
}

impl DigiCertCertificate {
    /// PKCS#12 blob in standard base64, as placed in `<data>` elements.
    pub fn pfx_base64(&self) -> String {
        BASE64_STANDARD.encode(&self.pfx_data)
    }
}
