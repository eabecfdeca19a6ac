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

//! Per-CA-type tracking of the paired variables observed in a profile.
//!
//! Every CA type needs two variables that pair one-to-one by CA name:
//!
//! | CA type    | first role      | second role            |
//! |------------|-----------------|------------------------|
//! | DigiCert   | `DIGICERT_DATA` | `DIGICERT_PASSWORD`    |
//! | custom SCEP| `..._PROXY_URL` | `..._CHALLENGE`        |
//! | Smallstep  | `..._PROXY_URL` | `..._CHALLENGE`        |
//! | NDES       | `NDES_SCEP_PROXY_URL` | `NDES_SCEP_CHALLENGE` |
//!
//! NDES has no CA name; it is tracked under the empty name. The SCEP types
//! share `SCEP_RENEWAL_ID`, which is held once in a [`RenewalIdTracker`].

use std::collections::BTreeSet;

use crate::types::{CaKind, Platform};
use crate::variables::{
    CUSTOM_SCEP_CHALLENGE_PREFIX, CUSTOM_SCEP_PROXY_URL_PREFIX, DIGICERT_DATA_PREFIX,
    DIGICERT_PASSWORD_PREFIX, NDES_VARIABLES_MISSING_MSG, SCEP_RENEWAL_ID,
    SCEP_RENEWAL_ID_WITHOUT_URL_CHALLENGE_MSG, SMALLSTEP_SCEP_CHALLENGE_PREFIX,
    SMALLSTEP_SCEP_PROXY_URL_PREFIX,
};

/// Tracks whether the shared `SCEP_RENEWAL_ID` variable was seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenewalIdTracker {
    found: bool,
}

impl RenewalIdTracker {
    /// Record an occurrence. Returns `false` if it was already recorded.
    pub fn set(&mut self) -> bool {
        let newly_added = !self.found;
        self.found = true;
        newly_added
    }

    /// Whether the renewal ID was seen.
    pub fn found(&self) -> bool {
        self.found
    }
}

/// Paired variable names observed for one CA type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairedVars {
    kind: CaKind,
    first: BTreeSet<String>,
    second: BTreeSet<String>,
    renewal_required: bool,
}

impl PairedVars {
    /// Create an empty accumulator.
    ///
    /// `renewal_required` says whether `SCEP_RENEWAL_ID` must accompany the
    /// pair for this CA type on the target platform.
    pub fn new(kind: CaKind, renewal_required: bool) -> Self {
        Self {
            kind,
            first: BTreeSet::new(),
            second: BTreeSet::new(),
            renewal_required,
        }
    }

    /// Create an accumulator with the renewal rule of `kind` on `platform`.
    pub fn for_platform(kind: CaKind, platform: Platform) -> Self {
        let renewal_required = match kind {
            CaKind::DigiCert => false,
            CaKind::NdesScepProxy | CaKind::Smallstep => true,
            CaKind::CustomScepProxy => platform.supports_scep_renewal(),
        };
        Self::new(kind, renewal_required)
    }

    /// CA type of this accumulator.
    pub fn kind(&self) -> CaKind {
        self.kind
    }

    /// Whether the renewal ID is mandatory for this accumulator.
    pub fn renewal_required(&self) -> bool {
        self.renewal_required
    }

    /// Record a data (DigiCert) or URL (SCEP types) variable.
    ///
    /// Returns `false` if this CA name was already recorded.
    pub fn set_first(&mut self, ca_name: &str) -> bool {
        self.first.insert(ca_name.to_string())
    }

    /// Record a password (DigiCert) or challenge (SCEP types) variable.
    ///
    /// Returns `false` if this CA name was already recorded.
    pub fn set_second(&mut self, ca_name: &str) -> bool {
        self.second.insert(ca_name.to_string())
    }

    /// CA names recorded in the first role.
    pub fn cas(&self) -> impl Iterator<Item = &str> {
        self.first.iter().map(String::as_str)
    }

    /// Whether the pair is complete.
    pub fn is_ok(&self, renewal: &RenewalIdTracker) -> bool {
        if self.first != self.second || self.first.is_empty() {
            return false;
        }
        !self.renewal_required || renewal.found()
    }

    /// Whether only the renewal ID was seen for this type.
    pub fn is_renewal_only(&self, renewal: &RenewalIdTracker) -> bool {
        self.first.is_empty() && self.second.is_empty() && renewal.found()
    }

    fn prefixes(&self) -> (&'static str, &'static str) {
        match self.kind {
            CaKind::DigiCert => (DIGICERT_DATA_PREFIX, DIGICERT_PASSWORD_PREFIX),
            CaKind::CustomScepProxy => (CUSTOM_SCEP_PROXY_URL_PREFIX, CUSTOM_SCEP_CHALLENGE_PREFIX),
            CaKind::Smallstep => (SMALLSTEP_SCEP_PROXY_URL_PREFIX, SMALLSTEP_SCEP_CHALLENGE_PREFIX),
            CaKind::NdesScepProxy => ("", ""),
        }
    }

    fn requirement_message(&self) -> String {
        let (url, challenge) = self.prefixes();
        let kind = self.kind.display_name();
        if self.renewal_required {
            format!(
                "SCEP profile for {kind} certificate authority requires: $FLEET_VAR_{challenge}<CA_NAME>, $FLEET_VAR_{url}<CA_NAME>, and $FLEET_VAR_{SCEP_RENEWAL_ID} variables."
            )
        } else {
            format!(
                "SCEP profile for {kind} certificate authority requires: $FLEET_VAR_{challenge}<CA_NAME> and $FLEET_VAR_{url}<CA_NAME> variables."
            )
        }
    }

    /// The most specific message explaining why [`is_ok`](Self::is_ok) is false.
    pub fn error_message(&self, renewal: &RenewalIdTracker) -> String {
        if self.kind != CaKind::DigiCert && self.is_renewal_only(renewal) {
            return SCEP_RENEWAL_ID_WITHOUT_URL_CHALLENGE_MSG.to_string();
        }

        match self.kind {
            CaKind::NdesScepProxy => return NDES_VARIABLES_MISSING_MSG.to_string(),
            CaKind::CustomScepProxy | CaKind::Smallstep => {
                let missing_renewal = self.renewal_required && !renewal.found();
                if missing_renewal || self.first.is_empty() || self.second.is_empty() {
                    return self.requirement_message();
                }
            }
            CaKind::DigiCert => {}
        }

        let (first, second) = self.prefixes();
        if let Some(ca) = self.second.difference(&self.first).next() {
            return format!("Missing $FLEET_VAR_{first}{ca} in the profile");
        }
        if let Some(ca) = self.first.difference(&self.second).next() {
            return format!("Missing $FLEET_VAR_{second}{ca} in the profile");
        }
        format!(
            "CA name mismatch between $FLEET_VAR_{first}<ca_name> and $FLEET_VAR_{second}<ca_name> in the profile."
        )
    }
}

/// All CA accumulators for one validation pass.
///
/// An accumulator is `None` until a variable of its type is observed.
#[derive(Debug, Clone)]
pub struct CaVarsFound {
    platform: Platform,
    /// DigiCert data/password pairs.
    pub digicert: Option<PairedVars>,
    /// Custom SCEP URL/challenge pairs.
    pub custom_scep: Option<PairedVars>,
    /// NDES URL/challenge.
    pub ndes: Option<PairedVars>,
    /// Smallstep URL/challenge pairs.
    pub smallstep: Option<PairedVars>,
    /// Shared renewal ID.
    pub renewal_id: RenewalIdTracker,
}

impl CaVarsFound {
    /// Create empty accumulators for `platform`.
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            digicert: None,
            custom_scep: None,
            ndes: None,
            smallstep: None,
            renewal_id: RenewalIdTracker::default(),
        }
    }

    fn slot(&mut self, kind: CaKind) -> &mut PairedVars {
        let platform = self.platform;
        let slot = match kind {
            CaKind::DigiCert => &mut self.digicert,
            CaKind::CustomScepProxy => &mut self.custom_scep,
            CaKind::NdesScepProxy => &mut self.ndes,
            CaKind::Smallstep => &mut self.smallstep,
        };
        slot.get_or_insert_with(|| PairedVars::for_platform(kind, platform))
    }

    /// Accumulator for `kind`, if any variable of that type was observed.
    pub fn get(&self, kind: CaKind) -> Option<&PairedVars> {
        match kind {
            CaKind::DigiCert => self.digicert.as_ref(),
            CaKind::CustomScepProxy => self.custom_scep.as_ref(),
            CaKind::NdesScepProxy => self.ndes.as_ref(),
            CaKind::Smallstep => self.smallstep.as_ref(),
        }
    }

    /// Record `DIGICERT_DATA_<ca>`.
    pub fn set_digicert_data(&mut self, ca_name: &str) -> bool {
        self.slot(CaKind::DigiCert).set_first(ca_name)
    }

    /// Record `DIGICERT_PASSWORD_<ca>`.
    pub fn set_digicert_password(&mut self, ca_name: &str) -> bool {
        self.slot(CaKind::DigiCert).set_second(ca_name)
    }

    /// Record a SCEP proxy URL variable for `kind`.
    pub fn set_scep_url(&mut self, kind: CaKind, ca_name: &str) -> bool {
        self.slot(kind).set_first(ca_name)
    }

    /// Record a SCEP challenge variable for `kind`.
    pub fn set_scep_challenge(&mut self, kind: CaKind, ca_name: &str) -> bool {
        self.slot(kind).set_second(ca_name)
    }

    /// Record `SCEP_RENEWAL_ID` for every SCEP type.
    ///
    /// Returns `false` if the renewal ID was already recorded.
    pub fn set_renewal_id(&mut self) -> bool {
        for kind in [CaKind::CustomScepProxy, CaKind::NdesScepProxy, CaKind::Smallstep] {
            self.slot(kind);
        }
        self.renewal_id.set()
    }

    /// Whether any SCEP type accumulator exists.
    pub fn any_scep_found(&self) -> bool {
        self.custom_scep.is_some() || self.ndes.is_some() || self.smallstep.is_some()
    }

    /// Drop SCEP accumulators that only hold the shared renewal ID.
    ///
    /// Returns `false` when every SCEP accumulator was dropped, meaning the
    /// renewal ID appeared without any URL or challenge variable.
    pub fn drop_renewal_only(&mut self) -> bool {
        let renewal = self.renewal_id;
        for slot in [&mut self.custom_scep, &mut self.ndes, &mut self.smallstep] {
            if slot.as_ref().is_some_and(|vars| vars.is_renewal_only(&renewal)) {
                *slot = None;
            }
        }
        self.any_scep_found()
    }
}
