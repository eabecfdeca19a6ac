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

//! Save-time validation of certificate authority variables in a profile.
//!
//! The validator checks that every CA variable refers to a configured CA and
//! that paired variables appear together. Platform-specific checks (payload
//! placement on Apple, for example) are injected through
//! [`AdditionalValidators`].
//!
//! # Example
//!
//! ```
//! use fleetvars::types::{DigiCertCa, GroupedCertificateAuthorities, LicenseInfo, Platform};
//! use fleetvars::validation::{validate_profile_ca_variables, AdditionalValidators};
//!
//! let cas = GroupedCertificateAuthorities {
//!     digicert: vec![DigiCertCa { name: "acme".into(), ..Default::default() }],
//!     ..Default::default()
//! };
//! let contents = "CN=$FLEET_VAR_DIGICERT_DATA_acme,OU=$FLEET_VAR_DIGICERT_PASSWORD_acme";
//! validate_profile_ca_variables(
//!     contents,
//!     Some(&LicenseInfo::premium()),
//!     Platform::Apple,
//!     &cas,
//!     &AdditionalValidators::default(),
//! )
//! .unwrap();
//! ```

use tracing::debug;

use crate::accumulator::{CaVarsFound, PairedVars, RenewalIdTracker};
use crate::error::{FleetVarError, Result};
use crate::types::{CaKind, GroupedCertificateAuthorities, LicenseInfo, Platform};
use crate::variables::{self, FleetVariable};

/// A platform-specific check run after an accumulator passes its pairing check.
pub type AdditionalValidator =
    Box<dyn Fn(&str, &PairedVars, &RenewalIdTracker) -> Result<()> + Send + Sync>;

/// Optional per-CA-type checks.
#[derive(Default)]
pub struct AdditionalValidators {
    /// DigiCert check.
    pub digicert: Option<AdditionalValidator>,
    /// Custom SCEP check.
    pub custom_scep: Option<AdditionalValidator>,
    /// NDES check.
    pub ndes: Option<AdditionalValidator>,
    /// Smallstep check.
    pub smallstep: Option<AdditionalValidator>,
}

impl AdditionalValidators {
    /// No additional checks.
    pub fn none() -> Self {
        Self::default()
    }

    fn for_kind(&self, kind: CaKind) -> Option<&AdditionalValidator> {
        match kind {
            CaKind::DigiCert => self.digicert.as_ref(),
            CaKind::CustomScepProxy => self.custom_scep.as_ref(),
            CaKind::NdesScepProxy => self.ndes.as_ref(),
            CaKind::Smallstep => self.smallstep.as_ref(),
        }
    }
}

impl std::fmt::Debug for AdditionalValidators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdditionalValidators")
            .field("digicert", &self.digicert.is_some())
            .field("custom_scep", &self.custom_scep.is_some())
            .field("ndes", &self.ndes.is_some())
            .field("smallstep", &self.smallstep.is_some())
            .finish()
    }
}

enum Dispatch {
    Recorded(bool),
    UnknownCa,
    Ignored,
}

fn dispatch(found: &mut CaVarsFound, cas: &GroupedCertificateAuthorities, var: &FleetVariable) -> Dispatch {
    match var {
        FleetVariable::DigiCertData(ca) if cas.contains(CaKind::DigiCert, ca) => {
            Dispatch::Recorded(found.set_digicert_data(ca))
        }
        FleetVariable::DigiCertPassword(ca) if cas.contains(CaKind::DigiCert, ca) => {
            Dispatch::Recorded(found.set_digicert_password(ca))
        }
        FleetVariable::CustomScepProxyUrl(ca) | FleetVariable::SmallstepScepProxyUrl(ca) => {
            match var.ca_kind() {
                Some(kind) if cas.contains(kind, ca) => Dispatch::Recorded(found.set_scep_url(kind, ca)),
                _ => Dispatch::UnknownCa,
            }
        }
        FleetVariable::CustomScepChallenge(ca) | FleetVariable::SmallstepScepChallenge(ca) => {
            match var.ca_kind() {
                Some(kind) if cas.contains(kind, ca) => {
                    Dispatch::Recorded(found.set_scep_challenge(kind, ca))
                }
                _ => Dispatch::UnknownCa,
            }
        }
        FleetVariable::DigiCertData(_) | FleetVariable::DigiCertPassword(_) => Dispatch::UnknownCa,
        FleetVariable::NdesScepProxyUrl => {
            Dispatch::Recorded(found.set_scep_url(CaKind::NdesScepProxy, ""))
        }
        FleetVariable::NdesScepChallenge => {
            Dispatch::Recorded(found.set_scep_challenge(CaKind::NdesScepProxy, ""))
        }
        FleetVariable::ScepRenewalId => Dispatch::Recorded(found.set_renewal_id()),
        _ => Dispatch::Ignored,
    }
}

fn check(
    contents: &str,
    vars: Option<&PairedVars>,
    renewal: &RenewalIdTracker,
    validators: &AdditionalValidators,
) -> Result<()> {
    let Some(vars) = vars else {
        return Ok(());
    };
    if !vars.is_ok(renewal) {
        return Err(FleetVarError::bad_request(vars.error_message(renewal)));
    }
    if let Some(validator) = validators.for_kind(vars.kind()) {
        validator(contents, vars, renewal)?;
    }
    Ok(())
}

/// Validate the certificate authority variables of a profile.
///
/// The first violation found is returned.
///
/// # Errors
///
/// - [`FleetVarError::MissingLicense`] if variables are present without a
///   premium license.
/// - [`FleetVarError::BadRequest`] for unknown CAs, duplicate declarations,
///   incomplete pairs and misplaced renewal IDs.
/// - Whatever an additional validator returns.
pub fn validate_profile_ca_variables(
    contents: &str,
    license: Option<&LicenseInfo>,
    platform: Platform,
    cas: &GroupedCertificateAuthorities,
    validators: &AdditionalValidators,
) -> Result<()> {
    let names = variables::find_keep_duplicates(contents);
    if names.is_empty() {
        return Ok(());
    }

    if !license.is_some_and(LicenseInfo::is_premium) {
        return Err(FleetVarError::MissingLicense);
    }

    debug!(variables = names.len(), ?platform, "Validating profile CA variables");

    let mut found = CaVarsFound::new(platform);
    for name in &names {
        let var = FleetVariable::parse(name);
        match dispatch(&mut found, cas, &var) {
            Dispatch::Recorded(true) | Dispatch::Ignored => {}
            Dispatch::UnknownCa => {
                return Err(FleetVarError::bad_request(format!(
                    "Fleet variable $FLEET_VAR_{name} does not exist."
                )));
            }
            Dispatch::Recorded(false) if var == FleetVariable::ScepRenewalId => {
                return Err(FleetVarError::bad_request(
                    "Variable $FLEET_VAR_SCEP_RENEWAL_ID must be in the SCEP certificate's organizational unit (OU).",
                ));
            }
            Dispatch::Recorded(false) => {
                return Err(FleetVarError::bad_request(format!(
                    "Fleet variable $FLEET_VAR_{name} is already present in configuration profile."
                )));
            }
        }
    }

    let renewal = found.renewal_id;
    check(contents, found.digicert.as_ref(), &renewal, validators)?;

    if found.any_scep_found() && !found.drop_renewal_only() {
        return Err(FleetVarError::bad_request(
            variables::SCEP_RENEWAL_ID_WITHOUT_URL_CHALLENGE_MSG,
        ));
    }

    check(contents, found.custom_scep.as_ref(), &renewal, validators)?;
    check(contents, found.ndes.as_ref(), &renewal, validators)?;
    check(contents, found.smallstep.as_ref(), &renewal, validators)?;

    Ok(())
}
