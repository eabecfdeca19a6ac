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

//! Apple configuration profile checks for certificate authority variables.
//!
//! On Apple platforms the CA variables must sit in specific payload fields:
//!
//! - DigiCert variables in the `Password` and `PayloadContent` fields of a
//!   `com.apple.security.pkcs12` payload.
//! - SCEP variables in the `Challenge` and `URL` fields of the single
//!   `com.apple.security.scep` payload, with `SCEP_RENEWAL_ID` in the
//!   subject common name.

pub mod plist;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::accumulator::{PairedVars, RenewalIdTracker};
use crate::error::{FleetVarError, Result};
use crate::types::CaKind;
use crate::validation::AdditionalValidators;
use crate::variables::{
    CUSTOM_SCEP_CHALLENGE_PREFIX, CUSTOM_SCEP_PROXY_URL_PREFIX, DIGICERT_DATA_PREFIX,
    DIGICERT_PASSWORD_PREFIX, FLEET_VAR_PREFIX, NDES_SCEP_CHALLENGE, NDES_SCEP_PROXY_URL,
    SCEP_RENEWAL_ID, SMALLSTEP_SCEP_CHALLENGE_PREFIX, SMALLSTEP_SCEP_PROXY_URL_PREFIX,
};
use plist::{Dict, Value};

/// PKCS#12 payload type.
pub const PKCS12_PAYLOAD_TYPE: &str = "com.apple.security.pkcs12";
/// SCEP payload type.
pub const SCEP_PAYLOAD_TYPE: &str = "com.apple.security.scep";

/// Message used when a profile has more than one SCEP payload.
pub const MULTIPLE_SCEP_PAYLOADS_MSG: &str =
    "Add only one SCEP payload when using variables for certificate authority";
/// Message used when SCEP variables are outside the SCEP payload.
pub const SCEP_VARIABLES_NOT_IN_SCEP_PAYLOAD_MSG: &str = "Variables prefixed with \"$FLEET_VAR_SCEP_\", \"$FLEET_VAR_CUSTOM_SCEP_\", \"$FLEET_VAR_NDES_SCEP_\" and \"$FLEET_VAR_SMALLSTEP_SCEP_\" can only be included in the 'com.apple.security.scep' payload.";

static RENEWAL_ID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$FLEET_VAR_SCEP_RENEWAL_ID\b|\$\{FLEET_VAR_SCEP_RENEWAL_ID\}")
        .expect("renewal ID pattern is valid")
});

/// Whether `value` is exactly the placeholder of `name`, in either form.
fn is_exact_placeholder(value: &str, name: &str) -> bool {
    let Some(rest) = value.strip_prefix('$') else {
        return false;
    };
    let rest = rest
        .strip_prefix('{')
        .and_then(|r| r.strip_suffix('}'))
        .unwrap_or(rest);
    rest.strip_prefix(FLEET_VAR_PREFIX) == Some(name)
}

fn truncate(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &value[..idx]),
        None => value.to_string(),
    }
}

fn payloads(root: &Value) -> impl Iterator<Item = &Dict> {
    root.as_dict()
        .and_then(|d| d.get("PayloadContent"))
        .and_then(Value::as_array)
        .unwrap_or_default()
        .iter()
        .filter_map(Value::as_dict)
}

/// Fields of a SCEP payload that carry CA variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScepPayload {
    /// `Challenge` field.
    pub challenge: String,
    /// `URL` field.
    pub url: String,
    /// `CN` value of the `Subject` RDN sequence.
    pub common_name: String,
}

impl ScepPayload {
    fn from_dict(content: &Dict) -> Self {
        // Subject is [[["CN", "value"]], [["OU", "value"]], ...]
        let common_name = content
            .get("Subject")
            .and_then(Value::as_array)
            .unwrap_or_default()
            .iter()
            .filter_map(Value::as_array)
            .flatten()
            .filter_map(Value::as_array)
            .find_map(|pair| match pair {
                [key, value] if key.as_str() == Some("CN") => value.as_str(),
                _ => None,
            })
            .unwrap_or_default()
            .to_string();

        Self {
            challenge: content.string("Challenge").to_string(),
            url: content.string("URL").to_string(),
            common_name,
        }
    }

    /// Whether the common name contains the renewal ID variable.
    pub fn has_renewal_id_in_cn(&self) -> bool {
        RENEWAL_ID_REGEX.is_match(&self.common_name)
    }
}

/// Extract the single SCEP payload of a profile.
///
/// # Errors
///
/// Returns a bad request error if the profile cannot be parsed, has several
/// SCEP payloads, or has none.
pub fn single_scep_payload(contents: &str) -> Result<ScepPayload> {
    let root = plist::parse(contents).map_err(|e| {
        FleetVarError::bad_request(format!(
            "Failed to parse SCEP payload with Fleet variables: {e}"
        ))
    })?;

    let mut found = payloads(&root).filter(|p| p.string("PayloadType") == SCEP_PAYLOAD_TYPE);
    let Some(first) = found.next() else {
        return Err(FleetVarError::bad_request(SCEP_VARIABLES_NOT_IN_SCEP_PAYLOAD_MSG));
    };
    if found.next().is_some() {
        return Err(FleetVarError::bad_request(MULTIPLE_SCEP_PAYLOADS_MSG));
    }

    Ok(first
        .get("PayloadContent")
        .and_then(Value::as_dict)
        .map(ScepPayload::from_dict)
        .unwrap_or_default())
}

/// Apple payload placement checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppleProfileChecks {
    max_value_chars_in_error: usize,
}

impl Default for AppleProfileChecks {
    fn default() -> Self {
        Self {
            max_value_chars_in_error: 100,
        }
    }
}

impl AppleProfileChecks {
    /// Create checks that quote at most `max_value_chars_in_error` characters
    /// of a payload value in error details.
    pub fn new(max_value_chars_in_error: usize) -> Self {
        Self {
            max_value_chars_in_error,
        }
    }

    /// Check DigiCert variables placement.
    ///
    /// # Errors
    ///
    /// Returns a bad request error when a password variable is paired with
    /// the wrong data variable, or a pair is not inside a PKCS#12 payload.
    pub fn check_digicert(&self, contents: &str, vars: &PairedVars) -> Result<()> {
        let root = plist::parse(contents).map_err(|e| {
            FleetVarError::bad_request(format!(
                "Failed to parse PKCS12 payload with Fleet variables: {e}"
            ))
        })?;

        let mut found: Vec<&str> = Vec::new();
        for payload in payloads(&root).filter(|p| p.string("PayloadType") == PKCS12_PAYLOAD_TYPE) {
            let password = payload.string("Password");
            let content = payload
                .get("PayloadContent")
                .and_then(Value::as_text)
                .unwrap_or_default();
            for ca in vars.cas() {
                if !is_exact_placeholder(password, &format!("{DIGICERT_PASSWORD_PREFIX}{ca}")) {
                    continue;
                }
                if is_exact_placeholder(content, &format!("{DIGICERT_DATA_PREFIX}{ca}")) {
                    found.push(ca);
                    break;
                }
                return Err(FleetVarError::bad_request(format!(
                    "CA name mismatch between ${FLEET_VAR_PREFIX}{DIGICERT_PASSWORD_PREFIX}{ca} and {} in PKCS12 payload.",
                    truncate(content, self.max_value_chars_in_error)
                )));
            }
        }

        if let Some(ca) = vars.cas().find(|ca| !found.contains(ca)) {
            return Err(FleetVarError::bad_request(format!(
                "Variables ${FLEET_VAR_PREFIX}{DIGICERT_PASSWORD_PREFIX}{ca} and ${FLEET_VAR_PREFIX}{DIGICERT_DATA_PREFIX}{ca} can only be included in the '{PKCS12_PAYLOAD_TYPE}' payload under Password and PayloadContent, respectively."
            )));
        }
        Ok(())
    }

    fn check_field(&self, field: &str, value: &str, name: &str) -> Result<()> {
        if is_exact_placeholder(value, name) {
            return Ok(());
        }
        Err(FleetVarError::bad_request_with_internal(
            format!(
                "Variable \"${FLEET_VAR_PREFIX}{name}\" must be in the SCEP certificate's \"{field}\" field."
            ),
            format!("{field}: {}", truncate(value, self.max_value_chars_in_error)),
        ))
    }

    fn check_renewal_cn(payload: &ScepPayload) -> Result<()> {
        if payload.has_renewal_id_in_cn() {
            return Ok(());
        }
        Err(FleetVarError::bad_request(format!(
            "Variable ${FLEET_VAR_PREFIX}{SCEP_RENEWAL_ID} must be in the SCEP certificate's common name (CN)."
        )))
    }

    /// Check custom SCEP or Smallstep variables placement.
    ///
    /// # Errors
    ///
    /// Returns a bad request error when the challenge or URL field does not
    /// hold exactly the CA's variable, or the CN lacks the renewal ID.
    pub fn check_named_scep(&self, contents: &str, vars: &PairedVars) -> Result<()> {
        let (challenge_prefix, url_prefix) = match vars.kind() {
            CaKind::Smallstep => (SMALLSTEP_SCEP_CHALLENGE_PREFIX, SMALLSTEP_SCEP_PROXY_URL_PREFIX),
            _ => (CUSTOM_SCEP_CHALLENGE_PREFIX, CUSTOM_SCEP_PROXY_URL_PREFIX),
        };
        let payload = single_scep_payload(contents)?;

        // A profile carries a single SCEP payload, so only one CA can match.
        for ca in vars.cas() {
            self.check_field("Challenge", &payload.challenge, &format!("{challenge_prefix}{ca}"))?;
            self.check_field("URL", &payload.url, &format!("{url_prefix}{ca}"))?;
        }
        Self::check_renewal_cn(&payload)
    }

    /// Check NDES variables placement.
    ///
    /// # Errors
    ///
    /// Returns a bad request error when the CN lacks the renewal ID or the
    /// challenge or URL field does not hold exactly the NDES variable.
    pub fn check_ndes(&self, contents: &str) -> Result<()> {
        let payload = single_scep_payload(contents)?;
        Self::check_renewal_cn(&payload)?;
        self.check_field("Challenge", &payload.challenge, NDES_SCEP_CHALLENGE)?;
        self.check_field("URL", &payload.url, NDES_SCEP_PROXY_URL)
    }

    /// Build the additional validators used for Apple profiles.
    pub fn validators(self) -> AdditionalValidators {
        debug!(max_value_chars_in_error = self.max_value_chars_in_error, "Using Apple profile checks");
        AdditionalValidators {
            digicert: Some(Box::new(move |contents: &str, vars: &PairedVars, _: &RenewalIdTracker| {
                self.check_digicert(contents, vars)
            })),
            custom_scep: Some(Box::new(move |contents: &str, vars: &PairedVars, _: &RenewalIdTracker| {
                self.check_named_scep(contents, vars)
            })),
            ndes: Some(Box::new(move |contents: &str, _: &PairedVars, _: &RenewalIdTracker| {
                self.check_ndes(contents)
            })),
            smallstep: Some(Box::new(move |contents: &str, vars: &PairedVars, _: &RenewalIdTracker| {
                self.check_named_scep(contents, vars)
            })),
        }
    }
}
