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

//! Error types for Fleet variable validation and substitution.
//!
//! Validation failures are admin-correctable profile authoring mistakes and
//! surface as [`FleetVarError::BadRequest`] or [`FleetVarError::MissingLicense`].
//! Substitution failures abort the whole run; nothing partially substituted is
//! ever returned.

use thiserror::Error;

/// Result type alias using [`FleetVarError`].
pub type Result<T> = std::result::Result<T, FleetVarError>;

/// Errors that can occur while validating or substituting Fleet variables.
#[derive(Debug, Error)]
pub enum FleetVarError {
    /// Fleet variables require a premium license.
    #[error("Requires Fleet Premium license")]
    MissingLicense,

    /// The profile or script is malformed in a way the admin can correct.
    #[error("{message}")]
    BadRequest {
        /// User-facing message.
        message: String,
        /// Extra detail kept for logs, never shown to the admin.
        internal: Option<String>,
    },

    /// A referenced integration is not configured (or lacks its secret).
    #[error("{0}")]
    Configuration(String),

    /// The NDES service refused to hand out a challenge.
    #[error("{detail}")]
    Ndes {
        /// Remediation message for the admin.
        detail: String,
        /// Classified NDES failure.
        #[source]
        source: NdesError,
    },

    /// Smallstep challenge retrieval failed.
    #[error("{0}")]
    Smallstep(String),

    /// DigiCert certificate issuance failed.
    #[error("{0}")]
    DigiCert(String),

    /// The variable exists but cannot be used in shell scripts.
    #[error("{0}")]
    UnsupportedInScript(String),

    /// A nested variable could not be resolved; nothing was substituted.
    #[error("variable injection failed")]
    InjectionFailed,

    /// An external call did not finish before the configured deadline.
    #[error("{operation} timed out")]
    Timeout {
        /// The operation that timed out.
        operation: String,
    },

    /// Datastore read or write failed.
    #[error("Datastore error: {0}")]
    Datastore(String),

    /// Unexpected internal state.
    #[error("Internal error: {0}")]
    Internal(String),

    /// HTTP request or response error.
    #[cfg(feature = "scep-client")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Regular expression compilation error.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// Property list parsing error.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Configuration file could not be read or parsed.
    #[error("Config error: {0}")]
    Config(String),
}

/// Classified failures returned by an NDES admin page.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NdesError {
    /// Wrong admin URL or credentials.
    #[error("{0}")]
    InvalidCredentials(String),

    /// NDES has no room left in its password cache.
    #[error("{0}")]
    PasswordCacheFull(String),

    /// The service account may not enroll with SCEP.
    #[error("{0}")]
    InsufficientPermissions(String),

    /// Anything else, e.g. transport failures.
    #[error("{0}")]
    Other(String),
}

impl NdesError {
    /// Admin-facing remediation message for this failure.
    pub fn remediation(&self) -> String {
        let var = "$FLEET_VAR_NDES_SCEP_CHALLENGE";
        match self {
            Self::InvalidCredentials(_) => format!(
                "Invalid NDES admin credentials. Fleet couldn't populate {var}. \
                 Please update credentials in Settings > Integrations > Mobile Device Management > Simple Certificate Enrollment Protocol."
            ),
            Self::PasswordCacheFull(_) => format!(
                "The NDES password cache is full. Fleet couldn't populate {var}. \
                 Please increase the number of cached passwords in NDES and try again."
            ),
            Self::InsufficientPermissions(_) => format!(
                "This account does not have sufficient permissions to enroll with SCEP. Fleet couldn't populate {var}. \
                 Please update the account with NDES SCEP enroll permissions and try again."
            ),
            Self::Other(msg) => format!("Fleet couldn't populate {var}. {msg}"),
        }
    }
}

impl From<NdesError> for FleetVarError {
    fn from(source: NdesError) -> Self {
        Self::Ndes {
            detail: source.remediation(),
            source,
        }
    }
}

impl FleetVarError {
    /// Create a bad request error with the given message.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest {
            message: msg.into(),
            internal: None,
        }
    }

    /// Create a bad request error carrying internal detail for logs.
    pub fn bad_request_with_internal(msg: impl Into<String>, internal: impl Into<String>) -> Self {
        Self::BadRequest {
            message: msg.into(),
            internal: Some(internal.into()),
        }
    }

    /// Create a configuration error with the given message.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a Smallstep error with the given message.
    pub fn smallstep(msg: impl Into<String>) -> Self {
        Self::Smallstep(msg.into())
    }

    /// Create a DigiCert error with the given message.
    pub fn digicert(msg: impl Into<String>) -> Self {
        Self::DigiCert(msg.into())
    }

    /// Create an unsupported-in-script error with the given message.
    pub fn unsupported_in_script(msg: impl Into<String>) -> Self {
        Self::UnsupportedInScript(msg.into())
    }

    /// Create a timeout error for the named operation.
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    /// Create a datastore error with the given message.
    pub fn datastore(msg: impl Into<String>) -> Self {
        Self::Datastore(msg.into())
    }

    /// Create an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a config error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Returns true for errors the admin fixes by editing the profile.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::MissingLicense | Self::BadRequest { .. })
    }

    /// Returns true if retrying the same call may succeed without operator action.
    ///
    /// CA provider failures are never retryable: challenges are single-use and
    /// most causes need credentials or NDES settings fixed first.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Datastore(_))
    }

    /// Returns the user-facing message of a bad request error.
    pub fn bad_request_message(&self) -> Option<&str> {
        match self {
            Self::BadRequest { message, .. } => Some(message),
            _ => None,
        }
    }
}
