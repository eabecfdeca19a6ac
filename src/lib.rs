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

//! # fleetvars
//!
//! Validation and substitution of Fleet variables (`$FLEET_VAR_*`) in MDM
//! configuration profiles and shell scripts.
//!
//! Fleet variables let an admin write one profile or script and have
//! host-specific values filled in at delivery time: the host's serial number
//! or UUID, the IdP end user's name and groups, and certificate material from
//! a configured certificate authority (DigiCert, a custom SCEP server,
//! Microsoft NDES or Smallstep).
//!
//! ## Features
//!
//! - **Save-time validation**: every CA variable must name a configured CA,
//!   paired variables must appear together, and on Apple platforms each
//!   variable must sit in the right payload field
//! - **Run-time substitution** for scripts and XML profiles, all-or-nothing
//! - **SCEP challenge retrieval** from NDES and Smallstep over HTTP
//! - **Deadlines** on every datastore and CA provider call
//!
//! ## Validating a profile
//!
//! ```
//! use fleetvars::types::{CustomScepProxyCa, GroupedCertificateAuthorities, LicenseInfo, Platform};
//! use fleetvars::validation::{validate_profile_ca_variables, AdditionalValidators};
//!
//! let cas = GroupedCertificateAuthorities {
//!     custom_scep_proxy: vec![CustomScepProxyCa { name: "corp".into(), ..Default::default() }],
//!     ..Default::default()
//! };
//! let profile = "$FLEET_VAR_CUSTOM_SCEP_PROXY_URL_corp $FLEET_VAR_CUSTOM_SCEP_CHALLENGE_corp";
//!
//! // Apple requires the renewal ID as well.
//! let err = validate_profile_ca_variables(
//!     profile,
//!     Some(&LicenseInfo::premium()),
//!     Platform::Apple,
//!     &cas,
//!     &AdditionalValidators::none(),
//! )
//! .unwrap_err();
//! assert!(err.to_string().contains("$FLEET_VAR_SCEP_RENEWAL_ID"));
//! ```
//!
//! ## Substituting a script
//!
//! ```no_run
//! use std::sync::Arc;
//! use fleetvars::{ExecutionContext, FleetVarProcessor, ProcessorConfig};
//! use fleetvars::types::{HostInfo, LicenseInfo};
//! # use fleetvars::{Datastore, DigiCertService};
//!
//! # async fn example(
//! #     datastore: Arc<dyn Datastore>,
//! #     digicert: Arc<dyn DigiCertService>,
//! # ) -> fleetvars::Result<()> {
//! let processor = FleetVarProcessor::with_scep_client(ProcessorConfig::default(), datastore, digicert)?;
//!
//! let ctx = ExecutionContext::new(HostInfo::new(1, "A1B2-C3D4", "C02ABC123"), LicenseInfo::premium());
//! let script = processor
//!     .process_fleet_variables(&ctx, "exec-42", "echo $FLEET_VAR_HOST_HARDWARE_SERIAL")
//!     .await?;
//! assert_eq!(script, "echo C02ABC123");
//! # Ok(())
//! # }
//! ```
//!
//! ## Cargo Features
//!
//! - `scep-client` (default): HTTP client for NDES and Smallstep challenges
//!   using `reqwest`

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod accumulator;
pub mod apple;
pub mod client;
pub mod config;
pub mod datastore;
pub mod digicert;
pub mod error;
pub mod processor;
pub mod types;
pub mod validation;
pub mod variables;

// Re-export main types at crate root for convenience
pub use accumulator::{CaVarsFound, PairedVars, RenewalIdTracker};
pub use apple::AppleProfileChecks;
#[cfg(feature = "scep-client")]
pub use client::ScepConfigClient;
pub use client::ScepChallengeService;
pub use config::{ProcessorConfig, ProcessorConfigBuilder};
pub use datastore::Datastore;
pub use digicert::DigiCertService;
pub use error::{FleetVarError, NdesError, Result};
pub use processor::FleetVarProcessor;
pub use types::{ExecutionContext, Platform};
pub use validation::{AdditionalValidators, validate_profile_ca_variables};
pub use variables::FleetVariable;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent string for HTTP requests.
pub const USER_AGENT: &str = concat!("fleetvars/", env!("CARGO_PKG_VERSION"));
