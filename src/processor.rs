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

//! Runtime substitution of Fleet variables.
//!
//! A run goes through three stages:
//!
//! 1. Scan. Content without variables is returned unchanged and no
//!    collaborator is called.
//! 2. Check. Every referenced integration must be configured and have its
//!    secret stored. All variables are checked before anything is
//!    substituted; unconfigured integrations are reported together with one
//!    generic message.
//! 3. Substitute. Each variable is resolved once. The first failure aborts
//!    the run and nothing partially substituted is returned.
//!
//! Challenges, renewal IDs and certificates are minted fresh on every run.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tracing::{debug, error, info, warn};

use crate::apple::AppleProfileChecks;
use crate::client::ScepChallengeService;
use crate::config::ProcessorConfig;
use crate::datastore::{Datastore, NDES_ASSET_NAME};
use crate::digicert::DigiCertService;
use crate::error::{FleetVarError, NdesError, Result};
use crate::types::{
    CaAssetKind, CaKind, CustomScepProxyCa, DigiCertCa, ExecutionContext,
    GroupedCertificateAuthorities, HostEndUser, HostInfo, NdesScepProxyCa, Platform,
    SmallstepScepProxyCa,
};
use crate::validation::{AdditionalValidators, validate_profile_ca_variables};
use crate::variables::{self, ContentKind, FleetVariable};

/// Message returned when referenced integrations are not configured.
pub const UNCONFIGURED_SETTINGS_MSG: &str =
    "profile references one or more variables corresponding to unconfigured settings";

/// Characters left unescaped in a URL path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b':')
    .remove(b'=')
    .remove(b'@');

/// SCEP proxy URL carrying a comma-separated identifier as its last segment.
fn scep_proxy_url(mdm_url: &str, proxy_path: &str, identifier: &[&str]) -> String {
    let joined = identifier.join(",");
    let segment = utf8_percent_encode(&joined, PATH_SEGMENT);
    format!("{mdm_url}{proxy_path}{segment}")
}

fn premium_required(kind: CaKind) -> FleetVarError {
    let integration = match kind {
        CaKind::DigiCert => "DigiCert",
        CaKind::CustomScepProxy => "Custom SCEP",
        CaKind::NdesScepProxy => "NDES SCEP",
        CaKind::Smallstep => "Smallstep SCEP",
    };
    FleetVarError::configuration(format!(
        "{integration} integration requires a Fleet Premium license."
    ))
}

fn ndes_failure(err: FleetVarError) -> FleetVarError {
    match err {
        FleetVarError::Ndes { .. } | FleetVarError::Timeout { .. } => err,
        other => NdesError::Other(other.to_string()).into(),
    }
}

/// Validates and substitutes Fleet variables in profiles and scripts.
///
/// The processor holds no per-run state and may be shared between tasks.
#[derive(Clone)]
pub struct FleetVarProcessor {
    config: ProcessorConfig,
    datastore: Arc<dyn Datastore>,
    scep: Arc<dyn ScepChallengeService>,
    digicert: Arc<dyn DigiCertService>,
}

impl std::fmt::Debug for FleetVarProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FleetVarProcessor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl FleetVarProcessor {
    /// Create a processor from its collaborators.
    pub fn new(
        config: ProcessorConfig,
        datastore: Arc<dyn Datastore>,
        scep: Arc<dyn ScepChallengeService>,
        digicert: Arc<dyn DigiCertService>,
    ) -> Self {
        Self {
            config,
            datastore,
            scep,
            digicert,
        }
    }

    /// Create a processor that fetches SCEP challenges over HTTP.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    #[cfg(feature = "scep-client")]
    pub fn with_scep_client(
        config: ProcessorConfig,
        datastore: Arc<dyn Datastore>,
        digicert: Arc<dyn DigiCertService>,
    ) -> Result<Self> {
        let scep = crate::client::ScepConfigClient::from_config(&config)?;
        Ok(Self::new(config, datastore, Arc::new(scep), digicert))
    }

    /// The processor configuration.
    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Substitute Fleet variables in a shell script about to run on a host.
    ///
    /// `exec_id` identifies the script run and is embedded in renewal IDs
    /// and SCEP proxy URLs.
    ///
    /// # Errors
    ///
    /// Fails if the host is unknown, a referenced integration is not
    /// configured, a CA provider call fails, or the script uses end-user
    /// variables, which are not available to scripts.
    pub async fn process_fleet_variables(
        &self,
        ctx: &ExecutionContext,
        exec_id: &str,
        contents: &str,
    ) -> Result<String> {
        self.process(ctx, exec_id, contents, ContentKind::ShellScript)
            .await
    }

    /// Substitute Fleet variables in an XML configuration profile for one host.
    ///
    /// `profile_uuid` is embedded in renewal IDs and SCEP proxy URLs. Values
    /// are XML-escaped and end-user variables are read from the host's IdP
    /// user.
    ///
    /// # Errors
    ///
    /// As [`process_fleet_variables`](Self::process_fleet_variables), plus
    /// [`FleetVarError::InjectionFailed`] when host or end-user data needed by
    /// a variable is missing.
    pub async fn process_profile_variables(
        &self,
        ctx: &ExecutionContext,
        profile_uuid: &str,
        contents: &str,
    ) -> Result<String> {
        self.process(ctx, profile_uuid, contents, ContentKind::XmlProfile)
            .await
    }

    /// Validate the certificate authority variables of a profile being saved.
    ///
    /// On Apple platforms the payload placement checks run as well.
    ///
    /// # Errors
    ///
    /// See [`validate_profile_ca_variables`].
    pub async fn validate_profile(
        &self,
        ctx: &ExecutionContext,
        contents: &str,
        platform: Platform,
    ) -> Result<()> {
        if !variables::contains_fleet_variables(contents) {
            return Ok(());
        }
        if !ctx.is_premium() {
            return Err(FleetVarError::MissingLicense);
        }

        let cas = self
            .bounded(
                "loading certificate authorities",
                self.datastore.grouped_certificate_authorities(),
            )
            .await?;
        let validators = match platform {
            Platform::Apple => {
                AppleProfileChecks::new(self.config.max_value_chars_in_error).validators()
            }
            Platform::Windows => AdditionalValidators::none(),
        };
        validate_profile_ca_variables(contents, ctx.license.as_ref(), platform, &cas, &validators)
    }

    async fn process(
        &self,
        ctx: &ExecutionContext,
        run_id: &str,
        contents: &str,
        kind: ContentKind,
    ) -> Result<String> {
        let vars: Vec<FleetVariable> = variables::find(contents)
            .iter()
            .map(|name| FleetVariable::parse(name))
            .collect();
        if vars.is_empty() {
            return Ok(contents.to_string());
        }

        let app_config = self
            .bounded("loading app config", self.datastore.app_config())
            .await?;
        let host = ctx
            .host
            .as_ref()
            .ok_or_else(|| FleetVarError::internal("unable to infer host from context"))?;

        debug!(
            host_uuid = %host.uuid,
            run_id,
            variables = vars.len(),
            ?kind,
            "Substituting Fleet variables"
        );

        let mut run = Run {
            processor: self,
            ctx,
            host,
            run_id,
            kind,
            mdm_url: app_config.mdm_url(),
            cas: app_config.grouped_certificate_authorities(),
            cache: ResolutionCache::default(),
        };
        run.check_configured(&vars).await?;
        run.substitute(contents, &vars).await
    }

    async fn bounded<T, F>(&self, operation: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.config.request_timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    operation,
                    timeout_secs = self.config.request_timeout.as_secs(),
                    "External call timed out"
                );
                Err(FleetVarError::timeout(operation))
            }
        }
    }
}

/// Integrations and end-user data resolved during one run.
///
/// Certificate authorities are copied here with their secrets filled in.
/// Minted values (challenges, certificates) are never cached.
#[derive(Debug, Default)]
struct ResolutionCache {
    ndes: Option<NdesScepProxyCa>,
    digicert: HashMap<String, DigiCertCa>,
    custom_scep: HashMap<String, CustomScepProxyCa>,
    smallstep: HashMap<String, SmallstepScepProxyCa>,
    end_user: Option<Option<HostEndUser>>,
}

enum Step {
    Replaced(String),
    Unchanged,
    Failed,
}

struct Run<'a> {
    processor: &'a FleetVarProcessor,
    ctx: &'a ExecutionContext,
    host: &'a HostInfo,
    run_id: &'a str,
    kind: ContentKind,
    mdm_url: String,
    cas: GroupedCertificateAuthorities,
    cache: ResolutionCache,
}

impl Run<'_> {
    async fn check_configured(&mut self, vars: &[FleetVariable]) -> Result<()> {
        let mut valid = true;
        for var in vars {
            let configured = match var {
                FleetVariable::Unknown(name) => {
                    return Err(FleetVarError::bad_request(format!(
                        "Unknown Fleet variable $FLEET_VAR_{name} found in profile. Please update or remove."
                    )));
                }
                FleetVariable::DigiCertData(ca) | FleetVariable::DigiCertPassword(ca) => {
                    self.require_premium(CaKind::DigiCert)?;
                    self.load_digicert(ca, var).await?
                }
                FleetVariable::CustomScepChallenge(ca) | FleetVariable::CustomScepProxyUrl(ca) => {
                    self.require_premium(CaKind::CustomScepProxy)?;
                    self.load_custom_scep(ca, var).await?
                }
                FleetVariable::SmallstepScepChallenge(ca)
                | FleetVariable::SmallstepScepProxyUrl(ca) => {
                    self.require_premium(CaKind::Smallstep)?;
                    self.load_smallstep(ca, var).await?
                }
                FleetVariable::NdesScepChallenge | FleetVariable::NdesScepProxyUrl => {
                    self.require_premium(CaKind::NdesScepProxy)?;
                    self.load_ndes().await?
                }
                _ => true,
            };
            valid &= configured;
        }

        if !valid {
            return Err(FleetVarError::configuration(UNCONFIGURED_SETTINGS_MSG));
        }
        Ok(())
    }

    fn require_premium(&self, kind: CaKind) -> Result<()> {
        if self.ctx.is_premium() {
            Ok(())
        } else {
            Err(premium_required(kind))
        }
    }

    fn missing_ca(&self, var: &FleetVariable, ca_name: &str) {
        warn!(
            host_uuid = %self.host.uuid,
            ca_name,
            "Fleet couldn't populate ${var} because {ca_name} certificate authority doesn't exist."
        );
    }

    async fn fetch_secret(&self, ca_name: &str, kind: CaAssetKind) -> Result<Option<String>> {
        let asset = self
            .processor
            .bounded(
                "getting CA config asset",
                self.processor.datastore.ca_config_asset(ca_name, kind),
            )
            .await?;
        Ok(asset.map(|asset| asset.value_string()))
    }

    async fn load_digicert(&mut self, name: &str, var: &FleetVariable) -> Result<bool> {
        if self.cache.digicert.contains_key(name) {
            return Ok(true);
        }
        let Some(mut ca) = self.cas.digicert(name).cloned() else {
            self.missing_ca(var, name);
            return Ok(false);
        };
        let Some(token) = self.fetch_secret(name, CaAssetKind::DigiCertApiToken).await? else {
            warn!(
                ca_name = name,
                "DigiCert CA '{name}' is missing API token. Please configure in Settings > Integrations > Certificates."
            );
            return Ok(false);
        };
        ca.api_token = token;
        self.cache.digicert.insert(name.to_string(), ca);
        Ok(true)
    }

    async fn load_custom_scep(&mut self, name: &str, var: &FleetVariable) -> Result<bool> {
        if self.cache.custom_scep.contains_key(name) {
            return Ok(true);
        }
        let Some(mut ca) = self.cas.custom_scep(name).cloned() else {
            self.missing_ca(var, name);
            return Ok(false);
        };
        let Some(challenge) = self.fetch_secret(name, CaAssetKind::CustomScepChallenge).await?
        else {
            warn!(
                ca_name = name,
                "Custom SCEP CA '{name}' is missing a challenge. Please configure in Settings > Integrations > Certificates."
            );
            return Ok(false);
        };
        ca.challenge = challenge;
        self.cache.custom_scep.insert(name.to_string(), ca);
        Ok(true)
    }

    async fn load_smallstep(&mut self, name: &str, var: &FleetVariable) -> Result<bool> {
        if self.cache.smallstep.contains_key(name) {
            return Ok(true);
        }
        let Some(mut ca) = self.cas.smallstep(name).cloned() else {
            self.missing_ca(var, name);
            return Ok(false);
        };
        let Some(password) = self.fetch_secret(name, CaAssetKind::SmallstepPassword).await? else {
            warn!(
                ca_name = name,
                "Smallstep CA '{name}' is missing a password. Please configure in Settings > Integrations > Certificates."
            );
            return Ok(false);
        };
        ca.password = password;
        self.cache.smallstep.insert(name.to_string(), ca);
        Ok(true)
    }

    async fn load_ndes(&mut self) -> Result<bool> {
        if self.cache.ndes.is_some() {
            return Ok(true);
        }
        let Some(mut ndes) = self.cas.ndes_scep.clone() else {
            warn!(host_uuid = %self.host.uuid, "NDES SCEP proxy is not configured");
            return Ok(false);
        };
        let Some(password) = self
            .fetch_secret(NDES_ASSET_NAME, CaAssetKind::NdesPassword)
            .await?
        else {
            warn!("NDES SCEP proxy is missing the admin password");
            return Ok(false);
        };
        ndes.password = password;
        self.cache.ndes = Some(ndes);
        Ok(true)
    }

    async fn substitute(&mut self, contents: &str, vars: &[FleetVariable]) -> Result<String> {
        let mut contents = contents.to_string();
        for var in vars {
            match self.substitute_one(&contents, var).await? {
                Step::Replaced(next) => contents = next,
                Step::Unchanged => {}
                Step::Failed => {
                    warn!(
                        host_uuid = %self.host.uuid,
                        run_id = self.run_id,
                        variable = %var,
                        "Fleet variable could not be resolved"
                    );
                    return Err(FleetVarError::InjectionFailed);
                }
            }
        }

        // A placeholder that survived the pass was misplaced (for example a
        // CA variable that is not the whole XML element text).
        let leftover: Vec<String> = variables::find(&contents)
            .into_iter()
            .filter(|name| vars.contains(&FleetVariable::parse(name)))
            .collect();
        if !leftover.is_empty() {
            warn!(
                host_uuid = %self.host.uuid,
                run_id = self.run_id,
                variables = ?leftover,
                "Fleet variables left unsubstituted"
            );
            return Err(FleetVarError::InjectionFailed);
        }
        Ok(contents)
    }

    async fn substitute_one(&mut self, contents: &str, var: &FleetVariable) -> Result<Step> {
        match var {
            FleetVariable::HostUuid
            | FleetVariable::HostHardwareSerial
            | FleetVariable::HostEndUserEmailIdp
            | FleetVariable::HostEndUserIdpUsername
            | FleetVariable::HostEndUserIdpUsernameLocalPart
            | FleetVariable::HostEndUserIdpGroups
            | FleetVariable::HostEndUserIdpDepartment => match self.host_value(var).await? {
                Some(value) => self.replace(contents, var, &value),
                None => Ok(Step::Failed),
            },

            FleetVariable::ScepRenewalId => {
                let renewal_id = format!("fleet-{}", self.run_id);
                self.replace(contents, var, &renewal_id)
            }

            FleetVariable::NdesScepChallenge => {
                let Some(ndes) = self.cache.ndes.clone() else {
                    error!(
                        "NDES SCEP configuration not found. This error should never happen since we validated/populated CAs earlier"
                    );
                    return Ok(Step::Unchanged);
                };
                let challenge = self
                    .processor
                    .bounded(
                        "getting NDES SCEP challenge",
                        self.processor.scep.ndes_challenge(&ndes),
                    )
                    .await
                    .map_err(ndes_failure)
                    .inspect_err(|e| {
                        warn!(host_uuid = %self.host.uuid, run_id = self.run_id, error = %e, "NDES challenge retrieval failed")
                    })?;
                self.replace(contents, var, &challenge)
            }

            FleetVariable::NdesScepProxyUrl => {
                let url = self.proxy_url(&[self.host.uuid.as_str(), self.run_id, NDES_ASSET_NAME]);
                self.replace(contents, var, &url)
            }

            FleetVariable::CustomScepChallenge(ca_name) => {
                let Some(ca) = self.cache.custom_scep.get(ca_name) else {
                    return Ok(self.not_in_cache(CaKind::CustomScepProxy, ca_name));
                };
                self.replace_exact(contents, var, &ca.challenge)
            }

            FleetVariable::CustomScepProxyUrl(ca_name) => {
                if !self.cache.custom_scep.contains_key(ca_name) {
                    return Ok(self.not_in_cache(CaKind::CustomScepProxy, ca_name));
                }
                let challenge = self
                    .processor
                    .bounded(
                        "generating SCEP challenge",
                        self.processor.datastore.new_challenge(),
                    )
                    .await?;
                let url = self.proxy_url(&[
                    self.host.uuid.as_str(),
                    self.run_id,
                    ca_name.as_str(),
                    challenge.as_str(),
                ]);
                self.replace_exact(contents, var, &url)
            }

            FleetVariable::SmallstepScepChallenge(ca_name) => {
                let Some(ca) = self.cache.smallstep.get(ca_name).cloned() else {
                    return Ok(self.not_in_cache(CaKind::Smallstep, ca_name));
                };
                let challenge = self
                    .processor
                    .bounded(
                        "getting Smallstep SCEP challenge",
                        self.processor.scep.smallstep_challenge(&ca),
                    )
                    .await
                    .map_err(|e| match e {
                        FleetVarError::Timeout { .. } => e,
                        other => FleetVarError::smallstep(format!(
                            "Fleet couldn't populate {}. {other}",
                            var.placeholder()
                        )),
                    })?;
                info!(
                    host_uuid = %self.host.uuid,
                    run_id = self.run_id,
                    ca_name = %ca_name,
                    "Retrieved SCEP challenge from Smallstep"
                );
                self.replace_exact(contents, var, &challenge)
            }

            FleetVariable::SmallstepScepProxyUrl(ca_name) => {
                if !self.cache.smallstep.contains_key(ca_name) {
                    return Ok(self.not_in_cache(CaKind::Smallstep, ca_name));
                }
                let url = self.proxy_url(&[self.host.uuid.as_str(), self.run_id, ca_name.as_str()]);
                self.replace_exact(contents, var, &url)
            }

            // Filled in together with the certificate data.
            FleetVariable::DigiCertPassword(_) => Ok(Step::Unchanged),

            FleetVariable::DigiCertData(ca_name) => {
                let Some(ca) = self.cache.digicert.get(ca_name).cloned() else {
                    return Ok(self.not_in_cache(CaKind::DigiCert, ca_name));
                };
                let Some(ca) = self.resolve_digicert_templates(ca).await? else {
                    return Ok(Step::Failed);
                };
                let cert = self
                    .processor
                    .bounded(
                        "getting DigiCert certificate",
                        self.processor.digicert.get_certificate(&ca),
                    )
                    .await
                    .map_err(|e| match e {
                        FleetVarError::Timeout { .. } => e,
                        other => FleetVarError::digicert(format!(
                            "Couldn't get certificate from DigiCert for {}. {other}",
                            ca.name
                        )),
                    })?;
                info!(
                    host_uuid = %self.host.uuid,
                    run_id = self.run_id,
                    ca_name = %ca_name,
                    serial_number = %cert.serial_number,
                    "Issued DigiCert certificate"
                );

                let contents = variables::replace_exact_prefix_variable(
                    self.kind,
                    contents,
                    &var.name(),
                    &cert.pfx_base64(),
                )?;
                let password_var = FleetVariable::DigiCertPassword(ca_name.clone());
                let contents = variables::replace_exact_prefix_variable(
                    self.kind,
                    &contents,
                    &password_var.name(),
                    &cert.password,
                )?;
                Ok(Step::Replaced(contents))
            }

            FleetVariable::Unknown(_) => Ok(Step::Unchanged),
        }
    }

    fn not_in_cache(&self, kind: CaKind, ca_name: &str) -> Step {
        error!(
            ca_name,
            "{kind} CA not found. This error should never happen since we validated/populated CAs earlier"
        );
        Step::Unchanged
    }

    fn replace(&self, contents: &str, var: &FleetVariable, value: &str) -> Result<Step> {
        let replaced = variables::replace_variable(self.kind, contents, &var.name(), value)?;
        Ok(Step::Replaced(replaced))
    }

    fn replace_exact(&self, contents: &str, var: &FleetVariable, value: &str) -> Result<Step> {
        let replaced =
            variables::replace_exact_prefix_variable(self.kind, contents, &var.name(), value)?;
        Ok(Step::Replaced(replaced))
    }

    fn proxy_url(&self, identifier: &[&str]) -> String {
        scep_proxy_url(
            &self.mdm_url,
            &self.processor.config.scep_proxy_path,
            identifier,
        )
    }

    async fn end_user(&mut self) -> Result<Option<HostEndUser>> {
        if let Some(cached) = &self.cache.end_user {
            return Ok(cached.clone());
        }
        let user = self
            .processor
            .bounded(
                "getting host end user",
                self.processor.datastore.host_end_user(self.host),
            )
            .await?;
        self.cache.end_user = Some(user.clone());
        Ok(user)
    }

    /// Value of a host or end-user variable; `None` when the host lacks it.
    async fn host_value(&mut self, var: &FleetVariable) -> Result<Option<String>> {
        let script = self.kind == ContentKind::ShellScript;
        match var {
            FleetVariable::HostUuid => Ok(Some(self.host.uuid.clone())),
            FleetVariable::HostHardwareSerial => {
                Ok(Some(self.host.hardware_serial.clone()).filter(|s| !s.is_empty()))
            }
            FleetVariable::HostEndUserEmailIdp if script => Err(
                FleetVarError::unsupported_in_script("User email not supported in shell scripts"),
            ),
            _ if var.is_end_user_idp() && script => Err(FleetVarError::unsupported_in_script(
                "IDP fields not supported in shell scripts",
            )),
            _ if var.is_end_user_idp() => {
                let Some(user) = self.end_user().await? else {
                    warn!(host_uuid = %self.host.uuid, variable = %var, "There is no IdP user for this host");
                    return Ok(None);
                };
                let value = match var {
                    FleetVariable::HostEndUserEmailIdp => user.idp_email.clone(),
                    FleetVariable::HostEndUserIdpUsername => user.idp_username.clone(),
                    FleetVariable::HostEndUserIdpUsernameLocalPart => {
                        user.idp_username_local_part().to_string()
                    }
                    FleetVariable::HostEndUserIdpGroups => user.idp_groups.join(","),
                    FleetVariable::HostEndUserIdpDepartment => user.idp_department.clone(),
                    _ => String::new(),
                };
                if value.is_empty() {
                    warn!(
                        host_uuid = %self.host.uuid,
                        "Fleet couldn't populate {} for this host",
                        var.placeholder()
                    );
                    return Ok(None);
                }
                Ok(Some(value))
            }
            _ => Err(FleetVarError::internal(format!("{var} is not a host variable"))),
        }
    }

    /// Resolve host variables nested in a CA certificate template field.
    async fn resolve_template(&mut self, item: &str) -> Result<Option<String>> {
        let mut resolved = item.to_string();
        for name in variables::find(item) {
            let var = FleetVariable::parse(&name);
            let is_host_var = matches!(
                var,
                FleetVariable::HostUuid | FleetVariable::HostHardwareSerial
            ) || var.is_end_user_idp();
            if !is_host_var {
                continue;
            }
            let Some(value) = self.host_value(&var).await? else {
                return Ok(None);
            };
            resolved = variables::replace_variable(ContentKind::PlainText, &resolved, &name, &value)?;
        }
        Ok(Some(resolved))
    }

    async fn resolve_digicert_templates(&mut self, mut ca: DigiCertCa) -> Result<Option<DigiCertCa>> {
        let Some(common_name) = self.resolve_template(&ca.certificate_common_name).await? else {
            return Ok(None);
        };
        let Some(seat_id) = self.resolve_template(&ca.certificate_seat_id).await? else {
            return Ok(None);
        };
        let mut upns = Vec::with_capacity(ca.certificate_user_principal_names.len());
        for upn in &ca.certificate_user_principal_names {
            let Some(upn) = self.resolve_template(upn).await? else {
                return Ok(None);
            };
            upns.push(upn);
        }

        ca.certificate_common_name = common_name;
        ca.certificate_seat_id = seat_id;
        ca.certificate_user_principal_names = upns;
        Ok(Some(ca))
    }
}
