//! Integration test utilities and helpers
//!
//! This module provides in-memory collaborators for the Fleet variable
//! processor, recording how often each one is called, plus mock NDES and
//! Smallstep servers built on wiremock.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fleetvars::types::{
    AppConfig, CaAssetKind, CaConfigAsset, CustomScepProxyCa, DigiCertCa, DigiCertCertificate,
    HostEndUser, HostInfo, LicenseInfo, NdesScepProxyCa, SmallstepScepProxyCa,
};
use fleetvars::{
    Datastore, DigiCertService, ExecutionContext, FleetVarError, FleetVarProcessor, NdesError,
    ProcessorConfig, Result, ScepChallengeService,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SERVER_URL: &str = "https://fleet.example.com";
pub const HOST_UUID: &str = "A1B2-C3D4";
pub const HOST_SERIAL: &str = "C02ABC123";

/// Path of the NDES admin page on the mock server
pub const PATH_NDES_ADMIN: &str = "/certsrv/mscep_admin/";
/// Path of the Smallstep challenge webhook on the mock server
pub const PATH_SMALLSTEP_WEBHOOK: &str = "/webhook/challenge";

/// Counts calls per collaborator operation
#[derive(Debug, Default)]
pub struct CallCounter(Mutex<HashMap<&'static str, usize>>);

impl CallCounter {
    pub fn record(&self, operation: &'static str) {
        let mut calls = self.0.lock().unwrap();
        *calls.entry(operation).or_default() += 1;
    }

    pub fn count(&self, operation: &str) -> usize {
        self.0.lock().unwrap().get(operation).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.0.lock().unwrap().values().sum()
    }
}

/// In-memory datastore
pub struct FakeDatastore {
    pub app_config: AppConfig,
    pub assets: HashMap<(String, CaAssetKind), String>,
    pub end_user: Option<HostEndUser>,
    pub calls: CallCounter,
    challenges: AtomicUsize,
}

impl FakeDatastore {
    pub fn new() -> Self {
        Self {
            app_config: AppConfig::new(SERVER_URL).unwrap(),
            assets: HashMap::new(),
            end_user: None,
            calls: CallCounter::default(),
            challenges: AtomicUsize::new(0),
        }
    }

    pub fn with_ndes(mut self, password: Option<&str>) -> Self {
        self.app_config.integrations.ndes_scep_proxy = Some(NdesScepProxyCa {
            url: "https://ndes.example.com/certsrv/mscep/mscep.dll".into(),
            admin_url: format!("https://ndes.example.com{PATH_NDES_ADMIN}"),
            username: "svc-ndes".into(),
            password: String::new(),
        });
        if let Some(password) = password {
            self.assets
                .insert(("NDES".into(), CaAssetKind::NdesPassword), password.into());
        }
        self
    }

    pub fn with_custom_scep(mut self, name: &str, challenge: Option<&str>) -> Self {
        self.app_config
            .integrations
            .custom_scep_proxy
            .push(CustomScepProxyCa {
                name: name.into(),
                url: format!("https://scep.example.com/{name}"),
                challenge: String::new(),
            });
        if let Some(challenge) = challenge {
            self.assets.insert(
                (name.into(), CaAssetKind::CustomScepChallenge),
                challenge.into(),
            );
        }
        self
    }

    pub fn with_digicert(mut self, ca: DigiCertCa, api_token: Option<&str>) -> Self {
        if let Some(token) = api_token {
            self.assets.insert(
                (ca.name.clone(), CaAssetKind::DigiCertApiToken),
                token.into(),
            );
        }
        self.app_config.integrations.digicert.push(ca);
        self
    }

    pub fn with_smallstep(mut self, name: &str, password: Option<&str>) -> Self {
        self.app_config.integrations.smallstep.push(SmallstepScepProxyCa {
            name: name.into(),
            url: format!("https://step.example.com/scep/{name}"),
            challenge_url: format!("https://step.example.com{PATH_SMALLSTEP_WEBHOOK}"),
            username: "svc-step".into(),
            password: String::new(),
        });
        if let Some(password) = password {
            self.assets
                .insert((name.into(), CaAssetKind::SmallstepPassword), password.into());
        }
        self
    }

    pub fn with_end_user(mut self, user: HostEndUser) -> Self {
        self.end_user = Some(user);
        self
    }
}

#[async_trait]
impl Datastore for FakeDatastore {
    async fn app_config(&self) -> Result<AppConfig> {
        self.calls.record("app_config");
        Ok(self.app_config.clone())
    }

    async fn ca_config_asset(&self, name: &str, kind: CaAssetKind) -> Result<Option<CaConfigAsset>> {
        self.calls.record("ca_config_asset");
        Ok(self
            .assets
            .get(&(name.to_string(), kind))
            .map(|value| CaConfigAsset::new(name, kind, value.as_bytes())))
    }

    async fn new_challenge(&self) -> Result<String> {
        self.calls.record("new_challenge");
        let n = self.challenges.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("challenge-{n}"))
    }

    async fn host_end_user(&self, _host: &HostInfo) -> Result<Option<HostEndUser>> {
        self.calls.record("host_end_user");
        Ok(self.end_user.clone())
    }
}

/// Scripted SCEP challenge service
pub struct FakeScep {
    pub ndes: std::result::Result<String, NdesError>,
    pub smallstep: std::result::Result<String, String>,
    pub delay: Option<Duration>,
    pub calls: CallCounter,
    pub ndes_passwords: Mutex<Vec<String>>,
}

impl FakeScep {
    pub fn new() -> Self {
        Self {
            ndes: Ok("NDES-CHALLENGE".into()),
            smallstep: Ok("STEP-CHALLENGE".into()),
            delay: None,
            calls: CallCounter::default(),
            ndes_passwords: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_ndes(error: NdesError) -> Self {
        Self {
            ndes: Err(error),
            ..Self::new()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new()
        }
    }
}

#[async_trait]
impl ScepChallengeService for FakeScep {
    async fn ndes_challenge(&self, ca: &NdesScepProxyCa) -> Result<String> {
        self.calls.record("ndes_challenge");
        self.ndes_passwords.lock().unwrap().push(ca.password.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.ndes.clone().map_err(FleetVarError::from)
    }

    async fn smallstep_challenge(&self, _ca: &SmallstepScepProxyCa) -> Result<String> {
        self.calls.record("smallstep_challenge");
        self.smallstep.clone().map_err(FleetVarError::smallstep)
    }
}

/// DigiCert service that records the CA configurations it was given
pub struct FakeDigiCert {
    pub fail: Option<String>,
    pub requests: Mutex<Vec<DigiCertCa>>,
}

impl FakeDigiCert {
    pub fn new() -> Self {
        Self {
            fail: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            fail: Some(msg.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> DigiCertCa {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl DigiCertService for FakeDigiCert {
    async fn get_certificate(&self, ca: &DigiCertCa) -> Result<DigiCertCertificate> {
        self.requests.lock().unwrap().push(ca.clone());
        if let Some(msg) = &self.fail {
            return Err(FleetVarError::digicert(msg.clone()));
        }
        Ok(DigiCertCertificate {
            pfx_data: vec![1, 2, 3],
            password: "pfx-pass".into(),
            serial_number: "0A1B".into(),
            not_valid_before: 1_700_000_000,
            not_valid_after: 1_800_000_000,
        })
    }
}

/// A processor wired to fakes, keeping handles for assertions
pub struct Harness {
    pub processor: FleetVarProcessor,
    pub datastore: Arc<FakeDatastore>,
    pub scep: Arc<FakeScep>,
    pub digicert: Arc<FakeDigiCert>,
}

impl Harness {
    pub fn new(datastore: FakeDatastore) -> Self {
        Self::with(datastore, FakeScep::new(), FakeDigiCert::new(), ProcessorConfig::default())
    }

    pub fn with(
        datastore: FakeDatastore,
        scep: FakeScep,
        digicert: FakeDigiCert,
        config: ProcessorConfig,
    ) -> Self {
        let datastore = Arc::new(datastore);
        let scep = Arc::new(scep);
        let digicert = Arc::new(digicert);
        let processor = FleetVarProcessor::new(
            config,
            datastore.clone(),
            scep.clone(),
            digicert.clone(),
        );
        Self {
            processor,
            datastore,
            scep,
            digicert,
        }
    }
}

/// Execution context for the test host with a premium license
pub fn premium_ctx() -> ExecutionContext {
    ExecutionContext::new(HostInfo::new(7, HOST_UUID, HOST_SERIAL), LicenseInfo::premium())
}

/// Execution context for the test host with a free license
pub fn free_ctx() -> ExecutionContext {
    ExecutionContext::new(HostInfo::new(7, HOST_UUID, HOST_SERIAL), LicenseInfo::free())
}

/// Mock NDES / Smallstep server
pub struct MockScepServer {
    server: MockServer,
}

impl MockScepServer {
    /// Create a new mock server
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Get the base URL of the mock server
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Get a reference to the inner MockServer for custom mocking
    pub fn inner(&self) -> &MockServer {
        &self.server
    }

    pub fn ndes_ca(&self) -> NdesScepProxyCa {
        NdesScepProxyCa {
            url: format!("{}/certsrv/mscep/mscep.dll", self.url()),
            admin_url: format!("{}{PATH_NDES_ADMIN}", self.url()),
            username: "svc-ndes".into(),
            password: "hunter2".into(),
        }
    }

    pub fn smallstep_ca(&self) -> SmallstepScepProxyCa {
        SmallstepScepProxyCa {
            name: "step".into(),
            url: "https://step.example.com/scep/step".into(),
            challenge_url: format!("{}{PATH_SMALLSTEP_WEBHOOK}", self.url()),
            username: "svc-step".into(),
            password: "s3cret".into(),
        }
    }

    /// Mock the NDES admin page with the given status and body
    pub async fn mock_ndes_admin(&self, status: u16, body: Vec<u8>) {
        Mock::given(method("GET"))
            .and(path(PATH_NDES_ADMIN))
            .respond_with(ResponseTemplate::new(status).set_body_bytes(body))
            .mount(&self.server)
            .await;
    }

    /// Mock the Smallstep webhook with the given status and body
    pub async fn mock_smallstep(&self, status: u16, body: &str) {
        Mock::given(method("POST"))
            .and(path(PATH_SMALLSTEP_WEBHOOK))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&self.server)
            .await;
    }
}

/// An NDES admin page that hands out `challenge`
pub fn ndes_page(challenge: &str) -> String {
    format!(
        "<HTML><Head><Meta HTTP-Equiv=\"Content-Type\" Content=\"text/html; charset=UTF-16\">\
         <Title>Network Device Enrollment Service</Title></Head>\
         <Body><P> The thumbprint (hash value) for the CA certificate is: <B> 1A2B3C </B>\
         <P> The enrollment challenge password is: <B> {challenge} </B>\
         <P> This password can be used only once.</Body></HTML>"
    )
}

/// Encode text as UTF-16 LE with a byte order mark
pub fn utf16le_with_bom(text: &str) -> Vec<u8> {
    let mut out = vec![0xFF, 0xFE];
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    out
}
