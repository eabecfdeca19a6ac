//! SCEP challenge retrieval from NDES and Smallstep.
//!
//! NDES hands out one-time challenges through its `mscep_admin` page; the
//! challenge is scraped from the returned HTML. Smallstep issues challenges
//! through a webhook.

use async_trait::async_trait;
use encoding_rs::{Encoding, UTF_8, UTF_16LE, WINDOWS_1252};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{NdesError, Result};
use crate::types::{NdesScepProxyCa, SmallstepScepProxyCa};

/// Text NDES shows when its password cache is exhausted.
pub const NDES_PASSWORD_CACHE_FULL: &str = "The password cache is full.";
/// Text NDES shows when the account may not enroll.
pub const NDES_INSUFFICIENT_PERMISSIONS: &str =
    "You do not have sufficient permission to enroll with SCEP.";

static CHALLENGE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)The enrollment challenge password is: <B> (?P<password>\S*)")
        .expect("challenge pattern is valid")
});

const META_PRESCAN_LEN: usize = 1024;

static CONTENT_TYPE_CHARSET_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)charset\s*=\s*"?([^";\s]+)"#).expect("charset pattern is valid")
});

static META_CHARSET_REGEX: Lazy<regex::bytes::Regex> = Lazy::new(|| {
    regex::bytes::Regex::new(r#"(?i-u)<meta[^>]*charset\s*=\s*["']?([A-Za-z0-9_.:-]+)"#)
        .expect("meta charset pattern is valid")
});

/// Obtains SCEP challenges from external certificate authorities.
#[async_trait]
pub trait ScepChallengeService: Send + Sync {
    /// Fetch a one-time challenge from the NDES admin page.
    ///
    /// Failures are reported as [`FleetVarError::Ndes`](crate::FleetVarError::Ndes)
    /// with a classified [`NdesError`].
    async fn ndes_challenge(&self, ca: &NdesScepProxyCa) -> Result<String>;

    /// Fetch a challenge from a Smallstep webhook.
    async fn smallstep_challenge(&self, ca: &SmallstepScepProxyCa) -> Result<String>;
}

/// Whether a response body looks like UTF-16 LE.
///
/// Windows NDES servers answer in UTF-16 LE, often without a BOM.
pub fn looks_like_utf16le(body: &[u8]) -> bool {
    if body.len() < 4 {
        return false;
    }
    if body.starts_with(&[0xFF, 0xFE]) || body.starts_with(&[b'<', 0x00]) {
        return true;
    }

    let sample = &body[..body.len().min(100)];
    let checked = sample.len() / 2;
    let nulls = sample.iter().skip(1).step_by(2).filter(|&&b| b == 0).count();
    checked > 0 && nulls * 10 >= checked * 9
}

/// Decode an NDES admin page body to text.
///
/// UTF-16 LE is detected first, then the encoding is taken from a BOM, the
/// `Content-Type` charset, or a `<meta>` charset in the first 1024 bytes.
/// Bodies with no declared encoding are read as UTF-8, falling back to
/// windows-1252 when they are not valid UTF-8.
pub fn decode_html_response(body: &[u8], content_type: Option<&str>) -> String {
    if looks_like_utf16le(body) {
        let (text, _) = UTF_16LE.decode_with_bom_removal(body);
        return text.into_owned();
    }

    let encoding = Encoding::for_bom(body)
        .map(|(encoding, _)| encoding)
        .or_else(|| content_type.and_then(charset_label).and_then(Encoding::for_label))
        .or_else(|| {
            let head = &body[..body.len().min(META_PRESCAN_LEN)];
            META_CHARSET_REGEX
                .captures(head)
                .and_then(|caps| caps.get(1))
                .and_then(|m| Encoding::for_label(m.as_bytes()))
                // An ASCII-compatible page cannot really be UTF-16
                .map(Encoding::output_encoding)
        });

    let encoding = match encoding {
        Some(encoding) => encoding,
        None if std::str::from_utf8(body).is_ok() => UTF_8,
        None => WINDOWS_1252,
    };
    let (text, _, _) = encoding.decode(body);
    text.into_owned()
}

fn charset_label(content_type: &str) -> Option<&[u8]> {
    CONTENT_TYPE_CHARSET_REGEX
        .captures(content_type)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().as_bytes())
}

/// Extract the challenge from a decoded NDES admin page.
///
/// # Errors
///
/// Classifies the page when no challenge is present.
pub fn parse_ndes_challenge(html: &str) -> std::result::Result<String, NdesError> {
    let challenge = CHALLENGE_REGEX
        .captures(html)
        .and_then(|caps| caps.name("password"))
        .map(|m| m.as_str())
        .unwrap_or_default();
    if !challenge.is_empty() {
        return Ok(challenge.to_string());
    }

    if html.contains(NDES_PASSWORD_CACHE_FULL) {
        return Err(NdesError::PasswordCacheFull(
            "the password cache is full; please increase the number of cached passwords in NDES; \
             by default, NDES caches 5 passwords and they expire 60 minutes after they are created"
                .into(),
        ));
    }
    if html.contains(NDES_INSUFFICIENT_PERMISSIONS) {
        return Err(NdesError::InsufficientPermissions(
            "this account does not have sufficient permissions to enroll with SCEP. \
             Please use a different account with NDES SCEP enroll permissions."
                .into(),
        ));
    }
    Err(NdesError::InvalidCredentials(
        "could not retrieve the enrollment challenge password; invalid admin URL or credentials; \
         please correct and try again"
            .into(),
    ))
}

#[cfg(feature = "scep-client")]
pub use http::ScepConfigClient;

#[cfg(feature = "scep-client")]
mod http {
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    use async_trait::async_trait;
    use reqwest::StatusCode;
    use reqwest::header::CONTENT_TYPE;
    use serde::Serialize;
    use tracing::{debug, warn};

    use super::{ScepChallengeService, decode_html_response, parse_ndes_challenge};
    use crate::apple::SCEP_PAYLOAD_TYPE;
    use crate::config::ProcessorConfig;
    use crate::USER_AGENT;
    use crate::error::{FleetVarError, NdesError, Result};
    use crate::types::{NdesScepProxyCa, SmallstepScepProxyCa};

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    struct SmallstepWebhook<'a> {
        id: u32,
        webhook_event: &'a str,
        event_timestamp: u64,
        name: &'a str,
    }

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    struct SmallstepEvent<'a> {
        scep_server_url: &'a str,
        payload_identifier: String,
        payload_types: [&'a str; 1],
    }

    #[derive(Debug, Serialize)]
    struct SmallstepChallengeRequest<'a> {
        webhook: SmallstepWebhook<'a>,
        event: SmallstepEvent<'a>,
    }

    /// HTTP implementation of [`ScepChallengeService`].
    ///
    /// NTLM negotiation is not supported; the NDES admin page must accept
    /// basic authentication.
    #[derive(Debug, Clone)]
    pub struct ScepConfigClient {
        http: reqwest::Client,
    }

    impl ScepConfigClient {
        /// Create a client whose requests time out after `timeout`.
        ///
        /// # Errors
        ///
        /// Returns an error if the HTTP client cannot be built.
        pub fn new(timeout: Duration) -> Result<Self> {
            let http = reqwest::Client::builder()
                .timeout(timeout)
                .user_agent(USER_AGENT)
                .build()?;
            Ok(Self { http })
        }

        /// Create a client using the NDES timeout of `config`.
        ///
        /// # Errors
        ///
        /// Returns an error if the HTTP client cannot be built.
        pub fn from_config(config: &ProcessorConfig) -> Result<Self> {
            Self::new(config.ndes_timeout)
        }
    }

    #[async_trait]
    impl ScepChallengeService for ScepConfigClient {
        async fn ndes_challenge(&self, ca: &NdesScepProxyCa) -> Result<String> {
            debug!(admin_url = %ca.admin_url, "GET NDES challenge");
            let response = self
                .http
                .get(&ca.admin_url)
                .basic_auth(&ca.username, Some(&ca.password))
                .send()
                .await
                .map_err(|e| NdesError::Other(format!("sending request: {e}")))?;

            let status = response.status();
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);
            if status != StatusCode::OK {
                warn!(status = status.as_u16(), "NDES admin page rejected request");
                return Err(NdesError::InvalidCredentials(format!(
                    "unexpected status code: {}; could not retrieve the enrollment challenge password; \
                     invalid admin URL or credentials; please correct and try again",
                    status.as_u16()
                ))
                .into());
            }

            let body = response
                .bytes()
                .await
                .map_err(|e| NdesError::Other(format!("reading response body: {e}")))?;
            let html = decode_html_response(&body, content_type.as_deref());
            Ok(parse_ndes_challenge(&html)?)
        }

        async fn smallstep_challenge(&self, ca: &SmallstepScepProxyCa) -> Result<String> {
            let event_timestamp = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default();
            let request = SmallstepChallengeRequest {
                webhook: SmallstepWebhook {
                    id: 1,
                    webhook_event: "SCEPChallenge",
                    event_timestamp,
                    name: "SCEPChallenge",
                },
                event: SmallstepEvent {
                    scep_server_url: &ca.url,
                    payload_identifier: uuid::Uuid::new_v4().to_string(),
                    payload_types: [SCEP_PAYLOAD_TYPE],
                },
            };

            debug!(ca_name = %ca.name, challenge_url = %ca.challenge_url, "POST Smallstep challenge");
            let response = self
                .http
                .post(&ca.challenge_url)
                .basic_auth(&ca.username, Some(&ca.password))
                .json(&request)
                .send()
                .await
                .map_err(|e| FleetVarError::smallstep(format!("sending request: {e}")))?;

            let status = response.status();
            if status != StatusCode::OK {
                return Err(FleetVarError::smallstep(format!(
                    "getting Smallstep SCEP challenge: status code {}",
                    status.as_u16()
                )));
            }

            response
                .text()
                .await
                .map_err(|e| FleetVarError::smallstep(format!("reading response body: {e}")))
        }
    }
}
