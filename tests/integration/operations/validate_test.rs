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

//! Integration tests for save-time profile validation

use crate::integration::{FakeDatastore, Harness, free_ctx, premium_ctx};
use fleetvars::types::DigiCertCa;
use fleetvars::variables::NDES_VARIABLES_MISSING_MSG;
use fleetvars::{FleetVarError, Platform};

fn scep_profile(challenge: &str, url: &str, common_name: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>PayloadContent</key>
    <array>
        <dict>
            <key>PayloadContent</key>
            <dict>
                <key>Challenge</key>
                <string>{challenge}</string>
                <key>URL</key>
                <string>{url}</string>
                <key>Subject</key>
                <array>
                    <array>
                        <array>
                            <string>CN</string>
                            <string>{common_name}</string>
                        </array>
                    </array>
                </array>
            </dict>
            <key>PayloadType</key>
            <string>com.apple.security.scep</string>
        </dict>
    </array>
    <key>PayloadType</key>
    <string>Configuration</string>
</dict>
</plist>"#
    )
}

fn pkcs12_profile(password: &str, data: &str) -> String {
    format!(
        r#"<plist version="1.0">
<dict>
    <key>PayloadContent</key>
    <array>
        <dict>
            <key>Password</key>
            <string>{password}</string>
            <key>PayloadContent</key>
            <data>{data}</data>
            <key>PayloadType</key>
            <string>com.apple.security.pkcs12</string>
        </dict>
    </array>
</dict>
</plist>"#
    )
}

fn ndes_harness() -> Harness {
    Harness::new(FakeDatastore::new().with_ndes(Some("hunter2")))
}

#[tokio::test]
async fn test_valid_ndes_profile() {
    let h = ndes_harness();
    let profile = scep_profile(
        "$FLEET_VAR_NDES_SCEP_CHALLENGE",
        "$FLEET_VAR_NDES_SCEP_PROXY_URL",
        "device-$FLEET_VAR_SCEP_RENEWAL_ID",
    );

    h.processor
        .validate_profile(&premium_ctx(), &profile, Platform::Apple)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_ndes_challenge_in_wrong_field() {
    let h = ndes_harness();
    let profile = scep_profile(
        "static $FLEET_VAR_NDES_SCEP_CHALLENGE",
        "$FLEET_VAR_NDES_SCEP_PROXY_URL",
        "device-$FLEET_VAR_SCEP_RENEWAL_ID",
    );

    let err = h
        .processor
        .validate_profile(&premium_ctx(), &profile, Platform::Apple)
        .await
        .unwrap_err();

    assert_eq!(
        err.bad_request_message(),
        Some("Variable \"$FLEET_VAR_NDES_SCEP_CHALLENGE\" must be in the SCEP certificate's \"Challenge\" field.")
    );
}

#[tokio::test]
async fn test_renewal_id_outside_common_name() {
    let h = ndes_harness();
    let profile = scep_profile(
        "$FLEET_VAR_NDES_SCEP_CHALLENGE",
        "$FLEET_VAR_NDES_SCEP_PROXY_URL",
        "device",
    )
    .replace(
        "<key>PayloadType</key>\n    <string>Configuration</string>",
        "<key>PayloadDescription</key>\n    <string>$FLEET_VAR_SCEP_RENEWAL_ID</string>",
    );

    let err = h
        .processor
        .validate_profile(&premium_ctx(), &profile, Platform::Apple)
        .await
        .unwrap_err();

    assert_eq!(
        err.bad_request_message(),
        Some("Variable $FLEET_VAR_SCEP_RENEWAL_ID must be in the SCEP certificate's common name (CN).")
    );
}

#[tokio::test]
async fn test_windows_skips_payload_checks() {
    let h = ndes_harness();

    // Windows profiles carry no Apple payloads
    h.processor
        .validate_profile(
            &premium_ctx(),
            "<Replace><Data>$FLEET_VAR_NDES_SCEP_CHALLENGE</Data><Data>$FLEET_VAR_NDES_SCEP_PROXY_URL</Data>\
             <Data>CN=$FLEET_VAR_SCEP_RENEWAL_ID</Data></Replace>",
            Platform::Windows,
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_windows_ndes_requires_renewal_id() {
    let h = ndes_harness();

    let err = h
        .processor
        .validate_profile(
            &premium_ctx(),
            "<Replace><Data>$FLEET_VAR_NDES_SCEP_CHALLENGE</Data><Data>$FLEET_VAR_NDES_SCEP_PROXY_URL</Data></Replace>",
            Platform::Windows,
        )
        .await
        .unwrap_err();

    assert_eq!(err.bad_request_message(), Some(NDES_VARIABLES_MISSING_MSG));
}

#[tokio::test]
async fn test_custom_scep_unknown_ca() {
    let h = Harness::new(FakeDatastore::new().with_custom_scep("corp", Some("secret")));
    let profile = scep_profile(
        "$FLEET_VAR_CUSTOM_SCEP_CHALLENGE_other",
        "$FLEET_VAR_CUSTOM_SCEP_PROXY_URL_other",
        "$FLEET_VAR_SCEP_RENEWAL_ID",
    );

    let err = h
        .processor
        .validate_profile(&premium_ctx(), &profile, Platform::Apple)
        .await
        .unwrap_err();

    assert!(err.is_client_error());
    assert!(err.to_string().contains("$FLEET_VAR_CUSTOM_SCEP_CHALLENGE_other"));
}

#[tokio::test]
async fn test_digicert_outside_pkcs12_payload() {
    let h = Harness::new(FakeDatastore::new().with_digicert(
        DigiCertCa {
            name: "acme".into(),
            ..Default::default()
        },
        Some("token-1"),
    ));

    let valid = pkcs12_profile("$FLEET_VAR_DIGICERT_PASSWORD_acme", "$FLEET_VAR_DIGICERT_DATA_acme");
    h.processor
        .validate_profile(&premium_ctx(), &valid, Platform::Apple)
        .await
        .unwrap();

    let misplaced = scep_profile(
        "$FLEET_VAR_DIGICERT_PASSWORD_acme",
        "$FLEET_VAR_DIGICERT_DATA_acme",
        "device",
    );
    let err = h
        .processor
        .validate_profile(&premium_ctx(), &misplaced, Platform::Apple)
        .await
        .unwrap_err();
    assert_eq!(
        err.bad_request_message(),
        Some(
            "Variables $FLEET_VAR_DIGICERT_PASSWORD_acme and $FLEET_VAR_DIGICERT_DATA_acme can only be included in the 'com.apple.security.pkcs12' payload under Password and PayloadContent, respectively."
        )
    );
}

#[tokio::test]
async fn test_free_license_rejected() {
    let h = ndes_harness();
    let profile = scep_profile(
        "$FLEET_VAR_NDES_SCEP_CHALLENGE",
        "$FLEET_VAR_NDES_SCEP_PROXY_URL",
        "$FLEET_VAR_SCEP_RENEWAL_ID",
    );

    let err = h
        .processor
        .validate_profile(&free_ctx(), &profile, Platform::Apple)
        .await
        .unwrap_err();

    assert!(matches!(err, FleetVarError::MissingLicense));
    assert_eq!(h.datastore.calls.total(), 0);
}

#[tokio::test]
async fn test_profile_without_variables() {
    let h = ndes_harness();
    let profile = scep_profile("static", "https://scep.example.com", "device");

    h.processor
        .validate_profile(&free_ctx(), &profile, Platform::Apple)
        .await
        .unwrap();
    assert_eq!(h.datastore.calls.total(), 0);
}
