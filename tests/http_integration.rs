// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the Gizwits HTTP gateway using wiremock.

#![cfg(feature = "http")]

use std::time::Duration;

use dcrunner_lib::error::GatewayError;
use dcrunner_lib::protocol::{Gateway, GizwitsClient, GizwitsConfig};
use dcrunner_lib::reconcile::{ConfirmationPolicy, WriteOutcome};
use dcrunner_lib::session::SessionBuilder;
use dcrunner_lib::state::PollOutcome;
use dcrunner_lib::types::{AttributeValue, MotorSpeed, PowerState};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const APP_ID: &str = "test-app";
const TOKEN: &str = "test-token";
const DID: &str = "pump-1";

fn client(server: &MockServer) -> GizwitsClient {
    GizwitsConfig::new(APP_ID, TOKEN, DID)
        .with_base_url(server.uri())
        .with_timeout(Duration::from_secs(2))
        .into_client()
        .unwrap()
}

fn latest(switch_on: u8, speed: u8) -> serde_json::Value {
    serde_json::json!({
        "did": DID,
        "updated_at": 1_700_000_000,
        "attr": { "SwitchON": switch_on, "Motor_Speed": speed }
    })
}

async fn mount_latest(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/app/devdata/{DID}/latest")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

// ============================================================================
// Reads
// ============================================================================

mod read_state {
    use super::*;

    #[tokio::test]
    async fn sends_credentials_and_parses_attributes() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!("/app/devdata/{DID}/latest")))
            .and(header("X-Gizwits-Application-Id", APP_ID))
            .and(header("X-Gizwits-User-token", TOKEN))
            .respond_with(ResponseTemplate::new(200).set_body_json(latest(1, 65)))
            .expect(1)
            .mount(&server)
            .await;

        let attrs = client(&server).read_state().await.unwrap();

        assert_eq!(attrs.power(), PowerState::On);
        assert_eq!(attrs.speed().value(), 65);
        assert_eq!(attrs.updated_at().unwrap().timestamp(), 1_700_000_000);
    }

    #[tokio::test]
    async fn legacy_power_field_is_accepted() {
        let server = MockServer::start().await;
        mount_latest(
            &server,
            serde_json::json!({"attr": {"PowerState": false, "Motor_Speed": 30}}),
        )
        .await;

        let attrs = client(&server).read_state().await.unwrap();
        assert_eq!(attrs.power(), PowerState::Off);
    }

    #[tokio::test]
    async fn missing_attribute_is_malformed() {
        let server = MockServer::start().await;
        mount_latest(&server, serde_json::json!({"attr": {"SwitchON": 1}})).await;

        let err = client(&server).read_state().await.unwrap_err();
        assert!(matches!(err, GatewayError::MalformedResponse(ref m) if m.contains("Motor_Speed")));
    }

    #[tokio::test]
    async fn invalid_json_is_malformed() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!("/app/devdata/{DID}/latest")))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .mount(&server)
            .await;

        let err = client(&server).read_state().await.unwrap_err();
        assert!(matches!(err, GatewayError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn server_error_is_unreachable() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client(&server).read_state().await.unwrap_err();
        assert_eq!(
            err,
            GatewayError::Unreachable("HTTP 503 - Service Unavailable".to_string())
        );
    }

    #[tokio::test]
    async fn timeout_is_unreachable() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(latest(1, 50))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client = GizwitsConfig::new(APP_ID, TOKEN, DID)
            .with_base_url(server.uri())
            .with_timeout(Duration::from_millis(100))
            .into_client()
            .unwrap();

        let err = client.read_state().await.unwrap_err();
        assert!(matches!(err, GatewayError::Unreachable(_)));
    }

    #[tokio::test]
    async fn verify_performs_one_read() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!("/app/devdata/{DID}/latest")))
            .respond_with(ResponseTemplate::new(200).set_body_json(latest(0, 40)))
            .expect(1)
            .mount(&server)
            .await;

        let attrs = client(&server).verify().await.unwrap();
        assert_eq!(attrs.power(), PowerState::Off);
    }
}

// ============================================================================
// Writes
// ============================================================================

mod write_attribute {
    use super::*;

    #[tokio::test]
    async fn power_is_sent_as_number() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(format!("/app/control/{DID}")))
            .and(header("X-Gizwits-User-token", TOKEN))
            .and(body_json(serde_json::json!({"attrs": {"SwitchON": 1}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .write_attribute(AttributeValue::Power(PowerState::On))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn speed_is_sent_as_number() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(format!("/app/control/{DID}")))
            .and(body_json(serde_json::json!({"attrs": {"Motor_Speed": 80}})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .write_attribute(AttributeValue::Speed(MotorSpeed::new(80).unwrap()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn refused_command_is_rejected_with_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400).set_body_string(r#"{"error_code":9015}"#),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .write_attribute(AttributeValue::Power(PowerState::Off))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            GatewayError::Rejected {
                status: 400,
                message: r#"{"error_code":9015}"#.to_string(),
            }
        );
    }
}

// ============================================================================
// Bindings
// ============================================================================

mod bindings {
    use super::*;

    #[tokio::test]
    async fn lists_bound_devices() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/app/bindings"))
            .and(query_param("limit", "10"))
            .and(header("X-Gizwits-Application-Id", APP_ID))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "devices": [
                    {"did": DID, "product_name": "DC Runner", "dev_alias": "Return", "is_online": true}
                ]
            })))
            .mount(&server)
            .await;

        let devices = client(&server).bindings().await.unwrap();

        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].did, DID);
        assert_eq!(devices[0].product_name.as_deref(), Some("DC Runner"));
        assert!(devices[0].is_online);
    }

    #[tokio::test]
    async fn unauthorized_is_unreachable() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/app/bindings"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client(&server).bindings().await.unwrap_err();
        assert!(matches!(err, GatewayError::Unreachable(ref m) if m.starts_with("HTTP 401")));
    }
}

// ============================================================================
// Session against the HTTP gateway
// ============================================================================

mod session {
    use super::*;

    fn fast_policy() -> ConfirmationPolicy {
        ConfirmationPolicy::new()
            .with_max_attempts(3)
            .with_step(Duration::from_millis(20))
            .with_max_delay(Duration::from_millis(50))
            .with_override_ttl(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn write_is_confirmed_by_read_back() {
        let server = MockServer::start().await;

        // First read (session start) reports the old speed, later ones the new one.
        Mock::given(method("GET"))
            .and(path(format!("/app/devdata/{DID}/latest")))
            .respond_with(ResponseTemplate::new(200).set_body_json(latest(1, 40)))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        mount_latest(&server, latest(1, 60)).await;

        Mock::given(method("POST"))
            .and(path(format!("/app/control/{DID}")))
            .and(body_json(serde_json::json!({"attrs": {"Motor_Speed": 60}})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let (session, initial) = SessionBuilder::new(client(&server))
            .with_confirmation(fast_policy())
            .start()
            .await
            .unwrap();

        assert!(matches!(initial, PollOutcome::Success(a) if a.speed().value() == 40));

        let handle = session.set_speed(60).await.unwrap();
        assert_eq!(session.speed().unwrap().value(), 60);

        assert_eq!(handle.outcome().await, WriteOutcome::Confirmed { attempts: 1 });
        assert!(session.snapshot().pending.is_empty());
        assert_eq!(session.cache().last_known().unwrap().speed().value(), 60);

        session.shutdown().await;
    }

    #[tokio::test]
    async fn start_succeeds_while_device_is_down() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let (session, initial) = SessionBuilder::new(client(&server)).start().await.unwrap();

        assert!(matches!(initial, PollOutcome::Failure(GatewayError::Unreachable(_))));
        assert!(!session.is_available());
        assert!(session.power().is_none());

        session.shutdown().await;
    }
}
