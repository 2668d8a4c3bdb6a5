#![allow(clippy::unwrap_used)]
// End-to-end visitor authorization against a mock controller.

use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wifigate_core::{
    ControllerError, ControllerPlatform, Engine, MailError, Mailer, ManualClock, OutgoingMail,
    PortalConfig, RejectReason, VisitorRegistration, WorkflowState,
};

// ── Helpers ─────────────────────────────────────────────────────────

const WLANS: &str = "/api/s/default/rest/wlanconf";
const VISITOR_WLAN: &str = "/api/s/default/rest/wlanconf/wlan-v";
const STAMGR: &str = "/api/s/default/cmd/stamgr";

/// Keeps every message instead of sending it.
#[derive(Default)]
struct Outbox {
    sent: Mutex<Vec<OutgoingMail>>,
}

impl Outbox {
    fn last_code(&self) -> String {
        let sent = self.sent.lock().unwrap();
        let subject = &sent.last().unwrap().subject;
        subject.rsplit(' ').next().unwrap().to_owned()
    }
}

#[async_trait]
impl Mailer for Outbox {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(mail.clone());
        Ok(())
    }
}

fn ok(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "meta": { "rc": "ok" }, "data": data }))
}

fn visitor_wlan(macs: &[&str]) -> Value {
    json!({
        "_id": "wlan-v",
        "name": "VISITANTES",
        "mac_filter_enabled": true,
        "mac_filter_policy": "allow",
        "mac_filter_list": macs,
    })
}

/// Login, an empty visitor SSID and a PUT that echoes nothing back.
async fn controller() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(WLANS))
        .respond_with(ok(json!([visitor_wlan(&[])])))
        .mount(&server)
        .await;
    server
}

fn engine(server: &MockServer, outbox: Arc<Outbox>, clock: Arc<ManualClock>) -> Engine {
    let mut config = PortalConfig::new(
        Url::parse(&server.uri()).unwrap(),
        "portal",
        SecretString::from("pw".to_string()),
        "VISITANTES",
    );
    config.platform = Some(ControllerPlatform::ClassicController);
    Engine::with_clock(config, outbox, clock)
}

fn ana() -> VisitorRegistration {
    VisitorRegistration {
        name: "Ana".into(),
        email: "ana@example.com".into(),
        phone: "83988887777".into(),
        mac: None,
    }
}

fn ip() -> IpAddr {
    "10.0.0.5".parse().unwrap()
}

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
    ))
}

// ── Scenarios ───────────────────────────────────────────────────────

#[tokio::test]
async fn ana_registers_validates_and_is_authorized() {
    let server = controller().await;
    Mock::given(method("PUT"))
        .and(path(VISITOR_WLAN))
        .and(body_json(json!({
            "mac_filter_list": ["AA:BB:CC:DD:EE:FF"],
            "mac_filter_enabled": true,
            "mac_filter_policy": "allow",
        })))
        .respond_with(ok(json!([visitor_wlan(&["AA:BB:CC:DD:EE:FF"])])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(STAMGR))
        .and(body_json(json!({
            "cmd": "authorize-guest",
            "mac": "AA:BB:CC:DD:EE:FF",
            "minutes": 1440,
        })))
        .respond_with(ok(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let outbox = Arc::new(Outbox::default());
    let engine = engine(&server, Arc::clone(&outbox), clock());
    let workflow = engine.workflow();

    let visitor = workflow.register_visitor(ana()).unwrap();
    assert!(!visitor.authorized);

    let code = workflow
        .issue_code(visitor.id, ip(), "aa-bb-cc-dd-ee-ff")
        .await
        .unwrap();
    assert_eq!(code.mac.as_str(), "AA:BB:CC:DD:EE:FF");
    assert_eq!(code.code.len(), 6);
    assert_eq!(outbox.last_code(), code.code);

    let auth = workflow
        .validate_code(visitor.id, &code.code, "AA:BB:CC:DD:EE:FF")
        .await
        .unwrap();
    assert_eq!(auth.state, WorkflowState::RemoteAuthorized);
    assert!(auth.is_remote_confirmed());
    assert!(auth.visitor.authorized);
    assert!(auth.device.active);
    assert_eq!(auth.device.mac.as_str(), "AA:BB:CC:DD:EE:FF");

    let devices = engine.registry().devices_of(visitor.id);
    assert_eq!(devices.len(), 1);
    assert!(devices[0].active);

    let again = workflow
        .validate_code(visitor.id, &code.code, "AA:BB:CC:DD:EE:FF")
        .await
        .unwrap_err();
    assert_eq!(again.reason, RejectReason::CodeAlreadyUsed);
}

#[tokio::test]
async fn failed_guest_authorization_keeps_device_active() {
    let server = controller().await;
    Mock::given(method("PUT"))
        .and(path(VISITOR_WLAN))
        .respond_with(ok(json!([visitor_wlan(&["AA:BB:CC:DD:EE:FF"])])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(STAMGR))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": { "rc": "error", "msg": "api.err.UnknownStation" },
            "data": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let outbox = Arc::new(Outbox::default());
    let engine = engine(&server, Arc::clone(&outbox), clock());
    let workflow = engine.workflow();
    let visitor = workflow.register_visitor(ana()).unwrap();
    let code = workflow
        .issue_code(visitor.id, ip(), "aa:bb:cc:dd:ee:ff")
        .await
        .unwrap();

    let auth = workflow
        .validate_code(visitor.id, &code.code, "aa:bb:cc:dd:ee:ff")
        .await
        .unwrap();
    assert_eq!(auth.state, WorkflowState::DeviceActive);
    assert!(matches!(
        auth.remote_error,
        Some(ControllerError::RemoteRejected { ref message }) if message == "api.err.UnknownStation"
    ));
    assert!(engine.registry().device(auth.device.id).unwrap().active);
}

#[tokio::test]
async fn fourth_device_waits_for_a_free_slot() {
    let server = controller().await;
    // Empty `data`: the cache is dropped and the next mutation refetches.
    Mock::given(method("PUT"))
        .and(path(VISITOR_WLAN))
        .respond_with(ok(json!([])))
        .expect(4)
        .mount(&server)
        .await;

    let engine = engine(&server, Arc::new(Outbox::default()), clock());
    let workflow = engine.workflow();
    let visitor = workflow.register_visitor(ana()).unwrap();

    let mut admitted = Vec::new();
    for raw in ["aa:bb:cc:dd:ee:01", "aa:bb:cc:dd:ee:02", "aa:bb:cc:dd:ee:03"] {
        admitted.push(workflow.admit_device(visitor.id, raw, None).await.unwrap());
    }

    let rejected = workflow
        .admit_device(visitor.id, "aa:bb:cc:dd:ee:04", Some("tablet".into()))
        .await
        .unwrap_err();
    assert_eq!(rejected.reason, RejectReason::QuotaExceeded);

    workflow.revoke_device(admitted[0].id).await.unwrap();
    let fourth = workflow
        .admit_device(visitor.id, "aa:bb:cc:dd:ee:04", Some("tablet".into()))
        .await
        .unwrap();
    assert_eq!(fourth.friendly_name.as_deref(), Some("tablet"));
    assert_eq!(engine.registry().active_device_count(visitor.id, None), 3);
}

#[tokio::test]
async fn code_from_another_device_is_refused() {
    let server = controller().await;
    Mock::given(method("PUT"))
        .respond_with(ok(json!([])))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(STAMGR))
        .respond_with(ok(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let engine = engine(&server, Arc::new(Outbox::default()), clock());
    let workflow = engine.workflow();
    let visitor = workflow.register_visitor(ana()).unwrap();
    let code = workflow
        .issue_code(visitor.id, ip(), "aa:bb:cc:dd:ee:ff")
        .await
        .unwrap();

    let err = workflow
        .validate_code(visitor.id, &code.code, "11:22:33:44:55:66")
        .await
        .unwrap_err();
    assert_eq!(err.reason, RejectReason::WrongDevice);
    assert!(engine.registry().devices_of(visitor.id).is_empty());
}

#[tokio::test]
async fn code_expires_after_its_window() {
    let server = controller().await;
    let clock = clock();
    let engine = engine(&server, Arc::new(Outbox::default()), Arc::clone(&clock));
    let workflow = engine.workflow();
    let visitor = workflow.register_visitor(ana()).unwrap();
    let code = workflow
        .issue_code(visitor.id, ip(), "aa:bb:cc:dd:ee:ff")
        .await
        .unwrap();

    clock.advance(Duration::from_secs(601));
    let err = workflow
        .validate_code(visitor.id, &code.code, "aa:bb:cc:dd:ee:ff")
        .await
        .unwrap_err();
    assert_eq!(err.reason, RejectReason::CodeExpired);
}

#[tokio::test]
async fn code_can_be_issued_from_the_client_ip() {
    let server = controller().await;
    Mock::given(method("GET"))
        .and(path("/api/s/default/stat/sta"))
        .respond_with(ok(json!([
            { "mac": "aa:bb:cc:dd:ee:ff", "ip": "10.0.0.5", "is_guest": true },
            { "mac": "11:22:33:44:55:66", "ip": "10.0.0.9" },
        ])))
        .mount(&server)
        .await;

    let engine = engine(&server, Arc::new(Outbox::default()), clock());
    let workflow = engine.workflow();
    let visitor = workflow.register_visitor(ana()).unwrap();

    let code = workflow.issue_code_from_ip(visitor.id, ip()).await.unwrap();
    assert_eq!(code.mac.as_str(), "AA:BB:CC:DD:EE:FF");

    let unknown = workflow
        .issue_code_from_ip(visitor.id, "10.0.0.77".parse().unwrap())
        .await
        .unwrap_err();
    assert_eq!(unknown.reason, RejectReason::DeviceNotResolved);
}

#[tokio::test]
async fn deleting_a_visitor_removes_their_active_devices() {
    let server = controller().await;
    Mock::given(method("PUT"))
        .and(path(VISITOR_WLAN))
        .and(body_json(json!({
            "mac_filter_list": ["AA:BB:CC:DD:EE:FF"],
            "mac_filter_enabled": true,
            "mac_filter_policy": "allow",
        })))
        .respond_with(ok(json!([visitor_wlan(&["AA:BB:CC:DD:EE:FF"])])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(VISITOR_WLAN))
        .and(body_json(json!({
            "mac_filter_list": [],
            "mac_filter_enabled": true,
            "mac_filter_policy": "allow",
        })))
        .respond_with(ok(json!([visitor_wlan(&[])])))
        .expect(1)
        .mount(&server)
        .await;

    let engine = engine(&server, Arc::new(Outbox::default()), clock());
    let workflow = engine.workflow();
    let visitor = workflow.register_visitor(ana()).unwrap();
    workflow
        .admit_device(visitor.id, "aa:bb:cc:dd:ee:ff", None)
        .await
        .unwrap();

    engine.registry().delete_visitor(visitor.id).await.unwrap();
    assert!(engine.registry().visitor(visitor.id).is_none());
    assert!(engine.registry().active_macs().is_empty());
}
