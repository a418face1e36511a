mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use common::{letting, sales, shared, test_config, Script, ScriptedSource};
use serde_json::{json, Value};
use tower::ServiceExt;
use voice_proxy::api::{router, AppState};
use voice_proxy::error::{AppError, Result};
use voice_proxy::mailer::{LeadEmail, LeadMailer};
use voice_proxy::source::SourceKind;
use voice_proxy::LookupEngine;

#[derive(Default)]
struct RecordingMailer {
    fail: bool,
    sent: Mutex<Vec<LeadEmail>>,
}

#[async_trait]
impl LeadMailer for RecordingMailer {
    async fn send(&self, email: &LeadEmail) -> Result<()> {
        if self.fail {
            return Err(AppError::mail("rejected"));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

fn app(
    source: ScriptedSource,
    mailer: Option<Arc<RecordingMailer>>,
    force_lead_to: Option<&str>,
) -> Router {
    let engine = LookupEngine::new(shared(source), test_config());
    let state = Arc::new(AppState {
        engine,
        mailer: mailer.map(|m| m as Arc<dyn LeadMailer>),
        force_lead_to: force_lead_to.map(str::to_string),
        env_name: "test".to_string(),
    });
    router(state, Duration::from_secs(8))
}

async fn post(app: Router, path: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn lead() -> Value {
    json!({
        "refId": "S1",
        "address": "12 Station Road, Coalville",
        "responsibleAgentName": "Dana",
        "teamEmail": "sales@agency.example",
        "caller_name": "Sam",
        "caller_phone": "07700 900123",
        "notes": "Wants a Saturday viewing"
    })
}

#[tokio::test]
async fn test_healthz() {
    let response = app(ScriptedSource::new(), None, None)
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["service"], "voice-proxy");
    assert_eq!(body["env"], "test");
}

#[tokio::test]
async fn test_route_call_requires_street_and_town() {
    let (status, body) = post(
        app(ScriptedSource::new(), None, None),
        "/tools/route_call",
        json!({"street": "Station Road"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "need street and town");
}

#[tokio::test]
async fn test_route_call_match() {
    let source = ScriptedSource::new()
        .with_fast_sales(Script::Transient)
        .with(
            SourceKind::SalesText,
            Script::Records(vec![
                sales("S1", "12 Station Road", "Coalville", 205_000),
                sales("S2", "14 Station Road", "Coalville", 195_000),
            ]),
        )
        .with(
            SourceKind::LettingsText,
            Script::Records(vec![letting("L1", "3 Station Road", "Coalville", 950)]),
        );

    let (status, body) = post(
        app(source, None, None),
        "/tools/route_call",
        json!({"street": "Station Road", "town": "Coalville"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["matched"], 3);
    assert_eq!(body["need_market_choice"], true);
    assert_eq!(body["markets_present"], json!(["sales", "lettings"]));
    assert_eq!(body["price_options"], json!([950, 195000, 205000]));
    let first = &body["properties"][0];
    assert_eq!(first["refId"], "S1");
    assert_eq!(first["market"], "sales");
    assert_eq!(first["teamEmail"], "sales@agency.example");
    assert_eq!(first["propertyTypeText"], "Semi-detached house");
}

#[tokio::test]
async fn test_route_call_accepts_numeric_price_and_null_fields() {
    let source = ScriptedSource::new().with(
        SourceKind::SalesText,
        Script::Records(vec![
            sales("S1", "12 Station Road", "Coalville", 205_000),
            sales("S2", "14 Station Road", "Coalville", 400_000),
        ]),
    );

    let (status, body) = post(
        app(source, None, None),
        "/tools/route_call",
        json!({"street": "Station Road", "town": "Coalville", "postcode": null, "price": 200000}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["matched"], 1);
    assert_eq!(body["properties"][0]["refId"], "S1");
}

#[tokio::test]
async fn test_route_call_transient_empty() {
    let source = ScriptedSource::new().with(SourceKind::LettingsFielded, Script::Hang);
    let (status, body) = post(
        app(source, None, None),
        "/tools/route_call",
        json!({"street": "Station Road", "town": "Coalville"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": false, "transient": true, "matched": 0}));
}

#[tokio::test]
async fn test_route_call_confirmed_empty() {
    let (status, body) = post(
        app(ScriptedSource::new(), None, None),
        "/tools/route_call",
        json!({"street": "Station Road", "town": "Coalville"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["matched"], 0);
    assert_eq!(body["need_market_choice"], false);
}

#[tokio::test]
async fn test_route_call_configuration_error() {
    let (status, body) = post(
        app(ScriptedSource::new().unconfigured(), None, None),
        "/tools/route_call",
        json!({"street": "Station Road", "town": "Coalville"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": false, "transient": false, "error": "lookup_failed"}));
}

#[tokio::test]
async fn test_send_lead_delivers() {
    let mailer = Arc::new(RecordingMailer::default());
    let (status, body) = post(
        app(ScriptedSource::new(), Some(mailer.clone()), None),
        "/tools/send_lead",
        lead(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true, "emailed_to": "sales@agency.example"}));
    let sent = mailer.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "[PROPERTY ENQUIRY] 12 Station Road, Coalville (Ref S1)");
}

#[tokio::test]
async fn test_send_lead_forced_recipient() {
    let mailer = Arc::new(RecordingMailer::default());
    let mut body = lead();
    body["teamEmail"] = json!("");
    let (status, body) = post(
        app(ScriptedSource::new(), Some(mailer.clone()), Some("inbox@agency.example")),
        "/tools/send_lead",
        body,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["emailed_to"], "inbox@agency.example");
    assert_eq!(mailer.sent.lock().unwrap()[0].to, "inbox@agency.example");
}

#[tokio::test]
async fn test_send_lead_validation() {
    let mut no_team = lead();
    no_team["teamEmail"] = json!("");
    let (status, body) = post(
        app(ScriptedSource::new(), Some(Arc::default()), None),
        "/tools/send_lead",
        no_team,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "missing_team_email");

    let mut no_phone = lead();
    no_phone["caller_phone"] = json!("");
    let (status, body) = post(
        app(ScriptedSource::new(), Some(Arc::default()), None),
        "/tools/send_lead",
        no_phone,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "missing_required_fields");
}

#[tokio::test]
async fn test_send_lead_mailer_states() {
    let (status, body) = post(app(ScriptedSource::new(), None, None), "/tools/send_lead", lead()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "mailer_not_configured");

    let failing = Arc::new(RecordingMailer {
        fail: true,
        ..RecordingMailer::default()
    });
    let (status, body) = post(
        app(ScriptedSource::new(), Some(failing), None),
        "/tools/send_lead",
        lead(),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "send_lead_failed");
}
