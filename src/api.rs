use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, http::StatusCode, routing::get, routing::post, Json, Router};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tracing::{info, warn};

use crate::lookup::LookupEngine;
use crate::mailer::{Lead, LeadEmail, LeadMailer};
use crate::types::{Candidate, LookupResult, Market, Query};

pub const MAX_PROPERTIES: usize = 10;
/// Distinct prices offered to the caller when several listings match.
pub const MAX_PRICE_OPTIONS: usize = 4;

pub struct AppState {
    pub engine: LookupEngine,
    pub mailer: Option<Arc<dyn LeadMailer>>,
    pub force_lead_to: Option<String>,
    pub env_name: String,
}

pub fn router(state: Arc<AppState>, request_timeout: Duration) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/tools/route_call", post(route_call))
        .route("/tools/send_lead", post(send_lead))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

async fn health(State(s): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "ok": true,
        "service": "voice-proxy",
        "env": s.env_name,
        "timestamp": Utc::now().to_rfc3339()
    }))
}

#[derive(Debug, Serialize)]
pub struct RouteCallResponse {
    pub ok: bool,
    pub matched: usize,
    pub properties: Vec<Candidate>,
    pub markets_present: Vec<Market>,
    pub need_market_choice: bool,
    pub price_options: Vec<u64>,
}

impl RouteCallResponse {
    pub fn from_result(result: &LookupResult) -> Self {
        let price_options = result
            .candidates
            .iter()
            .filter_map(|c| c.price)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .take(MAX_PRICE_OPTIONS)
            .collect();

        Self {
            ok: true,
            matched: result.candidates.len(),
            properties: result.candidates.iter().take(MAX_PROPERTIES).cloned().collect(),
            markets_present: result.markets_present.clone(),
            need_market_choice: result.sales_count > 0 && result.lettings_count > 0,
            price_options,
        }
    }
}

async fn route_call(
    State(s): State<Arc<AppState>>,
    Json(query): Json<Query>,
) -> (StatusCode, Json<Value>) {
    if query.street.trim().is_empty() || query.town.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"ok": false, "error": "need street and town"})),
        );
    }

    let result = match s.engine.lookup(&query).await {
        Ok(result) => result,
        Err(e) => {
            warn!("[Api] lookup failed: {}", e);
            return (
                StatusCode::OK,
                Json(json!({"ok": false, "transient": false, "error": "lookup_failed"})),
            );
        }
    };

    if result.is_empty() && result.transient {
        return (
            StatusCode::OK,
            Json(json!({"ok": false, "transient": true, "matched": 0})),
        );
    }

    let body = serde_json::to_value(RouteCallResponse::from_result(&result))
        .unwrap_or_else(|_| json!({"ok": false, "transient": false, "error": "lookup_failed"}));
    (StatusCode::OK, Json(body))
}

async fn send_lead(
    State(s): State<Arc<AppState>>,
    Json(lead): Json<Lead>,
) -> (StatusCode, Json<Value>) {
    let to = s
        .force_lead_to
        .clone()
        .unwrap_or_else(|| lead.team_email.trim().to_string());
    if to.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"ok": false, "error": "missing_team_email"})),
        );
    }

    if !lead.has_required_fields() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"ok": false, "error": "missing_required_fields"})),
        );
    }

    let Some(mailer) = s.mailer.as_ref() else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"ok": false, "error": "mailer_not_configured"})),
        );
    };

    let email = LeadEmail::compose(&lead, &to);
    match mailer.send(&email).await {
        Ok(()) => {
            info!("[Api] Lead for ref {} emailed to {}", lead.ref_id, to);
            (StatusCode::OK, Json(json!({"ok": true, "emailed_to": to})))
        }
        Err(e) => {
            warn!("[Api] Lead for ref {} not sent: {}", lead.ref_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"ok": false, "error": "send_lead_failed"})),
            )
        }
    }
}
