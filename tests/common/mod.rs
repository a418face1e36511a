#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use voice_proxy::config::LookupConfig;
use voice_proxy::error::{AppError, Result};
use voice_proxy::source::{Outcome, SourceClient, SourceKind, SourceRequest};
use voice_proxy::types::RawListing;

/// What a scripted source does when called.
#[derive(Clone)]
pub enum Script {
    Records(Vec<RawListing>),
    Transient,
    Permanent,
    /// Answers after a short delay that still fits the budget.
    Slow(Vec<RawListing>),
    /// Never answers; the engine's budget has to cut it off.
    Hang,
}

/// In-memory source with per-source scripts and a call log.
pub struct ScriptedSource {
    scripts: HashMap<SourceKind, Script>,
    /// Answer for the small-page sales probe, when it should differ from the full search.
    fast_sales: Option<Script>,
    fast_page_size: usize,
    configured: bool,
    calls: Mutex<Vec<SourceRequest>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self {
            scripts: HashMap::new(),
            fast_sales: None,
            fast_page_size: test_config().fast_page_size,
            configured: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with(mut self, kind: SourceKind, script: Script) -> Self {
        self.scripts.insert(kind, script);
        self
    }

    pub fn with_fast_sales(mut self, script: Script) -> Self {
        self.fast_sales = Some(script);
        self
    }

    pub fn unconfigured(mut self) -> Self {
        self.configured = false;
        self
    }

    pub fn calls(&self) -> Vec<SourceRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_to(&self, kind: SourceKind) -> usize {
        self.calls().iter().filter(|r| r.kind() == kind).count()
    }
}

#[async_trait]
impl SourceClient for ScriptedSource {
    fn ensure_configured(&self) -> Result<()> {
        if self.configured {
            Ok(())
        } else {
            Err(AppError::config("ESTATE_API_KEY missing"))
        }
    }

    async fn issue(&self, request: &SourceRequest, _budget: Duration) -> Outcome {
        self.calls.lock().unwrap().push(request.clone());

        let kind = request.kind();
        let script = match (&self.fast_sales, kind) {
            (Some(fast), SourceKind::SalesText) if request.page_size == self.fast_page_size => {
                Some(fast.clone())
            }
            _ => self.scripts.get(&kind).cloned(),
        };

        match script {
            None => Outcome::Success(Vec::new()),
            Some(Script::Records(records)) => Outcome::Success(records),
            Some(Script::Transient) => Outcome::TransientFailure,
            Some(Script::Permanent) => Outcome::PermanentFailure,
            Some(Script::Slow(records)) => {
                tokio::time::sleep(Duration::from_millis(40)).await;
                Outcome::Success(records)
            }
            Some(Script::Hang) => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Outcome::Success(Vec::new())
            }
        }
    }
}

/// Engine settings with short budgets so timeout tests stay fast.
pub fn test_config() -> LookupConfig {
    LookupConfig {
        fast_timeout: Duration::from_millis(100),
        full_timeout: Duration::from_millis(200),
        ..LookupConfig::default()
    }
}

pub fn listing(value: Value) -> RawListing {
    serde_json::from_value(value).expect("fixture listing")
}

pub fn sales(ref_id: &str, street: &str, town: &str, price: u64) -> RawListing {
    listing(json!({
        "salesLifecycleId": ref_id,
        "propertyStreet": street,
        "propertyTown": town,
        "propertyPostcode": "LE67 3AB",
        "propertyTypeText": "Semi-detached house",
        "price": price,
        "teamEmail": "sales@agency.example",
        "teamPhone": "01530 000000",
        "responsibleAgentName": "Dana"
    }))
}

pub fn letting(ref_id: &str, street: &str, town: &str, price: u64) -> RawListing {
    listing(json!({
        "lettingsLifecycleId": ref_id,
        "propertyStreet": street,
        "propertyTown": town,
        "price": price,
        "teamEmail": "lettings@agency.example"
    }))
}

pub fn shared(source: ScriptedSource) -> Arc<ScriptedSource> {
    Arc::new(source)
}
