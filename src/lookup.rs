//! Two-tier lookup engine: fast sales-only probe, then a full three-source fan-out.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use futures_util::future::join3;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cache::{Clock, ResultCache, SystemClock};
use crate::config::LookupConfig;
use crate::deduplication::Aggregator;
use crate::error::Result;
use crate::filter;
use crate::source::{Outcome, SourceClient, SourceKind, SourceRequest};
use crate::types::{LookupResult, Query};

type Gates = StdMutex<HashMap<String, Arc<Mutex<()>>>>;

pub struct LookupEngine {
    source: Arc<dyn SourceClient>,
    config: LookupConfig,
    cache: ResultCache,
    /// One gate per cache key so identical concurrent lookups hit upstream once.
    inflight: Gates,
}

/// Holds one key's gate for the life of a lookup. Dropping it, on completion or
/// cancellation, removes the gate once no other lookup shares it.
struct Inflight<'a> {
    gates: &'a Gates,
    key: String,
    gate: Arc<Mutex<()>>,
}

impl<'a> Inflight<'a> {
    fn enter(gates: &'a Gates, key: &str) -> Self {
        let mut map = gates.lock().unwrap_or_else(|e| e.into_inner());
        let gate = Arc::clone(map.entry(key.to_string()).or_default());
        Self {
            gates,
            key: key.to_string(),
            gate,
        }
    }
}

impl Drop for Inflight<'_> {
    fn drop(&mut self) {
        let mut map = self.gates.lock().unwrap_or_else(|e| e.into_inner());
        let ours = map.get(&self.key).is_some_and(|g| Arc::ptr_eq(g, &self.gate));
        // Map entry plus this handle: nobody else is waiting on the key.
        if ours && Arc::strong_count(&self.gate) <= 2 {
            map.remove(&self.key);
        }
    }
}

impl LookupEngine {
    pub fn new(source: Arc<dyn SourceClient>, config: LookupConfig) -> Self {
        Self::with_clock(source, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        source: Arc<dyn SourceClient>,
        config: LookupConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache = ResultCache::new(config.cache_ttl, clock);
        Self {
            source,
            config,
            cache,
            inflight: StdMutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &LookupConfig {
        &self.config
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Keys with a lookup currently running or queued.
    pub fn in_flight(&self) -> usize {
        self.inflight.lock().map(|map| map.len()).unwrap_or_default()
    }

    /// Resolve a query to candidate listings. Only a configuration problem is an error;
    /// source failures are folded into the result's `transient` flag.
    pub async fn lookup(&self, query: &Query) -> Result<LookupResult> {
        self.source.ensure_configured()?;

        let key = query.cache_key();
        let inflight = Inflight::enter(&self.inflight, &key);

        let result = {
            let _turn = inflight.gate.lock().await;
            match self.cache.get(&key).await {
                Some(cached) => {
                    debug!("[Lookup] cache hit for {}", key);
                    cached
                }
                None => {
                    let fresh = self.run(query).await;
                    self.cache.insert(key.clone(), fresh.clone()).await;
                    fresh
                }
            }
        };

        Ok(result)
    }

    async fn run(&self, query: &Query) -> LookupResult {
        if let Some(result) = self.fast_path(query).await {
            return result;
        }
        self.full_path(query).await
    }

    async fn call(
        &self,
        kind: SourceKind,
        query: &Query,
        page_size: usize,
        budget: Duration,
    ) -> Outcome {
        let request = SourceRequest::new(kind, query, page_size);
        match tokio::time::timeout(budget, self.source.issue(&request, budget)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!("[Lookup] {} exceeded its {:?} budget", kind, budget);
                Outcome::TransientFailure
            }
        }
    }

    /// Tier 0: small sales-only search. Returns a result only when the strict filter keeps
    /// at least one candidate.
    async fn fast_path(&self, query: &Query) -> Option<LookupResult> {
        let outcome = self
            .call(
                SourceKind::SalesText,
                query,
                self.config.fast_page_size,
                self.config.fast_timeout,
            )
            .await;

        let records = match outcome {
            Outcome::Success(records) if !records.is_empty() => records,
            _ => return None,
        };

        let merged = Aggregator::merge([(SourceKind::SalesText, records.as_slice())]);
        let candidates = filter::strict_filter(merged.as_slice(), query);
        if candidates.is_empty() {
            debug!("[Lookup] fast path: {} record(s), none matched", merged.len());
            return None;
        }

        info!("[Lookup] fast path matched {} candidate(s)", candidates.len());
        Some(LookupResult::pack(candidates, false))
    }

    async fn full_path(&self, query: &Query) -> LookupResult {
        let page_size = self.config.full_page_size;
        let budget = self.config.full_timeout;

        let (sales, lettings_fielded, lettings_text) = join3(
            self.call(SourceKind::SalesText, query, page_size, budget),
            self.call(SourceKind::LettingsFielded, query, page_size, budget),
            self.call(SourceKind::LettingsText, query, page_size, budget),
        )
        .await;

        let outcomes = [
            (SourceKind::SalesText, sales),
            (SourceKind::LettingsFielded, lettings_fielded),
            (SourceKind::LettingsText, lettings_text),
        ];
        let transient = outcomes.iter().any(|(_, outcome)| outcome.is_transient());

        let batches: Vec<_> = outcomes
            .into_iter()
            .map(|(kind, outcome)| {
                match &outcome {
                    Outcome::Success(records) => {
                        debug!("[Lookup] {}: {} record(s)", kind, records.len())
                    }
                    Outcome::TransientFailure => debug!("[Lookup] {}: transient failure", kind),
                    Outcome::PermanentFailure => debug!("[Lookup] {}: permanent failure", kind),
                }
                (kind, outcome.into_records())
            })
            .collect();

        let merged =
            Aggregator::merge(batches.iter().map(|(kind, records)| (*kind, records.as_slice())));
        let candidates = filter::select(merged.as_slice(), query, self.config.fallback_limit);

        info!(
            "[Lookup] full path: {} candidate(s) from {} listing(s){}",
            candidates.len(),
            merged.len(),
            if transient { " (transient)" } else { "" }
        );
        LookupResult::pack(candidates, transient)
    }
}
