use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::EstateConfig;
use crate::error::{AppError, Result};
use crate::source::{Outcome, SearchMode, SourceClient, SourceRequest};
use crate::types::{Market, RawListing};

#[derive(Deserialize)]
struct SearchPage {
    #[serde(default)]
    results: Vec<RawListing>,
}

#[derive(Clone)]
pub struct EstateClient {
    client: Client,
    base_url: String,
    api_key: String,
    key_header: String,
}

impl EstateClient {
    pub fn new(config: &EstateConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.trim().to_string(),
            key_header: config.key_header.clone(),
        }
    }

    fn endpoint(&self, market: Market) -> String {
        match market {
            Market::Sales => format!("{}/sales-properties", self.base_url),
            Market::Lettings => format!("{}/lettings-properties", self.base_url),
        }
    }

    /// Query parameters for one request, in the order the API documents them.
    pub fn params(request: &SourceRequest) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        match request.mode {
            SearchMode::FullText => {
                let text = request.search_text();
                if !text.is_empty() {
                    params.push(("searchText", text));
                }
            }
            SearchMode::Fielded => {
                for (name, value) in [
                    ("propertyStreet", &request.street),
                    ("propertyTown", &request.town),
                    ("propertyPostcode", &request.postcode),
                ] {
                    if !value.is_empty() {
                        params.push((name, value.clone()));
                    }
                }
            }
        }
        if request.on_market_only {
            params.push(("marketingStatus", "OnMarket".to_string()));
        }
        params.push(("pageSize", request.page_size.to_string()));
        params
    }

    async fn fetch(&self, request: &SourceRequest, budget: Duration) -> Result<Vec<RawListing>> {
        let response = self
            .client
            .get(self.endpoint(request.market))
            .header(self.key_header.as_str(), &self.api_key)
            .query(&Self::params(request))
            .timeout(budget)
            .send()
            .await?
            .error_for_status()?;

        let page: SearchPage = response.json().await?;
        Ok(page.results)
    }
}

#[async_trait]
impl SourceClient for EstateClient {
    fn ensure_configured(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(AppError::config("ESTATE_API_KEY missing"));
        }
        Ok(())
    }

    async fn issue(&self, request: &SourceRequest, budget: Duration) -> Outcome {
        match self.fetch(request, budget).await {
            Ok(records) => {
                debug!("[Estate] {}: {} record(s)", request.kind(), records.len());
                Outcome::Success(records)
            }
            Err(AppError::Http(e)) if e.is_timeout() => {
                warn!("[Estate] {} timed out after {:?}", request.kind(), budget);
                Outcome::TransientFailure
            }
            Err(e) => {
                warn!("[Estate] {} failed: {}", request.kind(), e);
                Outcome::PermanentFailure
            }
        }
    }
}
