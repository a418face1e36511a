use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Market, Query, RawListing};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchMode {
    FullText,
    Fielded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    SalesText,
    LettingsFielded,
    LettingsText,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [Self::SalesText, Self::LettingsFielded, Self::LettingsText];

    pub fn market(self) -> Market {
        match self {
            Self::SalesText => Market::Sales,
            Self::LettingsFielded | Self::LettingsText => Market::Lettings,
        }
    }

    pub fn mode(self) -> SearchMode {
        match self {
            Self::LettingsFielded => SearchMode::Fielded,
            Self::SalesText | Self::LettingsText => SearchMode::FullText,
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::SalesText => "sales/text",
            Self::LettingsFielded => "lettings/fielded",
            Self::LettingsText => "lettings/text",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRequest {
    pub market: Market,
    pub mode: SearchMode,
    pub street: String,
    pub town: String,
    pub postcode: String,
    pub page_size: usize,
    pub on_market_only: bool,
}

impl SourceRequest {
    pub fn new(kind: SourceKind, query: &Query, page_size: usize) -> Self {
        Self {
            market: kind.market(),
            mode: kind.mode(),
            street: query.street.trim().to_string(),
            town: query.town.trim().to_string(),
            postcode: query.postcode.trim().to_string(),
            page_size,
            on_market_only: true,
        }
    }

    pub fn kind(&self) -> SourceKind {
        match (self.market, self.mode) {
            (Market::Sales, _) => SourceKind::SalesText,
            (Market::Lettings, SearchMode::Fielded) => SourceKind::LettingsFielded,
            (Market::Lettings, SearchMode::FullText) => SourceKind::LettingsText,
        }
    }

    pub fn search_text(&self) -> String {
        [&self.street, &self.town, &self.postcode]
            .into_iter()
            .filter(|s| !s.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone)]
pub enum Outcome {
    Success(Vec<RawListing>),
    TransientFailure,
    PermanentFailure,
}

impl Outcome {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientFailure)
    }

    pub fn into_records(self) -> Vec<RawListing> {
        match self {
            Self::Success(records) => records,
            Self::TransientFailure | Self::PermanentFailure => Vec::new(),
        }
    }
}

#[async_trait]
pub trait SourceClient: Send + Sync {
    fn ensure_configured(&self) -> Result<()> {
        Ok(())
    }

    /// Issue one query. Implementations should honour `budget`; the engine enforces it
    /// regardless and reports an overrun as [`Outcome::TransientFailure`].
    async fn issue(&self, request: &SourceRequest, budget: Duration) -> Outcome;
}
