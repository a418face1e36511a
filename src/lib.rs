pub mod api;
pub mod cache;
pub mod config;
pub mod deduplication;
pub mod error;
pub mod estate;
pub mod filter;
pub mod lookup;
pub mod mailer;
pub mod matching;
pub mod normalize;
pub mod source;
pub mod types;

pub use lookup::LookupEngine;
pub use source::{Outcome, SourceClient, SourceRequest};
pub use types::{Candidate, LookupResult, Market, Query};
