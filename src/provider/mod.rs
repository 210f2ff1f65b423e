//! Match data providers
//!
//! A provider turns an event key into raw match records and a season year into
//! the list of event keys held for that season. Providers own fetching,
//! pacing and payload mapping; they do not validate scores, which is the
//! sequencer's job.

pub mod http;
pub mod memory;
pub mod tba;

use crate::error::Result;
use crate::types::MatchRecord;
use async_trait::async_trait;

pub use http::HttpMatchProvider;
pub use memory::StaticMatchProvider;
pub use tba::{TbaEvent, TbaMatch};

/// Source of raw match records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MatchDataProvider: Send + Sync {
    /// Raw match records of one event, in provider order
    async fn event_matches(&self, event_key: &str) -> Result<Vec<MatchRecord>>;

    /// Event keys of one season, in provider order
    async fn season_events(&self, year: i32) -> Result<Vec<String>>;

    /// Short identifier for logs
    fn name(&self) -> &'static str;
}
