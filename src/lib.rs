//! Alliance Rating - TrueSkill-style skill estimation for alliance matches
//!
//! This crate keeps a Gaussian skill belief per team, updates it from the
//! results of two-alliance matches, and answers win probability queries.
//! Match data comes from a pluggable provider; beliefs persist as JSON
//! snapshots and are served over HTTP.

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod provider;
pub mod rating;
pub mod service;
pub mod snapshot;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{RatingError, Result};
pub use types::*;

// Re-export key components
pub use engine::RatingEngine;
pub use provider::{MatchDataProvider, StaticMatchProvider};
pub use rating::{RatingEnvironment, RatingStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
