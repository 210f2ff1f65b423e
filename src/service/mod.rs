//! Service layer for the alliance-rating service
//!
//! This module contains the main application state that coordinates the
//! rating engine, the match data provider, persistence and metrics.

pub mod app;
pub mod health;

pub use app::{
    AppState, LoadOutcome, RebuildOutcome, RebuildRequest, RebuildSource, RecalculateOutcome,
    RecalculateSource, SaveOutcome,
};
pub use health::{HealthCheck, HealthStatus};
