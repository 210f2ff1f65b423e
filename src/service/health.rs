//! Health check reporting
//!
//! The rating service has a single stateful component, the engine. It is
//! healthy while its lock can be taken; a poisoned lock marks it unhealthy.

use crate::engine::RatingEngine;
use crate::types::SessionContext;
use serde::{Deserialize, Serialize};
use tracing::error;

/// Health check status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "✅ healthy"),
            HealthStatus::Unhealthy => write!(f, "❌ unhealthy"),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    /// True when the engine is usable
    pub ok: bool,
    /// Overall service status
    pub status: HealthStatus,
    /// Service name
    pub service: String,
    /// Crate version
    pub version: String,
    /// Current timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Teams held in the store
    pub teams_indexed: usize,
    /// Where the current beliefs came from
    pub context: SessionContext,
    /// Update rule in use
    pub calculator: String,
}

impl HealthCheck {
    /// Inspect the engine
    pub fn check(service: &str, engine: &RatingEngine) -> Self {
        let state = engine
            .team_count()
            .and_then(|count| engine.context().map(|context| (count, context)));

        let (status, teams_indexed, context) = match state {
            Ok((count, context)) => (HealthStatus::Healthy, count, context),
            Err(e) => {
                error!("Rating engine health check failed: {}", e);
                (HealthStatus::Unhealthy, 0, SessionContext::default())
            }
        };

        HealthCheck {
            ok: status == HealthStatus::Healthy,
            status,
            service: service.to_string(),
            version: crate::VERSION.to_string(),
            timestamp: chrono::Utc::now(),
            teams_indexed,
            context,
            calculator: engine.calculator_name().to_string(),
        }
    }

    /// Convert health check to JSON string
    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| anyhow::anyhow!("Failed to serialize health check: {}", e))
    }
}
