//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the alliance-rating service
//! using Prometheus metrics.

use crate::types::ApplySummary;
use anyhow::Result;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for the rating service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Rating activity metrics
    rating_metrics: RatingMetrics,

    /// Rebuild and snapshot operation metrics
    operation_metrics: OperationMetrics,

    /// Performance metrics
    performance_metrics: PerformanceMetrics,
}

/// Rating activity metrics
#[derive(Clone)]
pub struct RatingMetrics {
    /// Matches folded into beliefs
    pub matches_applied_total: IntCounter,

    /// Records dropped by validation
    pub matches_skipped_total: IntCounter,

    /// Win probability queries answered
    pub predictions_total: IntCounter,

    /// Teams currently held in the store
    pub teams_indexed: IntGauge,
}

/// Rebuild and snapshot operation metrics
#[derive(Clone)]
pub struct OperationMetrics {
    /// Rebuilds by result
    pub rebuilds_total: IntCounterVec,

    /// Snapshot save/load/recalculate operations by result
    pub snapshot_operations_total: IntCounterVec,
}

/// Performance metrics
#[derive(Clone)]
pub struct PerformanceMetrics {
    /// Time spent applying one batch under the write lock
    pub batch_apply_duration: Histogram,

    /// Time spent gathering records from the provider for one rebuild
    pub rebuild_fetch_duration: Histogram,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let rating_metrics = RatingMetrics::new(&registry)?;
        let operation_metrics = OperationMetrics::new(&registry)?;
        let performance_metrics = PerformanceMetrics::new(&registry)?;

        Ok(Self {
            registry,
            rating_metrics,
            operation_metrics,
            performance_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Get rating metrics
    pub fn rating(&self) -> &RatingMetrics {
        &self.rating_metrics
    }

    /// Get operation metrics
    pub fn operations(&self) -> &OperationMetrics {
        &self.operation_metrics
    }

    /// Get performance metrics
    pub fn performance(&self) -> &PerformanceMetrics {
        &self.performance_metrics
    }

    /// Record a batch of matches being applied
    pub fn record_batch(&self, summary: &ApplySummary, duration: Duration) {
        self.rating_metrics
            .matches_applied_total
            .inc_by(summary.applied as u64);
        self.rating_metrics
            .matches_skipped_total
            .inc_by(summary.skipped as u64);
        self.rating_metrics
            .teams_indexed
            .set(summary.teams_indexed as i64);

        self.performance_metrics
            .batch_apply_duration
            .observe(duration.as_secs_f64());
    }

    /// Record a rebuild attempt
    pub fn record_rebuild(&self, success: bool, fetch_duration: Duration) {
        let status = if success { "success" } else { "failed" };

        self.operation_metrics
            .rebuilds_total
            .with_label_values(&[status])
            .inc();

        self.performance_metrics
            .rebuild_fetch_duration
            .observe(fetch_duration.as_secs_f64());
    }

    /// Record answered predictions
    pub fn record_predictions(&self, count: usize) {
        self.rating_metrics.predictions_total.inc_by(count as u64);
    }

    /// Record a snapshot operation
    pub fn record_snapshot_operation(&self, operation: &str, success: bool) {
        let status = if success { "success" } else { "error" };

        self.operation_metrics
            .snapshot_operations_total
            .with_label_values(&[operation, status])
            .inc();
    }

    /// Update the team count gauge
    pub fn set_teams_indexed(&self, count: usize) {
        self.rating_metrics.teams_indexed.set(count as i64);
    }

    /// Render every registered metric in the Prometheus text format
    pub fn encode_text(&self) -> Result<String> {
        let metric_families = self.registry.gather();
        let encoder = TextEncoder::new();
        Ok(encoder.encode_to_string(&metric_families)?)
    }

    /// Content type of `encode_text` output
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl RatingMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let matches_applied_total = IntCounter::new(
            "alliance_rating_matches_applied_total",
            "Total matches applied to team beliefs",
        )?;
        registry.register(Box::new(matches_applied_total.clone()))?;

        let matches_skipped_total = IntCounter::new(
            "alliance_rating_matches_skipped_total",
            "Total match records skipped by validation",
        )?;
        registry.register(Box::new(matches_skipped_total.clone()))?;

        let predictions_total = IntCounter::new(
            "alliance_rating_predictions_total",
            "Total win probability predictions answered",
        )?;
        registry.register(Box::new(predictions_total.clone()))?;

        let teams_indexed = IntGauge::new(
            "alliance_rating_teams_indexed",
            "Number of teams held in the rating store",
        )?;
        registry.register(Box::new(teams_indexed.clone()))?;

        Ok(Self {
            matches_applied_total,
            matches_skipped_total,
            predictions_total,
            teams_indexed,
        })
    }
}

impl OperationMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let rebuilds_total = IntCounterVec::new(
            Opts::new("alliance_rating_rebuilds_total", "Total rating rebuilds"),
            &["status"],
        )?;
        registry.register(Box::new(rebuilds_total.clone()))?;

        let snapshot_operations_total = IntCounterVec::new(
            Opts::new(
                "alliance_rating_snapshot_operations_total",
                "Total snapshot operations",
            ),
            &["operation", "status"],
        )?;
        registry.register(Box::new(snapshot_operations_total.clone()))?;

        Ok(Self {
            rebuilds_total,
            snapshot_operations_total,
        })
    }
}

impl PerformanceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let batch_apply_duration = Histogram::with_opts(
            HistogramOpts::new(
                "alliance_rating_batch_apply_duration_seconds",
                "Time spent applying a batch of matches",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        )?;
        registry.register(Box::new(batch_apply_duration.clone()))?;

        let rebuild_fetch_duration = Histogram::with_opts(
            HistogramOpts::new(
                "alliance_rating_rebuild_fetch_duration_seconds",
                "Time spent gathering match records for a rebuild",
            )
            .buckets(vec![0.1, 0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0]),
        )?;
        registry.register(Box::new(rebuild_fetch_duration.clone()))?;

        Ok(Self {
            batch_apply_duration,
            rebuild_fetch_duration,
        })
    }
}
