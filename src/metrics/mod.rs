//! Metrics and monitoring for the alliance-rating service
//!
//! Counters and histograms for rating activity, rebuilds and snapshot
//! operations. They are exposed in the Prometheus text format on `/metrics`.

pub mod collector;

pub use collector::{
    MetricsCollector, MetricsTimer, OperationMetrics, PerformanceMetrics, RatingMetrics,
};
