//! Configuration management for the alliance-rating service
//!
//! This module handles configuration loading from TOML files and environment
//! variables, validation, and default values for the rating service.

pub mod app;
pub mod rating;

// Re-export commonly used types
pub use app::{validate_config, AppConfig, ProviderSettings, ServiceSettings, StorageSettings};
pub use rating::RatingConfig;
