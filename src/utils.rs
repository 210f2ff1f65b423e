//! Utility functions for the rating service

use chrono::{DateTime, Utc};

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Canonical form of a team key: trimmed and lowercase
pub fn canonical_team_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Canonical form of an event key, e.g. `2024CASJ` becomes `2024casj`
pub fn canonical_event_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Round to a fixed number of decimal places for presentation
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Whether a string is a four-digit season year
pub fn is_season_year(raw: &str) -> bool {
    raw.len() == 4 && raw.chars().all(|c| c.is_ascii_digit())
}

/// Whether a string is a full event key: four-digit year followed by an alphanumeric code
pub fn is_event_key(raw: &str) -> bool {
    let raw = raw.trim();
    if raw.len() <= 4 || !raw.is_ascii() {
        return false;
    }
    let (year, code) = raw.split_at(4);
    is_season_year(year) && code.chars().all(|c| c.is_ascii_alphanumeric())
}
