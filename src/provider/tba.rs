//! The Blue Alliance API v3 payloads
//!
//! Only the fields the rating service needs are decoded; everything else in
//! the `/simple` models is ignored. Red is mapped to alliance A and blue to
//! alliance B.

use crate::types::{CompLevel, MatchRecord, MatchResult};
use serde::{Deserialize, Serialize};

/// One alliance inside a TBA match
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TbaAlliance {
    pub team_keys: Vec<String>,
    /// `-1` until the match is played
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TbaAlliances {
    pub red: TbaAlliance,
    pub blue: TbaAlliance,
}

/// `Match_Simple` model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TbaMatch {
    pub key: String,
    pub event_key: Option<String>,
    pub comp_level: Option<String>,
    pub set_number: Option<u32>,
    pub match_number: Option<u32>,
    pub alliances: Option<TbaAlliances>,
    pub time: Option<i64>,
    pub actual_time: Option<i64>,
}

impl TbaMatch {
    /// Convert to a raw record; validation happens later in the sequencer
    pub fn into_record(self) -> MatchRecord {
        let alliances = self.alliances.unwrap_or_default();
        MatchRecord {
            alliance_a: alliances.red.team_keys,
            alliance_b: alliances.blue.team_keys,
            result: MatchResult::Scores {
                score_a: alliances.red.score,
                score_b: alliances.blue.score,
            },
            timestamp: self.actual_time.or(self.time),
            comp_level: self.comp_level.as_deref().and_then(CompLevel::from_code),
            set_number: self.set_number,
            match_number: self.match_number,
            event_key: self.event_key,
        }
    }
}

/// `Event_Simple` model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TbaEvent {
    pub key: String,
    pub name: Option<String>,
    pub year: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const MATCH_JSON: &str = r#"{
        "key": "2024casj_qm12",
        "event_key": "2024casj",
        "comp_level": "qm",
        "set_number": 1,
        "match_number": 12,
        "alliances": {
            "red": {"team_keys": ["frc254", "frc1678", "frc971"], "score": 88, "surrogate_team_keys": []},
            "blue": {"team_keys": ["frc604", "frc649", "frc8"], "score": 71, "dq_team_keys": []}
        },
        "winning_alliance": "red",
        "time": 1711300000,
        "actual_time": 1711300420,
        "predicted_time": 1711300400
    }"#;

    #[test]
    fn test_match_mapping() {
        let tba: TbaMatch = serde_json::from_str(MATCH_JSON).unwrap();
        let record = tba.into_record();

        assert_eq!(record.alliance_a, vec!["frc254", "frc1678", "frc971"]);
        assert_eq!(record.alliance_b, vec!["frc604", "frc649", "frc8"]);
        assert_eq!(
            record.result,
            MatchResult::Scores {
                score_a: Some(88.0),
                score_b: Some(71.0)
            }
        );
        assert_eq!(record.timestamp, Some(1_711_300_420));
        assert_eq!(record.comp_level, Some(CompLevel::Qualification));
        assert_eq!(record.match_number, Some(12));
        assert_eq!(record.event_key.as_deref(), Some("2024casj"));
    }

    #[test]
    fn test_scheduled_time_used_when_not_played() {
        let tba: TbaMatch = serde_json::from_str(
            r#"{"key": "2024casj_f1m1", "comp_level": "f", "time": 1711400000, "actual_time": null,
                "alliances": {"red": {"team_keys": ["frc1"], "score": -1}, "blue": {"team_keys": ["frc2"], "score": -1}}}"#,
        )
        .unwrap();
        let record = tba.into_record();

        assert_eq!(record.timestamp, Some(1_711_400_000));
        assert_eq!(record.comp_level, Some(CompLevel::Final));
        assert_eq!(
            record.result,
            MatchResult::Scores {
                score_a: Some(-1.0),
                score_b: Some(-1.0)
            }
        );
    }

    #[test]
    fn test_missing_alliances_map_to_empty() {
        let tba: TbaMatch = serde_json::from_str(r#"{"key": "x", "comp_level": "zz"}"#).unwrap();
        let record = tba.into_record();
        assert!(record.alliance_a.is_empty());
        assert_eq!(record.comp_level, None);
    }

    #[test]
    fn test_event_decoding() {
        let events: Vec<TbaEvent> = serde_json::from_str(
            r#"[{"key": "2024casj", "name": "Silicon Valley Regional", "year": 2024, "event_type": 0}, {"name": "no key"}]"#,
        )
        .unwrap();
        assert_eq!(events[0].key, "2024casj");
        assert!(events[1].key.is_empty());
    }
}
