//! Detection findings and the alert records derived from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Verdict for one candidate event, as returned by the detection service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub event_code: String,
    pub detected: bool,
    #[serde(default)]
    pub explanation: String,
}

impl DetectionResult {
    pub fn new(event_code: impl Into<String>, detected: bool, explanation: impl Into<String>) -> Self {
        Self {
            event_code: event_code.into(),
            detected,
            explanation: explanation.into(),
        }
    }
}

/// A detected event, ready for persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub event_timestamp: DateTime<Utc>,
    pub event_code: String,
    pub event_description: String,
    pub ai_explanation: String,
    pub video_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_result_tolerates_missing_explanation() {
        let result: DetectionResult =
            serde_json::from_str(r#"{"event_code":"fall","detected":true}"#).unwrap();
        assert_eq!(result, DetectionResult::new("fall", true, ""));
    }
}
