// vaktpost-config/src/validation.rs
//! Custom validation functions for configuration.

use std::collections::HashSet;

use validator::ValidationError;

use crate::detection::EventDefinition;

/// Validate that a stream URL uses a supported scheme and names a target.
pub fn validate_stream_url(url: &str) -> Result<(), ValidationError> {
    let re = regex::Regex::new(r"^(tcp://[^/\s]+:\d{1,5}|file://\S+)$")
        .map_err(|_| ValidationError::new("invalid_regex"))?;
    if re.is_match(url) {
        Ok(())
    } else {
        Err(ValidationError::new("unsupported_stream_url")
            .with_message("expected tcp://host:port or file:///path".into()))
    }
}

/// Validate a chunk file extension: short, alphanumeric, no dot.
pub fn validate_extension(ext: &str) -> Result<(), ValidationError> {
    let valid = !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric());
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_extension"))
    }
}

/// Validate that every event code appears once.
pub fn validate_unique_codes(events: &[EventDefinition]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    if events.iter().all(|event| seen.insert(event.event_code.as_str())) {
        Ok(())
    } else {
        Err(ValidationError::new("duplicate_event_code"))
    }
}

/// Validate a tracing filter level.
pub fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid = ["trace", "debug", "info", "warn", "error"].contains(&level.to_lowercase().as_str());
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_log_level"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_urls() {
        assert!(validate_stream_url("tcp://camera.local:8554").is_ok());
        assert!(validate_stream_url("tcp://10.0.0.4:9000").is_ok());
        assert!(validate_stream_url("file:///var/recordings/yard.mjpeg").is_ok());
        assert!(validate_stream_url("rtsp://camera.local/stream").is_err());
        assert!(validate_stream_url("tcp://camera.local").is_err());
        assert!(validate_stream_url("").is_err());
    }

    #[test]
    fn extensions() {
        assert!(validate_extension("mjpeg").is_ok());
        assert!(validate_extension(".mp4").is_err());
        assert!(validate_extension("").is_err());
    }

    #[test]
    fn duplicate_codes_are_rejected() {
        let event = |code: &str| EventDefinition {
            event_code: code.into(),
            event_description: "x".into(),
            detection_guidelines: String::new(),
        };
        assert!(validate_unique_codes(&[event("a"), event("b")]).is_ok());
        assert!(validate_unique_codes(&[event("a"), event("a")]).is_err());
    }
}
