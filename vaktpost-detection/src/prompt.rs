//! Chat-completion request construction.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use serde_json::{json, Value};
use vaktpost_config::EventDefinition;

const SYSTEM_PROMPT: &str = "You are a video analytics agent specialized in factual event detection.\n\
Your task is to determine, based strictly on visual and contextual evidence, whether specific events occurred in the video.\n\
Do not infer or assume beyond what is clearly supported by the video and context.\n\
Use only the visual content and the following context when making determinations: ";

const USER_PROMPT: &str = "Based on the sequence of frames and the provided context, analyze whether \
the following events occurred. Respond with a factual assessment of each event:\n";

pub fn system_message(context: &str) -> Value {
    json!({
        "role": "system",
        "content": format!("{SYSTEM_PROMPT}{context}\nFormat your response as JSON."),
    })
}

/// One line per event: `- {code}: {description} {guidelines}`.
pub fn event_list(events: &[EventDefinition]) -> String {
    events
        .iter()
        .map(|event| {
            format!(
                "- {}: {} {}",
                event.event_code, event.event_description, event.detection_guidelines
            )
            .trim_end()
            .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn image_url(frame: &[u8]) -> String {
    format!("data:image/jpeg;base64,{}", STANDARD.encode(frame))
}

pub fn user_message(events: &[EventDefinition], frames: &[Bytes]) -> Value {
    let mut content = vec![json!({
        "type": "text",
        "text": format!("{USER_PROMPT}{}", event_list(events)),
    })];
    content.extend(frames.iter().map(|frame| {
        json!({
            "type": "image_url",
            "image_url": { "url": image_url(frame) },
        })
    }));
    json!({ "role": "user", "content": content })
}

/// Structured-output schema of the expected answer.
pub fn response_format() -> Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": "event_detection",
            "schema": {
                "type": "object",
                "properties": {
                    "events": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "event_code": { "type": "string" },
                                "detected": { "type": "boolean" },
                                "explanation": { "type": "string" }
                            },
                            "required": ["event_code", "detected", "explanation"]
                        }
                    }
                },
                "required": ["events"]
            }
        }
    })
}

pub fn request_body(model: &str, context: &str, events: &[EventDefinition], frames: &[Bytes]) -> Value {
    json!({
        "model": model,
        "messages": [system_message(context), user_message(events, frames)],
        "response_format": response_format(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events() -> Vec<EventDefinition> {
        vec![
            EventDefinition {
                event_code: "fall".into(),
                event_description: "A person falls".into(),
                detection_guidelines: "Ignore people sitting down.".into(),
            },
            EventDefinition {
                event_code: "fire".into(),
                event_description: "Visible flames".into(),
                detection_guidelines: String::new(),
            },
        ]
    }

    #[test]
    fn event_lines() {
        assert_eq!(
            event_list(&events()),
            "- fall: A person falls Ignore people sitting down.\n- fire: Visible flames"
        );
    }

    #[test]
    fn body_carries_context_events_and_frames() {
        let frames = vec![Bytes::from_static(&[0xFF, 0xD8, 0xFF, 0xD9])];
        let body = request_body("vision-small", "Loading dock", &events(), &frames);

        assert_eq!(body["model"], "vision-small");
        let system = body["messages"][0]["content"].as_str().unwrap();
        assert!(system.contains("Loading dock"));

        let content = body["messages"][1]["content"].as_array().unwrap();
        assert_eq!(content.len(), 2);
        assert!(content[0]["text"].as_str().unwrap().contains("- fire: Visible flames"));
        assert_eq!(content[1]["image_url"]["url"], "data:image/jpeg;base64,/9j/2Q==");
        assert_eq!(body["response_format"]["type"], "json_schema");
    }
}
