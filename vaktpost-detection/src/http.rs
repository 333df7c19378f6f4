//! OpenAI-compatible chat-completions detector.
//!
//! Uses the blocking reqwest client: detection runs on dedicated worker
//! threads, and the client timeout doubles as the detection deadline.

use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};
use vaktpost_config::{ApiKey, DetectionConfig, FrameSampling};

use crate::detector::{DetectionError, DetectionReport, DetectionRequest, Detector};
use crate::frames::sample_frames;
use crate::prompt;

/// Upper bound on the response excerpt kept in errors.
const ERROR_BODY_LIMIT: usize = 512;

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Extracts the detection report from a chat-completions response body.
pub fn parse_completion(body: &str) -> Result<DetectionReport, DetectionError> {
    let completion: ChatCompletion =
        serde_json::from_str(body).map_err(|e| DetectionError::Malformed(e.to_string()))?;
    let content = completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| DetectionError::Malformed("response has no message content".into()))?;
    serde_json::from_str(&content).map_err(|e| DetectionError::Malformed(e.to_string()))
}

pub struct HttpDetector {
    client: Client,
    endpoint: String,
    model: String,
    api_key: ApiKey,
    sampling: FrameSampling,
    timeout: Duration,
}

impl HttpDetector {
    /// Fails without an API key, before any worker is started.
    pub fn new(config: &DetectionConfig) -> Result<Self, DetectionError> {
        if config.api_key.is_empty() {
            return Err(DetectionError::Setup("detection.api_key is not set".into()));
        }
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| DetectionError::Setup(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            sampling: config.sampling,
            timeout: config.timeout(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn call(&self, body: &serde_json::Value) -> Result<String, DetectionError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose())
            .json(body)
            .send()
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let text = response.text().map_err(|e| self.transport_error(e))?;
        if !status.is_success() {
            warn!(endpoint = %self.endpoint, %status, "Detection service error");
            let mut body = text;
            if body.len() > ERROR_BODY_LIMIT {
                let mut cut = ERROR_BODY_LIMIT;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(DetectionError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(text)
    }

    fn transport_error(&self, err: reqwest::Error) -> DetectionError {
        if err.is_timeout() {
            DetectionError::Timeout(self.timeout)
        } else {
            DetectionError::Request(err.to_string())
        }
    }
}

impl Detector for HttpDetector {
    fn detect(&self, request: &DetectionRequest<'_>) -> Result<DetectionReport, DetectionError> {
        if request.context.trim().is_empty() {
            return Err(DetectionError::InvalidRequest("context must be provided".into()));
        }
        if request.events.is_empty() {
            warn!(path = %request.video_path.display(), "No events configured, skipping detection");
            return Ok(DetectionReport::default());
        }

        let frames = sample_frames(request.video_path, self.sampling)?;
        if frames.is_empty() {
            return Err(DetectionError::NoFrames(request.video_path.to_path_buf()));
        }
        info!(
            path = %request.video_path.display(),
            frames = frames.len(),
            "Sending chunk for detection"
        );

        let body = prompt::request_body(&self.model, request.context, request.events, &frames);
        let started = Instant::now();
        let text = self.call(&body)?;
        let report = parse_completion(&text)?;
        debug!(
            path = %request.video_path.display(),
            results = report.events.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Detection response received"
        );
        Ok(report)
    }
}
