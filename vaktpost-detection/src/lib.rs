//! # Vaktpost Detection
//!
//! The detection collaborator: given a finalized chunk, the configured event
//! catalogue and a scene context, report which events occurred.
//!
//! [`HttpDetector`] asks an OpenAI-compatible vision model. Anything else
//! implementing [`Detector`] can be plugged into the engine instead.

pub mod detector;
pub mod frames;
pub mod http;
pub mod prompt;

pub use detector::{DetectionError, DetectionReport, DetectionRequest, Detector};
pub use frames::{frame_indices, sample_frames};
pub use http::HttpDetector;
