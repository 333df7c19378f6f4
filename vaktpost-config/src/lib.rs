//! # Vaktpost Configuration
//!
//! Hierarchical configuration for the surveillance pipeline.
//!
//! ## Features
//! - **Single Source**: one document configures every stage
//! - **Validation**: field rules through `validator`, cross-field rules in [`VaktpostConfig::check`]
//! - **Environment Overrides**: `VAKTPOST_SECTION__FIELD` variables win over files

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod detection;
mod error;
mod persistence;
mod queues;
mod segmenter;
mod stream;
mod supervisor;
mod telemetry;
mod validation;

pub use detection::{ApiKey, DetectionConfig, EventDefinition, FrameSampling};
pub use error::ConfigError;
pub use persistence::PersistenceConfig;
pub use queues::QueueConfig;
pub use segmenter::SegmenterConfig;
pub use stream::{BackoffConfig, StreamConfig};
pub use supervisor::SupervisorConfig;
pub use telemetry::TelemetryConfig;

/// Default location searched by [`VaktpostConfig::load`].
pub const DEFAULT_CONFIG_PATH: &str = "config/vaktpost.yaml";

const ENV_PREFIX: &str = "VAKTPOST_";

/// Top-level configuration container.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone)]
pub struct VaktpostConfig {
    /// Camera stream and reconnect behaviour.
    #[validate(nested)]
    #[serde(default)]
    pub stream: StreamConfig,

    /// Chunk duration and output directory.
    #[validate(nested)]
    #[serde(default)]
    pub segmenter: SegmenterConfig,

    #[validate(nested)]
    #[serde(default)]
    pub queues: QueueConfig,

    /// Detection service and event catalogue.
    #[validate(nested)]
    #[serde(default)]
    pub detection: DetectionConfig,

    #[validate(nested)]
    #[serde(default)]
    pub persistence: PersistenceConfig,

    #[validate(nested)]
    #[serde(default)]
    pub supervisor: SupervisorConfig,

    #[validate(nested)]
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl VaktpostConfig {
    /// Load configuration from the default file and environment.
    ///
    /// Hierarchy:
    /// 1. Default values
    /// 2. `config/vaktpost.yaml`, if present
    /// 3. `VAKTPOST_*` environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(VaktpostConfig::default()));
        if Path::new(DEFAULT_CONFIG_PATH).exists() {
            figment = figment.merge(Yaml::file(DEFAULT_CONFIG_PATH));
        }
        Self::finish(figment)
    }

    /// Load configuration from a specific file, still honouring the environment.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(path)));
        }
        let figment =
            Figment::from(Serialized::defaults(VaktpostConfig::default())).merge(Yaml::file(path));
        Self::finish(figment)
    }

    fn finish(figment: Figment) -> Result<Self, ConfigError> {
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                config.check()?;
                Ok(config)
            })
    }

    /// Constraints the derive cannot express.
    pub fn check(&self) -> Result<(), ConfigError> {
        if self.segmenter.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::Inconsistent(
                "segmenter.output_dir is required".into(),
            ));
        }
        if self.segmenter.chunk_duration().is_none() {
            return Err(ConfigError::Inconsistent(
                "segmenter.chunk_duration_secs must be positive".into(),
            ));
        }
        if self.persistence.path.as_os_str().is_empty() {
            return Err(ConfigError::Inconsistent(
                "persistence.path is required".into(),
            ));
        }
        if self.stream.backoff.ceiling_ms < self.stream.backoff.floor_ms {
            return Err(ConfigError::Inconsistent(format!(
                "stream.backoff.ceiling_ms ({}) is below floor_ms ({})",
                self.stream.backoff.ceiling_ms, self.stream.backoff.floor_ms
            )));
        }
        Ok(())
    }
}
