//! Alert persistence configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

/// Persistence configuration.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct PersistenceConfig {
    /// JSON-lines file alerts are appended to. Required.
    #[serde(default)]
    pub path: PathBuf,

    /// Largest batch handed to the sink in one write.
    #[validate(range(min = 1, max = 10_000))]
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_batch_size() -> usize {
    16
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            batch_size: default_batch_size(),
        }
    }
}
