//! Append-only JSON-lines alert file, one alert object per line.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;
use vaktpost_core::Alert;

use crate::{AlertSink, SinkError};

pub struct JsonLinesSink {
    path: PathBuf,
    file: File,
}

impl JsonLinesSink {
    /// Opens `path` for appending, creating it and its parent directory.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let path = path.into();
        let open_error = |source| SinkError::Open {
            path: path.clone(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(open_error)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(open_error)?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AlertSink for JsonLinesSink {
    fn write(&mut self, alerts: &[Alert]) -> Result<usize, SinkError> {
        if alerts.is_empty() {
            return Ok(0);
        }
        // Encode the whole batch first so a bad record writes nothing.
        let mut batch = Vec::new();
        for alert in alerts {
            serde_json::to_writer(&mut batch, alert)?;
            batch.push(b'\n');
        }
        let mut writer = BufWriter::new(&self.file);
        writer.write_all(&batch)?;
        writer.flush()?;
        drop(writer);
        self.file.sync_data()?;
        debug!(path = %self.path.display(), count = alerts.len(), "Alerts appended");
        Ok(alerts.len())
    }
}
