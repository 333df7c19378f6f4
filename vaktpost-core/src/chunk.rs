//! Chunk records and the on-disk naming scheme.
//!
//! While a chunk is being written its file is named
//! `{start}_ongoing.{ext}`; once the writer is closed it is renamed to
//! `{start}_{end}.{ext}`. Timestamps are UTC, formatted `YYYYMMDDhhmmss`.
//! Only files carrying the finalized name are ever handed to consumers.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";
pub const PROVISIONAL_MARKER: &str = "ongoing";

const TIMESTAMP_LEN: usize = 14;

/// Lifecycle of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChunkStatus {
    /// Open, receiving frames under the provisional name.
    Writing,
    /// Writer closed, rename pending.
    Finalizing,
    /// Renamed to the finalized name; owned by the consumer.
    Ready,
    /// Dropped without finalizing (no frames, or finalization failed).
    Discarded,
}

/// Parsed form of a chunk file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkName {
    Provisional {
        started_at: DateTime<Utc>,
    },
    Finalized {
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
    },
}

impl ChunkName {
    pub fn provisional(started_at: DateTime<Utc>) -> Self {
        Self::Provisional { started_at }
    }

    pub fn finalized(started_at: DateTime<Utc>, ended_at: DateTime<Utc>) -> Self {
        Self::Finalized {
            started_at,
            ended_at,
        }
    }

    pub fn is_finalized(&self) -> bool {
        matches!(self, Self::Finalized { .. })
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        match *self {
            Self::Provisional { started_at } | Self::Finalized { started_at, .. } => started_at,
        }
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        match *self {
            Self::Provisional { .. } => None,
            Self::Finalized { ended_at, .. } => Some(ended_at),
        }
    }

    /// Renders the file name for the given extension (without the dot).
    pub fn file_name(&self, extension: &str) -> String {
        match self {
            Self::Provisional { started_at } => format!(
                "{}_{}.{}",
                started_at.format(TIMESTAMP_FORMAT),
                PROVISIONAL_MARKER,
                extension
            ),
            Self::Finalized {
                started_at,
                ended_at,
            } => format!(
                "{}_{}.{}",
                started_at.format(TIMESTAMP_FORMAT),
                ended_at.format(TIMESTAMP_FORMAT),
                extension
            ),
        }
    }

    /// Parses a bare file name. Returns `None` for anything not produced by
    /// [`ChunkName::file_name`].
    pub fn parse(file_name: &str) -> Option<Self> {
        let (stem, extension) = file_name.rsplit_once('.')?;
        if extension.is_empty() {
            return None;
        }
        let (start, end) = stem.split_once('_')?;
        let started_at = parse_timestamp(start)?;
        if end == PROVISIONAL_MARKER {
            return Some(Self::Provisional { started_at });
        }
        let ended_at = parse_timestamp(end)?;
        Some(Self::Finalized {
            started_at,
            ended_at,
        })
    }

    /// Parses the final component of `path`.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.file_name()
            .and_then(|name| name.to_str())
            .and_then(Self::parse)
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if value.len() != TIMESTAMP_LEN || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// A fixed-duration segment of the ingested stream, stored as one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Wall-clock label of the first frame.
    pub started_at: DateTime<Utc>,
    /// Wall-clock label taken when the writer was closed.
    pub ended_at: Option<DateTime<Utc>>,
    pub path: PathBuf,
    pub frame_count: u64,
    pub status: ChunkStatus,
}

impl Chunk {
    /// A new chunk in `Writing` state, located under its provisional name.
    pub fn open(dir: &Path, extension: &str, started_at: DateTime<Utc>) -> Self {
        let path = dir.join(ChunkName::provisional(started_at).file_name(extension));
        Self {
            started_at,
            ended_at: None,
            path,
            frame_count: 0,
            status: ChunkStatus::Writing,
        }
    }

    /// The finalized path this chunk will be renamed to once it ends at `ended_at`.
    pub fn finalized_path(&self, ended_at: DateTime<Utc>) -> PathBuf {
        let extension = self
            .path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        let name = ChunkName::finalized(self.started_at, ended_at).file_name(extension);
        match self.path.parent() {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }

    /// Wall-clock span covered by the chunk, once ended.
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.ended_at.map(|end| end - self.started_at)
    }

    pub fn is_ready(&self) -> bool {
        self.status == ChunkStatus::Ready
    }
}
