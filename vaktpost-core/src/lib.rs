//! # vaktpost-core
//!
//! Shared building blocks for the ingestion pipeline.
//!
//! ### Key Submodules:
//! - `events`: bounded FIFO queues between stages and the cooperative stop signal
//! - `pipeline`: the single object owning both queues and the stop signal
//! - `chunk`: chunk records and the provisional/finalized naming scheme
//! - `alert`: detection results and alert records
//! - `time`: monotonic + wall clock abstraction (`SystemClock`, `VirtualClock`)

pub mod alert;
pub mod chunk;
pub mod events;
pub mod pipeline;
pub mod time;

pub mod prelude {
    pub use crate::alert::*;
    pub use crate::chunk::*;
    pub use crate::events::*;
    pub use crate::pipeline::*;
    pub use crate::time::*;
}

pub use alert::{Alert, DetectionResult};
pub use chunk::{Chunk, ChunkName, ChunkStatus};
pub use events::{BoundedQueue, QueueError, StopSignal};
pub use pipeline::{Pipeline, PipelineStatus};
pub use time::{Clock, SystemClock, VirtualClock};
