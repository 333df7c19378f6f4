/*!
# Vaktpost Simulator

Deterministic stand-ins for everything outside the pipeline core, used to
exercise the engine without a camera, a model endpoint or a database.

## Key Components:
- **Synthetic Source:** MJPEG frames paced on a [`VirtualClock`](vaktpost_core::VirtualClock).
- **Chaos Plan:** scripted or seeded connection faults.
- **Scripted Detector:** canned detection outcomes, with a record of every call.
- **Memory Sink:** collects alerts, optionally failing on demand.
*/

pub mod chaos;
pub mod detector;
pub mod sink;
pub mod source;

pub use chaos::ChaosPlan;
pub use detector::{ScriptedDetector, ScriptedOutcome};
pub use sink::MemorySink;
pub use source::SyntheticSource;
