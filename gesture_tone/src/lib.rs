//! # gesture_tone
//!
//! Turns a stream of hand-landmark frames into a monophonic melody, records
//! the note changes, and replays them with their original timing.
//!
//! ## Gesture → sound mapping
//!
//! | Input | Derived from | Controls |
//! |---|---|---|
//! | Vertical position | pointer landmark y | Note of the 7-note scale, top = B, bottom = C |
//! | Depth | mean z of all 21 landmarks | Octave shift, -2 … +2 |
//! | Horizontal position | pointer landmark x | Volume multiplier, 0.5 (left) … 1.5 (right) |
//! | Hand lost | no landmarks | Note released, selector reset |
//!
//! ## Modules
//!
//! | Module | Role |
//! |---|---|
//! | [`landmark`] | Frame types and the pointer preprocessor |
//! | [`scale`] | The fixed scale and octave arithmetic |
//! | [`selector`] | y → note index with hysteresis and rate limit |
//! | [`mapping`] | depth → octave, x → volume |
//! | [`trigger`] | Silent / Sounding state machine over a [`ToneSink`] |
//! | [`recording`] | Timestamped note-change buffer and selection |
//! | [`scheduler`] | Cancellable, drift-free playback runs |
//! | [`engine`] | Wires the above into one per-frame call |
//! | [`config`] | TOML-backed tunables |
//!
//! Everything here is single-threaded and clock-agnostic: callers pass the
//! current time in milliseconds, which keeps the whole pipeline
//! deterministic under test.

pub mod config;
pub mod engine;
pub mod error;
pub mod landmark;
pub mod mapping;
pub mod recording;
pub mod scale;
pub mod scheduler;
pub mod selector;
pub mod trigger;

pub use config::EngineConfig;
pub use engine::{Engine, FpsMeter, Snapshot};
pub use error::{Result, ToneError};
pub use landmark::{FrameInput, Landmark, LandmarkFrame, PointerSample, Viewport};
pub use recording::{RecordedEvent, Recorder};
pub use scheduler::{CancelToken, PlaybackAction, PlaybackScheduler, PlaybackToggle};
pub use trigger::{NullSink, PlaybackState, PlaybackTrigger, ToneSink};
