//! Error taxonomy for the engine.
//!
//! Input absence, zero-sized viewports and a not-yet-ready tone sink are
//! *not* errors; they are recovered locally and never reach this type.
//! What remains are user-workflow conditions the host should report, and
//! configuration problems found at startup.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the engine and its configuration layer.
#[derive(Error, Debug)]
pub enum ToneError {
    /// Playback of "all" was requested but nothing has been recorded.
    #[error("nothing recorded yet")]
    EmptyRecording,

    /// Playback of the selection was requested but no event is selected.
    #[error("no recorded events selected")]
    EmptySelection,

    /// `clear()` was called on an already empty buffer.
    #[error("recording buffer is already empty")]
    NothingToClear,

    /// A selection index does not name a recorded event.
    #[error("event {index} does not exist (buffer holds {len})")]
    SelectionOutOfRange { index: usize, len: usize },

    /// A landmark frame did not carry the expected number of points.
    #[error("landmark frame has {got} points, expected {expected}")]
    MalformedFrame { got: usize, expected: usize },

    /// Config file could not be read.
    #[error("cannot read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for the expected schema.
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config values parsed but are inconsistent.
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ToneError {
    /// True for conditions caused by the user's workflow (play with nothing
    /// recorded, clear an empty buffer, ...). These are meant to be shown to
    /// the user and never leave the engine in a corrupted state.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            ToneError::EmptyRecording
                | ToneError::EmptySelection
                | ToneError::NothingToClear
                | ToneError::SelectionOutOfRange { .. }
        )
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, ToneError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_errors_are_user_facing() {
        assert!(ToneError::EmptyRecording.is_user_facing());
        assert!(ToneError::EmptySelection.is_user_facing());
        assert!(ToneError::NothingToClear.is_user_facing());
        assert!(ToneError::SelectionOutOfRange { index: 3, len: 2 }.is_user_facing());
    }

    #[test]
    fn config_errors_are_not_user_facing() {
        assert!(!ToneError::Invalid("min_z".into()).is_user_facing());
        assert!(!ToneError::MalformedFrame { got: 20, expected: 21 }.is_user_facing());
    }

    #[test]
    fn out_of_range_message_names_index() {
        let msg = ToneError::SelectionOutOfRange { index: 7, len: 4 }.to_string();
        assert!(msg.contains('7'));
        assert!(msg.contains('4'));
    }
}
