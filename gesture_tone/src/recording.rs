//! Timestamped capture of note changes, plus the selection of which
//! captured events take part in the next playback.

use std::collections::BTreeSet;

use tracing::info;

use crate::error::{Result, ToneError};
use crate::scale;

/// One captured note change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordedEvent {
    /// Milliseconds since the recording session started.
    pub timestamp_ms: f64,
    pub note_index:   usize,
    pub octave_shift: i32,
    pub frequency_hz: f32,
}

impl RecordedEvent {
    pub fn note_name(&self) -> &'static str {
        scale::note(self.note_index).map(|n| n.name).unwrap_or("?")
    }
}

/// Append-only event buffer with a selection set.
///
/// The buffer is only ever appended to (while recording), emptied by
/// [`Recorder::clear`], or replaced wholesale by [`Recorder::start`].
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    events:     Vec<RecordedEvent>,
    selection:  BTreeSet<usize>,
    recording:  bool,
    started_ms: f64,
}

impl Recorder {
    pub fn new() -> Self { Self::default() }

    pub fn is_recording(&self) -> bool { self.recording }

    pub fn events(&self) -> &[RecordedEvent] { &self.events }

    pub fn len(&self) -> usize { self.events.len() }

    pub fn is_empty(&self) -> bool { self.events.is_empty() }

    /// Begin a new session; the previous buffer and selection are discarded.
    pub fn start(&mut self, now_ms: f64) {
        let dropped = self.events.len();
        self.events.clear();
        self.selection.clear();
        self.recording = true;
        self.started_ms = now_ms;
        info!(dropped, "recording started");
    }

    /// End the session; the buffer is kept.
    pub fn stop(&mut self) {
        if self.recording {
            self.recording = false;
            info!(events = self.events.len(), "recording stopped");
        }
    }

    /// Append an event while recording.  Returns its index, or `None` when
    /// no session is active.  New events are selected.
    pub fn append(&mut self, note_index: usize, octave_shift: i32, frequency_hz: f32, now_ms: f64) -> Option<usize> {
        if !self.recording {
            return None;
        }
        let floor = self.events.last().map_or(0.0, |e| e.timestamp_ms);
        let timestamp_ms = (now_ms - self.started_ms).max(floor);
        self.events.push(RecordedEvent { timestamp_ms, note_index, octave_shift, frequency_hz });
        let index = self.events.len() - 1;
        self.selection.insert(index);
        Some(index)
    }

    /// Empty the buffer and the selection.  Clearing an empty buffer is
    /// reported as [`ToneError::NothingToClear`].
    pub fn clear(&mut self) -> Result<()> {
        if self.events.is_empty() {
            return Err(ToneError::NothingToClear);
        }
        let cleared = self.events.len();
        self.events.clear();
        self.selection.clear();
        info!(cleared, "recording cleared");
        Ok(())
    }

    // ── selection ────────────────────────────────────────────────────────

    /// Selected indices in ascending (= timestamp) order.
    pub fn selected(&self) -> Vec<usize> { self.selection.iter().copied().collect() }

    pub fn is_selected(&self, index: usize) -> bool { self.selection.contains(&index) }

    /// Replace the selection.  Any index past the end rejects the whole call
    /// and keeps the old selection.
    pub fn set_selection(&mut self, indices: &[usize]) -> Result<()> {
        let len = self.events.len();
        if let Some(&index) = indices.iter().find(|&&i| i >= len) {
            return Err(ToneError::SelectionOutOfRange { index, len });
        }
        self.selection = indices.iter().copied().collect();
        Ok(())
    }

    /// Flip one event in or out of the selection; returns whether it is now
    /// selected.
    pub fn toggle(&mut self, index: usize) -> Result<bool> {
        let len = self.events.len();
        if index >= len {
            return Err(ToneError::SelectionOutOfRange { index, len });
        }
        if self.selection.remove(&index) {
            Ok(false)
        } else {
            self.selection.insert(index);
            Ok(true)
        }
    }

    pub fn select_all(&mut self) {
        self.selection = (0..self.events.len()).collect();
    }

    pub fn deselect_all(&mut self) {
        self.selection.clear();
    }

    /// Copy of the selected events, in buffer order.
    pub fn selected_events(&self) -> Vec<RecordedEvent> {
        self.selection.iter().filter_map(|&i| self.events.get(i).copied()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorded(times: &[f64]) -> Recorder {
        let mut r = Recorder::new();
        r.start(1_000.0);
        for (i, &t) in times.iter().enumerate() {
            r.append(i % 7, 0, 440.0, t);
        }
        r
    }

    #[test]
    fn append_ignored_when_not_recording() {
        let mut r = Recorder::new();
        assert_eq!(r.append(3, 0, 349.23, 5.0), None);
        assert!(r.is_empty());
    }

    #[test]
    fn timestamps_relative_to_session_start() {
        let r = recorded(&[1_000.0, 1_250.0, 1_600.0]);
        let ts: Vec<f64> = r.events().iter().map(|e| e.timestamp_ms).collect();
        assert_eq!(ts, vec![0.0, 250.0, 600.0]);
    }

    #[test]
    fn n_appends_give_n_non_decreasing_events() {
        let r = recorded(&[1_000.0, 1_100.0, 1_100.0, 1_450.0, 1_900.0]);
        assert_eq!(r.len(), 5);
        for pair in r.events().windows(2) {
            assert!(pair[0].timestamp_ms <= pair[1].timestamp_ms);
        }
    }

    #[test]
    fn clock_stepping_back_does_not_reorder() {
        let r = recorded(&[1_500.0, 1_200.0]);
        assert_eq!(r.events()[1].timestamp_ms, 500.0);
    }

    #[test]
    fn new_events_are_selected() {
        let r = recorded(&[1_000.0, 1_200.0]);
        assert_eq!(r.selected(), vec![0, 1]);
    }

    #[test]
    fn stop_keeps_buffer() {
        let mut r = recorded(&[1_000.0]);
        r.stop();
        assert!(!r.is_recording());
        assert_eq!(r.len(), 1);
        assert_eq!(r.append(1, 0, 440.0, 2_000.0), None);
    }

    #[test]
    fn second_session_replaces_first() {
        let mut r = recorded(&[1_000.0, 1_100.0, 1_200.0]);
        r.stop();
        r.start(5_000.0);
        r.append(6, -1, 130.815, 5_040.0);
        assert_eq!(r.len(), 1);
        assert_eq!(r.events()[0].timestamp_ms, 40.0);
        assert_eq!(r.selected(), vec![0]);
    }

    #[test]
    fn clear_empties_and_reports_when_already_empty() {
        let mut r = recorded(&[1_000.0, 1_200.0]);
        assert!(r.clear().is_ok());
        assert!(r.is_empty());
        assert!(r.selected().is_empty());
        assert!(matches!(r.clear(), Err(ToneError::NothingToClear)));
    }

    #[test]
    fn set_selection_validates_indices() {
        let mut r = recorded(&[1_000.0, 1_200.0, 1_300.0]);
        r.set_selection(&[2, 0]).unwrap();
        assert_eq!(r.selected(), vec![0, 2]);
        let err = r.set_selection(&[1, 3]).unwrap_err();
        assert!(matches!(err, ToneError::SelectionOutOfRange { index: 3, len: 3 }));
        assert_eq!(r.selected(), vec![0, 2]);
    }

    #[test]
    fn select_all_and_deselect_all() {
        let mut r = recorded(&[1_000.0, 1_200.0, 1_300.0]);
        r.deselect_all();
        assert!(r.selected().is_empty());
        r.select_all();
        assert_eq!(r.selected(), vec![0, 1, 2]);
    }

    #[test]
    fn toggle_flips_membership() {
        let mut r = recorded(&[1_000.0, 1_200.0]);
        assert!(!r.toggle(1).unwrap());
        assert!(!r.is_selected(1));
        assert!(r.toggle(1).unwrap());
        assert!(r.toggle(9).is_err());
    }

    #[test]
    fn selected_events_in_buffer_order() {
        let mut r = recorded(&[1_000.0, 1_200.0, 1_300.0]);
        r.set_selection(&[2, 0]).unwrap();
        let ev = r.selected_events();
        assert_eq!(ev.len(), 2);
        assert_eq!(ev[0].timestamp_ms, 0.0);
        assert_eq!(ev[1].timestamp_ms, 300.0);
    }
}
