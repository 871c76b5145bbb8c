//! The play/stop state machine in front of a monophonic tone generator.
//!
//! ```text
//!            attack(f)                 retarget(f')
//!   Silent ────────────▶ Sounding(f) ─────────────▶ Sounding(f')
//!     ▲                      │
//!     └────── release() ─────┘
//! ```
//!
//! Both the live frame path and the playback scheduler go through one
//! [`PlaybackTrigger`]; calls are applied in arrival order and the last
//! caller wins.  Nothing is queued.

use tracing::{debug, trace};

// ════════════════════════════════════════════════════════════════════════════
// ToneSink: the external tone generator
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can sound one note at a time.
///
/// A sink may not be ready yet (e.g. audio output waits for a user action);
/// until [`ToneSink::is_ready`] returns true the trigger sends it nothing.
pub trait ToneSink {
    fn is_ready(&self) -> bool { true }
    /// Start a note with a fresh envelope.
    fn attack(&mut self, frequency_hz: f32);
    /// Glide the sounding note to a new frequency; no envelope re-trigger.
    fn retarget(&mut self, frequency_hz: f32);
    /// Fade the sounding note out.
    fn release(&mut self);
    /// Output level, 0–100.
    fn set_volume(&mut self, percent: f32);
}

impl<S: ToneSink + ?Sized> ToneSink for Box<S> {
    fn is_ready(&self) -> bool { (**self).is_ready() }
    fn attack(&mut self, frequency_hz: f32) { (**self).attack(frequency_hz) }
    fn retarget(&mut self, frequency_hz: f32) { (**self).retarget(frequency_hz) }
    fn release(&mut self) { (**self).release() }
    fn set_volume(&mut self, percent: f32) { (**self).set_volume(percent) }
}

/// A sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ToneSink for NullSink {
    fn attack(&mut self, _hz: f32)     {}
    fn retarget(&mut self, _hz: f32)   {}
    fn release(&mut self)              {}
    fn set_volume(&mut self, _pct: f32) {}
}

// ════════════════════════════════════════════════════════════════════════════
// PlaybackState
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PlaybackState {
    #[default]
    Silent,
    Sounding { frequency_hz: f32 },
}

impl PlaybackState {
    pub fn is_sounding(&self) -> bool { matches!(self, PlaybackState::Sounding { .. }) }

    pub fn active_frequency(&self) -> Option<f32> {
        match self {
            PlaybackState::Sounding { frequency_hz } => Some(*frequency_hz),
            PlaybackState::Silent                    => None,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// PlaybackTrigger
// ════════════════════════════════════════════════════════════════════════════

/// Sole owner and writer of the [`PlaybackState`].
#[derive(Debug)]
pub struct PlaybackTrigger<S: ToneSink> {
    sink:  S,
    state: PlaybackState,
}

impl<S: ToneSink> PlaybackTrigger<S> {
    pub fn new(sink: S) -> Self {
        Self { sink, state: PlaybackState::Silent }
    }

    pub fn state(&self) -> PlaybackState { self.state }

    pub fn sink(&self) -> &S { &self.sink }

    pub fn sink_mut(&mut self) -> &mut S { &mut self.sink }

    /// Start sounding `frequency_hz`.  While already sounding this glides
    /// instead of re-attacking.
    pub fn attack(&mut self, frequency_hz: f32) {
        if !self.sink.is_ready() {
            trace!(frequency_hz, "attack ignored, sink not ready");
            return;
        }
        match self.state {
            PlaybackState::Silent => {
                self.sink.attack(frequency_hz);
                self.state = PlaybackState::Sounding { frequency_hz };
                debug!(frequency_hz, "note on");
            }
            PlaybackState::Sounding { .. } => self.retarget(frequency_hz),
        }
    }

    /// Move the sounding note to `frequency_hz`.  No-op when silent or when
    /// the frequency is unchanged.
    pub fn retarget(&mut self, frequency_hz: f32) {
        if !self.sink.is_ready() {
            return;
        }
        if let PlaybackState::Sounding { frequency_hz: current } = self.state {
            if current != frequency_hz {
                self.sink.retarget(frequency_hz);
                self.state = PlaybackState::Sounding { frequency_hz };
                trace!(from = current, to = frequency_hz, "retarget");
            }
        }
    }

    /// Attack when silent, retarget when sounding.
    pub fn sound(&mut self, frequency_hz: f32) {
        match self.state {
            PlaybackState::Silent          => self.attack(frequency_hz),
            PlaybackState::Sounding { .. } => self.retarget(frequency_hz),
        }
    }

    /// Stop the sounding note.  No-op when silent.
    pub fn release(&mut self) {
        if !self.sink.is_ready() {
            return;
        }
        if self.state.is_sounding() {
            self.sink.release();
            self.state = PlaybackState::Silent;
            debug!("note off");
        }
    }

    /// Apply output volume; independent of the play state.
    pub fn set_volume(&mut self, percent: f32) {
        if self.sink.is_ready() {
            self.sink.set_volume(percent.clamp(0.0, 100.0));
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Test sink
// ════════════════════════════════════════════════════════════════════════════

/// One call received by a [`LogSink`].
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SinkCall {
    Attack(f32),
    Retarget(f32),
    Release,
    Volume(f32),
}

/// In-memory sink that records every call.
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Clone, Default)]
pub struct LogSink {
    pub calls: Vec<SinkCall>,
    /// When false the sink reports not-ready.
    pub ready: bool,
}

#[cfg(any(test, feature = "test-util"))]
impl LogSink {
    pub fn ready() -> Self {
        Self { calls: Vec::new(), ready: true }
    }

    /// Calls other than volume updates.
    pub fn note_calls(&self) -> Vec<SinkCall> {
        self.calls.iter().copied().filter(|c| !matches!(c, SinkCall::Volume(_))).collect()
    }
}

#[cfg(any(test, feature = "test-util"))]
impl ToneSink for LogSink {
    fn is_ready(&self) -> bool { self.ready }
    fn attack(&mut self, hz: f32)      { self.calls.push(SinkCall::Attack(hz)); }
    fn retarget(&mut self, hz: f32)    { self.calls.push(SinkCall::Retarget(hz)); }
    fn release(&mut self)              { self.calls.push(SinkCall::Release); }
    fn set_volume(&mut self, pct: f32) { self.calls.push(SinkCall::Volume(pct)); }
}
