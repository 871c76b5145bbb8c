//! The engine: one entry point per landmark frame, one per scheduler tick,
//! and the recording/playback control surface.
//!
//! Each component owns its own state; the engine only wires them together:
//!
//! ```text
//!  FrameInput ─▶ preprocess ─▶ PointerSample ─┬─ y ──▶ NoteSelector ──┐
//!                                             ├─ x ──▶ volume        ├─▶ PlaybackTrigger ─▶ ToneSink
//!                                             └─ z ──▶ OctaveMapper ──┘         ▲
//!                 note changes ─▶ Recorder ─▶ PlaybackScheduler ────────────────┘
//! ```

use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::{Result, ToneError};
use crate::landmark::{preprocess, FrameInput, PointerSample, Viewport};
use crate::mapping::{effective_volume, volume_multiplier, OctaveMapper};
use crate::recording::{RecordedEvent, Recorder};
use crate::scale::{self, effective_frequency};
use crate::scheduler::{CancelToken, PlaybackAction, PlaybackScheduler, PlaybackToggle};
use crate::selector::NoteSelector;
use crate::trigger::{PlaybackState, PlaybackTrigger, ToneSink};

// ════════════════════════════════════════════════════════════════════════════
// Snapshot
// ════════════════════════════════════════════════════════════════════════════

/// Per-tick view for UI and telemetry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    pub note_index:      Option<usize>,
    pub note_name:       Option<&'static str>,
    pub frequency_hz:    Option<f32>,
    pub octave_shift:    i32,
    pub volume_percent:  f32,
    pub fps:             f32,
    pub pointer:         Option<PointerSample>,
    pub state:           PlaybackState,
    pub is_recording:    bool,
    pub is_playing_back: bool,
}

// ════════════════════════════════════════════════════════════════════════════
// FpsMeter
// ════════════════════════════════════════════════════════════════════════════

/// Frames per second over windows of at least one second.
#[derive(Debug, Clone, Default)]
pub struct FpsMeter {
    window_start: Option<f64>,
    frames:       u32,
    fps:          f32,
}

impl FpsMeter {
    const WINDOW_MS: f64 = 1_000.0;

    pub fn fps(&self) -> f32 { self.fps }

    pub fn tick(&mut self, now_ms: f64) {
        let Some(start) = self.window_start else {
            self.window_start = Some(now_ms);
            return;
        };
        self.frames += 1;
        let elapsed = now_ms - start;
        if elapsed >= Self::WINDOW_MS {
            self.fps = (self.frames as f64 * 1_000.0 / elapsed) as f32;
            self.frames = 0;
            self.window_start = Some(now_ms);
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Engine
// ════════════════════════════════════════════════════════════════════════════

pub struct Engine<S: ToneSink> {
    cfg:            EngineConfig,
    selector:       NoteSelector,
    octave:         OctaveMapper,
    trigger:        PlaybackTrigger<S>,
    recorder:       Recorder,
    scheduler:      PlaybackScheduler,
    fps:            FpsMeter,
    base_volume:    f32,
    volume_percent: f32,
    pointer:        Option<PointerSample>,
}

impl<S: ToneSink> Engine<S> {
    /// Build an engine around `sink`.  Fails when `cfg` does not pass
    /// [`EngineConfig::validate`].
    pub fn new(cfg: EngineConfig, sink: S) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            selector:       NoteSelector::new(cfg.selector),
            octave:         OctaveMapper::new(cfg.octave),
            trigger:        PlaybackTrigger::new(sink),
            recorder:       Recorder::new(),
            scheduler:      PlaybackScheduler::new(cfg.playback.tail_delay_ms),
            fps:            FpsMeter::default(),
            base_volume:    cfg.volume.base_percent,
            volume_percent: cfg.volume.base_percent,
            pointer:        None,
            cfg,
        })
    }

    // ── live input ───────────────────────────────────────────────────────

    /// Process one landmark-source delivery.
    ///
    /// A missing hand resets the selector and, unless a playback run owns
    /// the trigger, releases the sounding note.
    pub fn process_frame(&mut self, input: &FrameInput, viewport: Viewport, now_ms: f64) -> Snapshot {
        self.fps.tick(now_ms);

        let Some(sample) = preprocess(input, viewport, &self.cfg.pointer) else {
            if self.pointer.take().is_some() {
                debug!("hand lost");
            }
            self.selector.reset();
            if !self.scheduler.is_active() {
                self.trigger.release();
            }
            return self.snapshot();
        };
        self.pointer = Some(sample);

        self.octave.update(sample.depth);
        let octave = self.octave.current();

        if let Some(index) = self.selector.update(sample.y, viewport.height, now_ms) {
            if let Some(hz) = effective_frequency(index, octave) {
                if let Some(n) = self.recorder.append(index, octave, hz, now_ms) {
                    debug!(event = n, index, octave, hz, "note recorded");
                }
            }
        }

        let multiplier = volume_multiplier(sample.x, viewport.width);
        self.volume_percent = effective_volume(self.base_volume, multiplier);
        self.trigger.set_volume(self.volume_percent);

        if !self.scheduler.is_active() {
            if let Some(hz) = self.live_frequency() {
                self.trigger.sound(hz);
            }
        }

        self.snapshot()
    }

    /// Advance playback to `now_ms`.  Returns whether a run is still active.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        let had_run = self.scheduler.has_run();
        for action in self.scheduler.poll(now_ms) {
            match action {
                PlaybackAction::Fire(event) => self.trigger.sound(event.frequency_hz),
                PlaybackAction::Finish      => self.trigger.release(),
            }
        }
        let active = self.scheduler.is_active();
        if had_run && !active {
            // Ended by completion or by a token cancel; either way silence.
            self.trigger.release();
        }
        active
    }

    /// Frequency the live input currently asks for.
    fn live_frequency(&self) -> Option<f32> {
        self.selector.current().and_then(|i| effective_frequency(i, self.octave.current()))
    }

    pub fn snapshot(&self) -> Snapshot {
        let note_index = self.selector.current();
        Snapshot {
            note_index,
            note_name:       note_index.and_then(scale::note).map(|n| n.name),
            frequency_hz:    self.live_frequency(),
            octave_shift:    self.octave.current(),
            volume_percent:  self.volume_percent,
            fps:             self.fps.fps(),
            pointer:         self.pointer,
            state:           self.trigger.state(),
            is_recording:    self.recorder.is_recording(),
            is_playing_back: self.scheduler.is_active(),
        }
    }

    // ── recording surface ────────────────────────────────────────────────

    pub fn start_recording(&mut self, now_ms: f64) { self.recorder.start(now_ms); }

    pub fn stop_recording(&mut self) { self.recorder.stop(); }

    pub fn clear_recording(&mut self) -> Result<()> { self.recorder.clear() }

    pub fn events(&self) -> &[RecordedEvent] { self.recorder.events() }

    pub fn selected(&self) -> Vec<usize> { self.recorder.selected() }

    pub fn is_selected(&self, index: usize) -> bool { self.recorder.is_selected(index) }

    pub fn set_selection(&mut self, indices: &[usize]) -> Result<()> { self.recorder.set_selection(indices) }

    pub fn toggle_selection(&mut self, index: usize) -> Result<bool> { self.recorder.toggle(index) }

    pub fn select_all(&mut self) { self.recorder.select_all(); }

    pub fn deselect_all(&mut self) { self.recorder.deselect_all(); }

    pub fn is_recording(&self) -> bool { self.recorder.is_recording() }

    // ── playback surface ─────────────────────────────────────────────────

    /// Replay the whole buffer, or stop the active run.
    pub fn play_all(&mut self, now_ms: f64) -> Result<PlaybackToggle> {
        if self.scheduler.is_active() {
            self.stop_playback();
            return Ok(PlaybackToggle::Stopped);
        }
        if self.recorder.is_empty() {
            return Err(ToneError::EmptyRecording);
        }
        let events = self.recorder.events().to_vec();
        self.start_run(events, now_ms)
    }

    /// Replay the selected events, or stop the active run.
    pub fn play_selected(&mut self, now_ms: f64) -> Result<PlaybackToggle> {
        if self.scheduler.is_active() {
            self.stop_playback();
            return Ok(PlaybackToggle::Stopped);
        }
        if self.recorder.is_empty() {
            return Err(ToneError::EmptyRecording);
        }
        let events = self.recorder.selected_events();
        self.start_run(events, now_ms)
    }

    fn start_run(&mut self, events: Vec<RecordedEvent>, now_ms: f64) -> Result<PlaybackToggle> {
        let outcome = self.scheduler.toggle(events, now_ms)?;
        // Each run starts from silence so its first event is a fresh attack.
        self.trigger.release();
        self.tick(now_ms);
        Ok(outcome)
    }

    /// Cancel the active run and silence it.  Returns whether a run was
    /// still active.  Idempotent.
    pub fn stop_playback(&mut self) -> bool {
        let had_run = self.scheduler.has_run();
        let stopped = self.scheduler.stop();
        if had_run {
            self.trigger.release();
        }
        stopped
    }

    /// Token of the current run; cancelling it stops the run, and the next
    /// [`tick`](Self::tick) or [`stop_playback`](Self::stop_playback)
    /// releases the note.
    pub fn playback_token(&self) -> Option<CancelToken> { self.scheduler.token() }

    /// Stop any run and release whatever is sounding, live or replayed.
    pub fn silence(&mut self) {
        self.stop_playback();
        self.trigger.release();
    }

    pub fn is_playing_back(&self) -> bool { self.scheduler.is_active() }

    /// `(fired, total)` of the active run.
    pub fn playback_progress(&self) -> Option<(usize, usize)> { self.scheduler.progress() }

    // ── misc ─────────────────────────────────────────────────────────────

    pub fn base_volume(&self) -> f32 { self.base_volume }

    pub fn set_base_volume(&mut self, percent: f32) {
        self.base_volume = percent.clamp(0.0, 100.0);
        info!(base_volume = self.base_volume, "base volume set");
    }

    pub fn state(&self) -> PlaybackState { self.trigger.state() }

    pub fn config(&self) -> &EngineConfig { &self.cfg }

    pub fn sink(&self) -> &S { self.trigger.sink() }

    pub fn sink_mut(&mut self) -> &mut S { self.trigger.sink_mut() }
}
