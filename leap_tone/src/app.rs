//! Top-level application state machine.
//!
//! `AppState` owns the [`Engine`] (and through it the tone sink), turns
//! [`ControlCommand`]s into engine calls, and keeps a one-line status for
//! the window.  [`run`] wires it to a landmark source and the visualizer.

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::Instant;

use anyhow::Result;
use tracing::{info, warn};

use gesture_tone::{
    Engine, EngineConfig, FrameInput, PlaybackToggle, Snapshot, ToneError, ToneSink, Viewport,
};

use crate::config::AppConfig;
use crate::midi_sink::MidiToneSink;
use crate::source::{ControlCommand, InputEvent, SimInput, SimLandmarkSource};
use crate::visualizer::{View, Visualizer};

/// Base-volume change per `+`/`-` press.
const VOLUME_STEP: f32 = 5.0;

// ════════════════════════════════════════════════════════════════════════════
// Arm: sinks that wait for a user action before sounding
// ════════════════════════════════════════════════════════════════════════════

pub trait Arm {
    fn arm(&mut self);
    fn is_armed(&self) -> bool;
}

impl Arm for MidiToneSink {
    fn arm(&mut self) { MidiToneSink::arm(self) }
    fn is_armed(&self) -> bool { MidiToneSink::is_armed(self) }
}

// ════════════════════════════════════════════════════════════════════════════
// Pending: one loop iteration's worth of input
// ════════════════════════════════════════════════════════════════════════════

/// Everything drained from the input channel in one go.  Frames are not
/// queued: only the newest survives.
#[derive(Debug, Default, PartialEq)]
pub struct Pending {
    pub controls: Vec<ControlCommand>,
    pub frame:    Option<FrameInput>,
    pub dropped:  usize,
    pub quit:     bool,
}

/// Drain without blocking.  A closed channel counts as quit.
pub fn drain_pending(rx: &Receiver<InputEvent>) -> Pending {
    let mut p = Pending::default();
    loop {
        let frame = match rx.try_recv() {
            Ok(InputEvent::Frame(f))       => FrameInput::Hand(f),
            Ok(InputEvent::NoHand)         => FrameInput::NoHand,
            Ok(InputEvent::Control(cmd))   => { p.controls.push(cmd); continue; }
            Ok(InputEvent::Quit)           => { p.quit = true; break; }
            Err(TryRecvError::Empty)        => break,
            Err(TryRecvError::Disconnected) => { p.quit = true; break; }
        };
        if p.frame.replace(frame).is_some() {
            p.dropped += 1;
        }
    }
    p
}

// ════════════════════════════════════════════════════════════════════════════
// AppState
// ════════════════════════════════════════════════════════════════════════════

pub struct AppState<S: ToneSink + Arm> {
    engine:   Engine<S>,
    viewport: Viewport,
    snapshot: Snapshot,
    was_playing: bool,

    // ── status message ────────────────────────────────────────────────────
    pub status: String,
}

impl<S: ToneSink + Arm> AppState<S> {
    pub fn new(cfg: EngineConfig, sink: S, viewport: Viewport) -> gesture_tone::Result<Self> {
        let engine = Engine::new(cfg, sink)?;
        let snapshot = engine.snapshot();
        Ok(AppState {
            engine,
            viewport,
            snapshot,
            was_playing: false,
            status: "Ready: press M to enable audio, R to record".to_string(),
        })
    }

    // ── process one ControlCommand ───────────────────────────────────────

    pub fn handle_control(&mut self, cmd: ControlCommand, now_ms: f64) {
        match cmd {
            ControlCommand::ArmAudio => {
                if self.engine.sink().is_armed() {
                    self.status = "Audio already on".to_string();
                } else {
                    self.engine.sink_mut().arm();
                    self.status = "Audio on: move your hand over the zones".to_string();
                }
            }

            ControlCommand::ToggleRecording => {
                if self.engine.is_recording() {
                    self.engine.stop_recording();
                    self.status = format!("Recording stopped: {} events", self.engine.events().len());
                } else {
                    self.engine.start_recording(now_ms);
                    self.status = "Recording: every note change is captured".to_string();
                }
            }

            ControlCommand::ClearRecording => match self.engine.clear_recording() {
                Ok(())  => self.status = "Recording cleared".to_string(),
                Err(e)  => self.report(e),
            },

            ControlCommand::PlayAll => {
                let r = self.engine.play_all(now_ms);
                self.playback_outcome(r);
            }

            ControlCommand::PlaySelected => {
                let r = self.engine.play_selected(now_ms);
                self.playback_outcome(r);
            }

            ControlCommand::StopPlayback => {
                self.status = if self.engine.stop_playback() {
                    "Playback stopped".to_string()
                } else {
                    "Nothing is playing".to_string()
                };
            }

            ControlCommand::SelectAll => {
                self.engine.select_all();
                self.status = format!("Selected all {} events", self.engine.events().len());
            }

            ControlCommand::DeselectAll => {
                self.engine.deselect_all();
                self.status = "Selection cleared".to_string();
            }

            ControlCommand::ToggleSelection(i) => match self.engine.toggle_selection(i) {
                Ok(true)  => self.status = format!("Event {} selected", i + 1),
                Ok(false) => self.status = format!("Event {} deselected", i + 1),
                Err(ToneError::SelectionOutOfRange { len, .. }) => {
                    // Events are numbered from 1 on screen.
                    self.status = format!("Event {} does not exist ({len} recorded)", i + 1);
                }
                Err(e)    => self.report(e),
            },

            ControlCommand::VolumeUp | ControlCommand::VolumeDown => {
                let step = if cmd == ControlCommand::VolumeUp { VOLUME_STEP } else { -VOLUME_STEP };
                self.engine.set_base_volume(self.engine.base_volume() + step);
                self.status = format!("Base volume {:.0}%", self.engine.base_volume());
            }
        }
        self.snapshot = self.engine.snapshot();
        self.was_playing = self.engine.is_playing_back();
    }

    fn playback_outcome(&mut self, r: gesture_tone::Result<PlaybackToggle>) {
        match r {
            Ok(PlaybackToggle::Started { events }) => {
                self.status = format!("Playing {events} events");
                if !self.engine.sink().is_armed() {
                    self.status.push_str(" (audio off, press M)");
                }
            }
            Ok(PlaybackToggle::Stopped) => self.status = "Playback stopped".to_string(),
            Err(e) => self.report(e),
        }
    }

    /// Show an engine error to the user.
    fn report(&mut self, e: ToneError) {
        if e.is_user_facing() {
            info!(reason = %e, "request refused");
        } else {
            warn!(error = %e, "engine error");
        }
        let mut msg = e.to_string();
        if let Some(first) = msg.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        self.status = msg;
    }

    // ── per-frame work ───────────────────────────────────────────────────

    pub fn handle_frame(&mut self, input: &FrameInput, now_ms: f64) {
        self.snapshot = self.engine.process_frame(input, self.viewport, now_ms);
    }

    /// Advance playback; notices when a run ends on its own.
    pub fn tick(&mut self, now_ms: f64) {
        let playing = self.engine.tick(now_ms);
        if self.was_playing && !playing {
            self.status = "Playback finished".to_string();
        }
        self.was_playing = playing;
        self.snapshot = self.engine.snapshot();
    }

    /// Apply one drained batch: controls in arrival order, then the newest
    /// frame, then the scheduler.
    pub fn apply(&mut self, pending: Pending, now_ms: f64) {
        for cmd in pending.controls {
            self.handle_control(cmd, now_ms);
        }
        if let Some(frame) = pending.frame {
            self.handle_frame(&frame, now_ms);
        }
        self.tick(now_ms);
    }

    /// Silence everything before exit.
    pub fn shutdown(&mut self) {
        self.engine.silence();
        info!(events = self.engine.events().len(), "shutting down");
    }

    // ── Accessors for the render loop ─────────────────────────────────────

    pub fn snapshot(&self) -> &Snapshot { &self.snapshot }
    pub fn engine(&self)   -> &Engine<S> { &self.engine }
    pub fn is_armed(&self) -> bool { self.engine.sink().is_armed() }
}

// ════════════════════════════════════════════════════════════════════════════
// run(): the main application loop
// ════════════════════════════════════════════════════════════════════════════

/// Run the full application.
///
/// This is the entry point called from `main.rs`.  It opens the MIDI port
/// and the window, starts the landmark source (simulation by default,
/// hardware with `--features leap`), and drives the input/render loop at
/// ~60 fps.
pub fn run(cfg: AppConfig) -> Result<()> {
    // ── Input channel(s) ──────────────────────────────────────────────────
    let (sim_tx, sim_rx) = mpsc::channel::<SimInput>();
    let input_rx = spawn_sources(sim_rx, &cfg);

    // ── Visualizer (owns the window and the sim input sender) ────────────
    let mut vis = Visualizer::new(&cfg.window, sim_tx)?;

    // ── App state ─────────────────────────────────────────────────────────
    let sink = MidiToneSink::open(cfg.midi.clone());
    let mut app = AppState::new(cfg.engine, sink, vis.viewport())?;
    let clock = Instant::now();

    info!(viewport = ?vis.viewport(), "entering main loop");

    // ── Main loop ─────────────────────────────────────────────────────────
    while vis.is_open() {
        let open = vis.poll_input();
        let now_ms = clock.elapsed().as_secs_f64() * 1_000.0;

        let pending = drain_pending(&input_rx);
        let quit = pending.quit;
        app.apply(pending, now_ms);

        let engine = app.engine();
        let selected = engine.selected();
        vis.render(&View {
            snapshot: app.snapshot(),
            events:   engine.events(),
            selected: &selected,
            progress: engine.playback_progress(),
            armed:    app.is_armed(),
            status:   &app.status,
        });

        if quit || !open { break; }
    }

    app.shutdown();
    Ok(())
}

#[cfg(not(feature = "leap"))]
fn spawn_sources(sim_rx: Receiver<SimInput>, cfg: &AppConfig) -> Receiver<InputEvent> {
    use crate::source::spawn_landmark_source;
    let depth = (cfg.engine.octave.min_z, cfg.engine.octave.max_z);
    spawn_landmark_source(SimLandmarkSource::new(sim_rx, depth))
}

#[cfg(feature = "leap")]
fn spawn_sources(sim_rx: Receiver<SimInput>, _cfg: &AppConfig) -> Receiver<InputEvent> {
    use crate::source::{spawn_into, LeapLandmarkSource};
    let (tx, rx) = mpsc::channel();
    spawn_into(SimLandmarkSource::controls_only(sim_rx), tx.clone());
    spawn_into(LeapLandmarkSource, tx);
    rx
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
