//! A [`ToneSink`] that plays through a MIDI output port.
//!
//! A frequency is sent as the nearest MIDI note plus a 14-bit pitch bend for
//! the remainder.  Retargets that stay within the bend range are pure
//! pitch-bend glides on the held note; larger jumps strike the new note
//! before releasing the old one (legato).  Volume goes out as CC 7.
//!
//! The sink reports not-ready until [`MidiToneSink::arm`] is called, so
//! nothing sounds before the user asks for audio.

use tracing::{debug, info, warn};

use gesture_tone::ToneSink;

use crate::config::MidiConfig;

// ════════════════════════════════════════════════════════════════════════════
// MidiOut: abstraction over midir / null (for testing)
// ════════════════════════════════════════════════════════════════════════════

/// A raw MIDI byte sink, with helpers for the channel messages used here.
pub trait MidiOut: Send {
    fn send(&mut self, msg: &[u8]);

    fn program_change(&mut self, channel: u8, program: u8) {
        self.send(&[0xC0 | (channel & 0x0F), program & 0x7F]);
    }
    fn note_on(&mut self, channel: u8, note: u8, velocity: u8) {
        self.send(&[0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F]);
    }
    fn note_off(&mut self, channel: u8, note: u8) {
        self.send(&[0x80 | (channel & 0x0F), note & 0x7F, 0]);
    }
    fn control_change(&mut self, channel: u8, controller: u8, value: u8) {
        self.send(&[0xB0 | (channel & 0x0F), controller & 0x7F, value & 0x7F]);
    }
    /// `value` is 14-bit, 8192 = centre.
    fn pitch_bend(&mut self, channel: u8, value: u16) {
        let v = value.min(0x3FFF);
        self.send(&[0xE0 | (channel & 0x0F), (v & 0x7F) as u8, (v >> 7) as u8]);
    }
}

// ── midir backend ─────────────────────────────────────────────────────────

struct MidirOut {
    conn: midir::MidiOutputConnection,
}

impl MidiOut for MidirOut {
    fn send(&mut self, msg: &[u8]) {
        if let Err(e) = self.conn.send(msg) {
            debug!(error = %e, "midi send failed");
        }
    }
}

// ── null backend (used when no MIDI port is available) ────────────────────

pub struct NullOut;

impl MidiOut for NullOut {
    fn send(&mut self, _msg: &[u8]) {}
}

// ════════════════════════════════════════════════════════════════════════════
// open_midi_output: enumerate ports and pick one
// ════════════════════════════════════════════════════════════════════════════

/// Index of the port to open: the first whose name contains `hint`
/// (case-insensitive), else the first that looks like a software synth,
/// else 0.
pub fn pick_port(names: &[String], hint: &str) -> usize {
    let hint = hint.to_lowercase();
    let lower: Vec<String> = names.iter().map(|n| n.to_lowercase()).collect();
    if !hint.is_empty() {
        if let Some(i) = lower.iter().position(|n| n.contains(&hint)) {
            return i;
        }
    }
    lower
        .iter()
        .position(|n| {
            n.contains("fluid") || n.contains("timidity") || n.contains("microsoft")
                || n.contains("gm") || n.contains("synth")
        })
        .unwrap_or(0)
}

/// Try to open a MIDI output port.
/// Falls back to `NullOut` with a warning if none can be opened.
pub fn open_midi_output(hint: &str) -> Box<dyn MidiOut> {
    let midi_out = match midir::MidiOutput::new("leap_tone") {
        Ok(m)  => m,
        Err(e) => {
            warn!(error = %e, "MIDI init failed, using null output");
            return Box::new(NullOut);
        }
    };

    let ports = midi_out.ports();
    if ports.is_empty() {
        warn!("no MIDI output ports found, using null output");
        warn!("start a synthesiser such as `fluidsynth` or `timidity -iA`");
        return Box::new(NullOut);
    }

    let names: Vec<String> = ports
        .iter()
        .map(|p| midi_out.port_name(p).unwrap_or_else(|_| "Unknown".to_string()))
        .collect();
    let idx = pick_port(&names, hint);
    let Some(port) = ports.get(idx) else {
        return Box::new(NullOut);
    };
    info!(port = %names[idx], "opening MIDI port");

    match midi_out.connect(port, "leap-tone") {
        Ok(conn) => Box::new(MidirOut { conn }),
        Err(e) => {
            warn!(error = %e, "failed to connect, using null output");
            Box::new(NullOut)
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Pitch arithmetic
// ════════════════════════════════════════════════════════════════════════════

const BEND_CENTRE: f32 = 8192.0;

/// Fractional MIDI note number of `hz` (A4 = 440 Hz = 69).
pub fn freq_to_midi(hz: f32) -> f32 {
    69.0 + 12.0 * (hz / 440.0).log2()
}

/// 14-bit bend for an offset in semitones, given the bend range.
pub fn bend_value(semitones: f32, range: u8) -> u16 {
    let range = f32::from(range.max(1));
    (BEND_CENTRE + semitones / range * BEND_CENTRE).round().clamp(0.0, 16383.0) as u16
}

/// Nearest note and the bend that corrects it to `hz`.
pub fn split_pitch(hz: f32, range: u8) -> (u8, u16) {
    let m = freq_to_midi(hz);
    let note = m.round().clamp(0.0, 127.0);
    (note as u8, bend_value(m - note, range))
}

// ════════════════════════════════════════════════════════════════════════════
// MidiToneSink
// ════════════════════════════════════════════════════════════════════════════

pub struct MidiToneSink {
    out:    Box<dyn MidiOut>,
    cfg:    MidiConfig,
    armed:  bool,
    /// Note currently held.
    note:   Option<u8>,
    /// Last CC 7 value sent.
    volume: Option<u8>,
}

impl MidiToneSink {
    pub fn new(out: Box<dyn MidiOut>, cfg: MidiConfig) -> Self {
        Self { out, cfg, armed: false, note: None, volume: None }
    }

    /// Open the configured port (or a null output).
    pub fn open(cfg: MidiConfig) -> Self {
        let out = open_midi_output(&cfg.port_hint);
        Self::new(out, cfg)
    }

    pub fn is_armed(&self) -> bool { self.armed }

    pub fn held_note(&self) -> Option<u8> { self.note }

    /// Enable output: program change, bend range (RPN 0) and a centred bend.
    pub fn arm(&mut self) {
        if self.armed {
            return;
        }
        let ch = self.cfg.channel;
        self.out.program_change(ch, self.cfg.program);
        self.out.control_change(ch, 101, 0);
        self.out.control_change(ch, 100, 0);
        self.out.control_change(ch, 6, self.cfg.bend_range);
        self.out.control_change(ch, 38, 0);
        self.out.pitch_bend(ch, BEND_CENTRE as u16);
        self.armed = true;
        info!(program = self.cfg.program, channel = ch, "audio armed");
    }

    fn strike(&mut self, hz: f32) -> u8 {
        let (note, bend) = split_pitch(hz, self.cfg.bend_range);
        self.out.pitch_bend(self.cfg.channel, bend);
        self.out.note_on(self.cfg.channel, note, self.cfg.velocity);
        note
    }
}

impl ToneSink for MidiToneSink {
    fn is_ready(&self) -> bool { self.armed }

    fn attack(&mut self, frequency_hz: f32) {
        if let Some(old) = self.note.take() {
            self.out.note_off(self.cfg.channel, old);
        }
        self.note = Some(self.strike(frequency_hz));
    }

    fn retarget(&mut self, frequency_hz: f32) {
        let Some(held) = self.note else {
            self.attack(frequency_hz);
            return;
        };
        let offset = freq_to_midi(frequency_hz) - f32::from(held);
        if offset.abs() <= f32::from(self.cfg.bend_range) {
            self.out.pitch_bend(self.cfg.channel, bend_value(offset, self.cfg.bend_range));
        } else {
            let note = self.strike(frequency_hz);
            if note != held {
                self.out.note_off(self.cfg.channel, held);
            }
            self.note = Some(note);
        }
    }

    fn release(&mut self) {
        if let Some(n) = self.note.take() {
            self.out.note_off(self.cfg.channel, n);
        }
    }

    fn set_volume(&mut self, percent: f32) {
        let cc = (percent.clamp(0.0, 100.0) / 100.0 * 127.0).round() as u8;
        if self.volume != Some(cc) {
            self.out.control_change(self.cfg.channel, 7, cc);
            self.volume = Some(cc);
        }
    }
}

impl Drop for MidiToneSink {
    fn drop(&mut self) {
        if self.armed {
            self.release();
            self.out.control_change(self.cfg.channel, 123, 0); // all notes off
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct CaptureOut(Arc<Mutex<Vec<Vec<u8>>>>);

    impl MidiOut for CaptureOut {
        fn send(&mut self, msg: &[u8]) { self.0.lock().unwrap().push(msg.to_vec()); }
    }

    impl CaptureOut {
        fn take(&self) -> Vec<Vec<u8>> { std::mem::take(&mut *self.0.lock().unwrap()) }
    }

    fn armed_sink() -> (MidiToneSink, CaptureOut) {
        let cap = CaptureOut::default();
        let mut s = MidiToneSink::new(Box::new(cap.clone()), MidiConfig::default());
        s.arm();
        cap.take();
        (s, cap)
    }

    #[test]
    fn a440_is_note_69_unbent() {
        assert!((freq_to_midi(440.0) - 69.0).abs() < 1e-5);
        assert_eq!(split_pitch(440.0, 2), (69, 8192));
    }

    #[test]
    fn scale_notes_land_near_equal_temperament() {
        // C4 261.63 Hz → 60, B4 493.88 Hz → 71, both within a few cents.
        let (c, cb) = split_pitch(261.63, 2);
        let (b, bb) = split_pitch(493.88, 2);
        assert_eq!((c, b), (60, 71));
        assert!((i32::from(cb) - 8192).abs() < 20);
        assert!((i32::from(bb) - 8192).abs() < 20);
    }

    #[test]
    fn bend_extremes_clamp() {
        assert_eq!(bend_value(2.0, 2), 16383);
        assert_eq!(bend_value(-2.0, 2), 0);
        assert_eq!(bend_value(-9.0, 2), 0);
    }

    #[test]
    fn not_ready_until_armed() {
        let cap = CaptureOut::default();
        let mut s = MidiToneSink::new(Box::new(cap.clone()), MidiConfig::default());
        assert!(!s.is_ready());
        s.arm();
        assert!(s.is_ready());
        let sent = cap.take();
        assert_eq!(sent[0], vec![0xC0, 80]);
        assert!(sent.contains(&vec![0xB0, 6, 2]));
        s.arm();
        assert!(cap.take().is_empty());
    }

    #[test]
    fn attack_bends_then_strikes() {
        let (mut s, cap) = armed_sink();
        s.attack(440.0);
        assert_eq!(cap.take(), vec![vec![0xE0, 0x00, 0x40], vec![0x90, 69, 100]]);
        assert_eq!(s.held_note(), Some(69));
    }

    #[test]
    fn small_retarget_is_pure_bend() {
        let (mut s, cap) = armed_sink();
        s.attack(440.0);
        cap.take();
        s.retarget(493.88); // +2 semitones from A4
        let sent = cap.take();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0][0], 0xE0);
        assert_eq!(s.held_note(), Some(69));
    }

    #[test]
    fn large_retarget_is_legato_note_change() {
        let (mut s, cap) = armed_sink();
        s.attack(440.0);
        cap.take();
        s.retarget(880.0);
        let sent = cap.take();
        assert_eq!(sent[1], vec![0x90, 81, 100]);
        assert_eq!(sent[2], vec![0x80, 69, 0]);
        assert_eq!(s.held_note(), Some(81));
    }

    #[test]
    fn release_sends_note_off_once() {
        let (mut s, cap) = armed_sink();
        s.attack(261.63);
        cap.take();
        s.release();
        s.release();
        assert_eq!(cap.take(), vec![vec![0x80, 60, 0]]);
    }

    #[test]
    fn volume_sent_only_on_change() {
        let (mut s, cap) = armed_sink();
        s.set_volume(100.0);
        s.set_volume(100.0);
        s.set_volume(0.0);
        assert_eq!(cap.take(), vec![vec![0xB0, 7, 127], vec![0xB0, 7, 0]]);
    }

    #[test]
    fn port_preference() {
        let names = vec!["Midi Through".to_string(), "FLUID Synth".to_string(), "USB Keys".to_string()];
        assert_eq!(pick_port(&names, ""), 1);
        assert_eq!(pick_port(&names, "usb"), 2);
        assert_eq!(pick_port(&names, "nope"), 1);
        assert_eq!(pick_port(&["A".to_string()], ""), 0);
    }
}
