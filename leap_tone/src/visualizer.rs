//! Software-rendered visualizer using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌──────────────────────────────────────────┬──────────────┐
//! │ B  ───────────────────────────────────── │  NOTE / HZ   │
//! │ A  ───────────────────────────────────── │  OCTAVE ▮▮▯  │
//! │ G  ─────────────────── ✛ pointer ─────── │  VOLUME ▮▮▮  │
//! │ F  ───────────────────────────────────── │  FPS         │
//! │ E  ───────────────────────────────────── │──────────────│
//! │ D  ───────────────────────────────────── │  EVENTS      │
//! │ C  ───────────────────────────────────── │  [x] 1 B+0   │
//! ├──────────────────────────────────────────┴──────────────┤
//! │ status bar / key legend                                  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The stage (left) is also the simulated camera image: the mouse position
//! over it becomes the fingertip, normalised to the stage size.

use std::sync::mpsc::Sender;
use std::time::Duration;

use anyhow::{anyhow, Result};
use minifb::{Key, KeyRepeat, MouseMode, Window, WindowOptions};

use gesture_tone::scale::{self, MAX_OCTAVE, MIN_OCTAVE, NOTE_COUNT};
use gesture_tone::{RecordedEvent, Snapshot, Viewport};

use crate::config::WindowConfig;
use crate::source::{ControlCommand, SimInput};

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

const PANEL_W:      usize = 240;
const STATUS_H:     usize = 36;
const BG_COLOR:     u32   = 0xFF1A1A2E;
const PANEL_BG:     u32   = 0xFF16213E;
const TEXT_BG:      u32   = 0xFF0F3460;
const POINTER:      u32   = 0xFFFFFFFF;
const ACCENT:       u32   = 0xFFFFD700;  // gold
const REC_COLOR:    u32   = 0xFFE53935;
const GAUGE_OFF:    u32   = 0xFF2E3A59;

/// Zone colours, top (B) to bottom (C).
const ZONE_COLORS: [u32; NOTE_COUNT] = [
    0xFF5C2A6E, 0xFF3A3F8F, 0xFF245E8A, 0xFF1F6F5C, 0xFF4F7A28, 0xFF8A6A1F, 0xFF8A3A2A,
];

/// Depth change per arrow-key repeat.
const DEPTH_STEP:  f32 = 0.004;
/// Depth change per scroll-wheel unit.
const SCROLL_STEP: f32 = 0.002;

/// Keys that issue one command per press.
const COMMAND_KEYS: [(Key, ControlCommand); 12] = [
    (Key::M,           ControlCommand::ArmAudio),
    (Key::R,           ControlCommand::ToggleRecording),
    (Key::C,           ControlCommand::ClearRecording),
    (Key::P,           ControlCommand::PlayAll),
    (Key::O,           ControlCommand::PlaySelected),
    (Key::X,           ControlCommand::StopPlayback),
    (Key::A,           ControlCommand::SelectAll),
    (Key::N,           ControlCommand::DeselectAll),
    (Key::Equal,       ControlCommand::VolumeUp),
    (Key::NumPadPlus,  ControlCommand::VolumeUp),
    (Key::Minus,       ControlCommand::VolumeDown),
    (Key::NumPadMinus, ControlCommand::VolumeDown),
];

const KEY_LEGEND: &str =
    "M=audio R=rec C=clear P=play O=play sel X=stop A/N=all/none 1-9=pick +/-=vol UP/DN=depth Q=quit";

const DIGIT_KEYS: [Key; 9] = [
    Key::Key1, Key::Key2, Key::Key3, Key::Key4, Key::Key5,
    Key::Key6, Key::Key7, Key::Key8, Key::Key9,
];

// ════════════════════════════════════════════════════════════════════════════
// View: what one frame shows
// ════════════════════════════════════════════════════════════════════════════

pub struct View<'a> {
    pub snapshot: &'a Snapshot,
    pub events:   &'a [RecordedEvent],
    pub selected: &'a [usize],
    /// `(fired, total)` of the active playback run.
    pub progress: Option<(usize, usize)>,
    pub armed:    bool,
    pub status:   &'a str,
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

pub struct Visualizer {
    window:  Window,
    buf:     Vec<u32>,
    w:       usize,
    h:       usize,
    sim_tx:  Sender<SimInput>,
}

impl Visualizer {
    pub fn new(cfg: &WindowConfig, sim_tx: Sender<SimInput>) -> Result<Self> {
        let (w, h) = (cfg.width, cfg.height);
        let mut window = Window::new(
            "Leap Tone: hand-tracking theremin",
            w, h,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        ).map_err(|e| anyhow!("failed to open window: {e}"))?;

        window.limit_update_rate(Some(Duration::from_millis(16))); // ~60fps

        Ok(Visualizer { window, buf: vec![BG_COLOR; w * h], w, h, sim_tx })
    }

    fn stage_w(&self) -> usize { self.w - PANEL_W }

    fn stage_h(&self) -> usize { self.h - STATUS_H }

    /// The stage in pixels; this is the image the landmarks live in.
    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.stage_w() as f32, self.stage_h() as f32)
    }

    /// Returns false when the window should close.
    pub fn is_open(&self) -> bool { self.window.is_open() }

    /// Poll keyboard and mouse and translate them to [`SimInput`]s.
    /// Returns false once the user asked to quit.
    pub fn poll_input(&mut self) -> bool {
        if !self.window.is_open() { return false; }

        let send = |tx: &Sender<SimInput>, input: SimInput| { let _ = tx.send(input); };

        if self.window.is_key_pressed(Key::Q, KeyRepeat::No) {
            send(&self.sim_tx, SimInput::Quit);
            return false;
        }

        for (key, cmd) in COMMAND_KEYS {
            if self.window.is_key_pressed(key, KeyRepeat::No) {
                send(&self.sim_tx, SimInput::Command(cmd));
            }
        }
        for (i, key) in DIGIT_KEYS.iter().enumerate() {
            if self.window.is_key_pressed(*key, KeyRepeat::No) {
                send(&self.sim_tx, SimInput::Command(ControlCommand::ToggleSelection(i)));
            }
        }

        // Depth: arrows repeat while held, wheel scrolls
        if self.window.is_key_pressed(Key::Up, KeyRepeat::Yes) {
            send(&self.sim_tx, SimInput::Depth(DEPTH_STEP));
        }
        if self.window.is_key_pressed(Key::Down, KeyRepeat::Yes) {
            send(&self.sim_tx, SimInput::Depth(-DEPTH_STEP));
        }
        if let Some((_, dy)) = self.window.get_scroll_wheel() {
            if dy != 0.0 {
                send(&self.sim_tx, SimInput::Depth(dy * SCROLL_STEP));
            }
        }

        let (sw, sh) = (self.stage_w() as f32, self.stage_h() as f32);
        let pointer = match self.window.get_mouse_pos(MouseMode::Discard) {
            Some((mx, my)) if mx < sw && my < sh => SimInput::Pointer { x: mx / sw, y: my / sh },
            _ => SimInput::PointerLost,
        };
        send(&self.sim_tx, pointer);

        true
    }

    /// Render one frame.
    pub fn render(&mut self, view: &View) {
        self.buf.fill(BG_COLOR);
        let snap = view.snapshot;

        self.draw_zones(snap.note_index);
        if let Some(p) = snap.pointer {
            self.draw_pointer(p.x, p.y);
        }

        // ── Panel ─────────────────────────────────────────────────────────
        let px = self.stage_w();
        self.fill_rect(px, 0, PANEL_W, self.stage_h(), PANEL_BG);
        let tx = px + 10;

        let note = match (snap.note_name, snap.frequency_hz) {
            (Some(n), Some(hz)) => format!("NOTE {n}  {hz:.1} HZ"),
            _                   => "NOTE -".to_string(),
        };
        self.draw_label(&note, tx, 12, ACCENT);
        self.draw_label(&format!("OCTAVE {:+}", snap.octave_shift), tx, 30, 0xFFEEEEEE);
        self.draw_octave_gauge(tx, 40, snap.octave_shift);
        self.draw_label(&format!("VOLUME {:.0}%", snap.volume_percent), tx, 60, 0xFFEEEEEE);
        self.draw_bar(tx, 70, PANEL_W - 20, 8, snap.volume_percent / 100.0);
        self.draw_label(&format!("FPS {:.0}", snap.fps), tx, 88, 0xFF888888);

        let audio = if view.armed { "AUDIO ON" } else { "AUDIO OFF - PRESS M" };
        self.draw_label(audio, tx, 100, if view.armed { 0xFF8BC34A } else { 0xFF888888 });

        if snap.is_recording {
            self.fill_rect(tx, 116, 6, 6, REC_COLOR);
            self.draw_label("REC", tx + 10, 117, REC_COLOR);
        }
        if let Some((fired, total)) = view.progress {
            self.draw_label(&format!("PLAY {fired}/{total}"), tx + 60, 117, ACCENT);
        }

        self.draw_events(tx, 136, view.events, view.selected, view.progress.map(|p| p.0));

        // ── Status bar ────────────────────────────────────────────────────
        let sy = self.stage_h();
        self.fill_rect(0, sy, self.w, STATUS_H, TEXT_BG);
        self.draw_label(view.status, 10, sy + 8, 0xFFEEEEEE);

        // ── Key legend ────────────────────────────────────────────────────
        self.draw_label(KEY_LEGEND, 10, self.h - 12, 0xFF888888);

        self.window.update_with_buffer(&self.buf, self.w, self.h).ok();
    }

    // ── Stage ─────────────────────────────────────────────────────────────

    fn draw_zones(&mut self, current: Option<usize>) {
        let sw = self.stage_w();
        let sh = self.stage_h();
        for (i, &color) in ZONE_COLORS.iter().enumerate() {
            let y0 = i * sh / NOTE_COUNT;
            let y1 = (i + 1) * sh / NOTE_COUNT;
            let color = if current == Some(i) { blend(color, 0xFFFFFFFF, 0.35) } else { color };
            self.fill_rect(0, y0, sw, y1 - y0, color);
            self.draw_border(0, y0, sw, y1 - y0, 0xFF000000);
            if let Some(n) = scale::note(i) {
                self.draw_label(n.name, 8, y0 + (y1 - y0) / 2 - 2, 0xFFEEEEEE);
            }
        }
    }

    fn draw_pointer(&mut self, x: f32, y: f32) {
        if x < 0.0 || y < 0.0 { return; }
        let (cx, cy) = (x as usize, y as usize);
        for d in 0..=8usize {
            self.set_pixel(cx + d, cy, POINTER);
            self.set_pixel(cx.saturating_sub(d), cy, POINTER);
            self.set_pixel(cx, cy + d, POINTER);
            self.set_pixel(cx, cy.saturating_sub(d), POINTER);
        }
    }

    // ── Gauges ────────────────────────────────────────────────────────────

    fn draw_octave_gauge(&mut self, x: usize, y: usize, octave: i32) {
        for (slot, o) in (MIN_OCTAVE..=MAX_OCTAVE).enumerate() {
            let color = if o == octave { ACCENT } else { GAUGE_OFF };
            self.fill_rect(x + slot * 22, y, 18, 8, color);
        }
    }

    fn draw_bar(&mut self, x: usize, y: usize, w: usize, h: usize, fraction: f32) {
        self.fill_rect(x, y, w, h, GAUGE_OFF);
        let filled = (w as f32 * fraction.clamp(0.0, 1.0)) as usize;
        self.fill_rect(x, y, filled, h, ACCENT);
    }

    // ── Event list ────────────────────────────────────────────────────────

    fn draw_events(
        &mut self,
        x: usize,
        y: usize,
        events: &[RecordedEvent],
        selected: &[usize],
        playing: Option<usize>,
    ) {
        self.draw_label(&format!("EVENTS ({})", events.len()), x, y, ACCENT);
        let mut ey = y + 12;
        for (i, ev) in events.iter().enumerate() {
            if ey + 10 > self.stage_h() {
                self.draw_label("...", x, ey, 0xFF888888);
                break;
            }
            let mark = if selected.contains(&i) { "[X]" } else { "[ ]" };
            let line = format!(
                "{mark} {:>2} {}{:+} {:.0}MS",
                i + 1, ev.note_name(), ev.octave_shift, ev.timestamp_ms
            );
            let color = if playing == Some(i + 1) { ACCENT } else { 0xFFCCCCCC };
            self.draw_label(&line, x, ey, color);
            ey += 9;
        }
    }

    // ── Primitive drawing helpers ─────────────────────────────────────────

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        let x1 = (x + w).min(self.w);
        if x >= x1 { return; }
        for row in y..(y + h).min(self.h) {
            let base = row * self.w;
            self.buf[base + x..base + x1].fill(color);
        }
    }

    fn draw_border(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        if w == 0 || h == 0 { return; }
        for col in x..(x + w).min(self.w) {
            self.set_pixel(col, y, color);
            self.set_pixel(col, y + h - 1, color);
        }
        for row in y..(y + h).min(self.h) {
            self.set_pixel(x, row, color);
            self.set_pixel(x + w - 1, row, color);
        }
    }

    fn set_pixel(&mut self, x: usize, y: usize, color: u32) {
        if x < self.w && y < self.h {
            self.buf[y * self.w + x] = color;
        }
    }

    /// Draw `text` in the 3×5 font, clipped at the right edge.
    fn draw_label(&mut self, text: &str, x: usize, y: usize, color: u32) {
        for (i, ch) in text.chars().enumerate() {
            let gx = x + i * GLYPH_ADVANCE;
            if gx + GLYPH_ADVANCE > self.w { break; }
            self.draw_glyph(glyph(ch), gx, y, color);
        }
    }

    fn draw_glyph(&mut self, rows: [u8; 5], x: usize, y: usize, color: u32) {
        for (dy, bits) in rows.into_iter().enumerate() {
            for dx in (0..3).filter(|dx| bits & (0b100 >> dx) != 0) {
                self.set_pixel(x + dx, y + dy, color);
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// 3×5 bitmap font
// ════════════════════════════════════════════════════════════════════════════

/// Glyph width plus one column of spacing.
const GLYPH_ADVANCE: usize = 4;

/// Rows top to bottom, 3 bits each, leftmost pixel in the high bit.
/// Only the characters the window ever shows; letters are upper case and
/// lookups fold case.
const FONT: [(char, [u8; 5]); 48] = [
    ('0', [0b111, 0b101, 0b101, 0b101, 0b111]),
    ('1', [0b010, 0b110, 0b010, 0b010, 0b111]),
    ('2', [0b111, 0b001, 0b111, 0b100, 0b111]),
    ('3', [0b111, 0b001, 0b111, 0b001, 0b111]),
    ('4', [0b101, 0b101, 0b111, 0b001, 0b001]),
    ('5', [0b111, 0b100, 0b111, 0b001, 0b111]),
    ('6', [0b111, 0b100, 0b111, 0b101, 0b111]),
    ('7', [0b111, 0b001, 0b001, 0b001, 0b001]),
    ('8', [0b111, 0b101, 0b111, 0b101, 0b111]),
    ('9', [0b111, 0b101, 0b111, 0b001, 0b111]),
    ('A', [0b111, 0b101, 0b111, 0b101, 0b101]),
    ('B', [0b110, 0b101, 0b110, 0b101, 0b110]),
    ('C', [0b111, 0b100, 0b100, 0b100, 0b111]),
    ('D', [0b110, 0b101, 0b101, 0b101, 0b110]),
    ('E', [0b111, 0b100, 0b111, 0b100, 0b111]),
    ('F', [0b111, 0b100, 0b111, 0b100, 0b100]),
    ('G', [0b111, 0b100, 0b101, 0b101, 0b111]),
    ('H', [0b101, 0b101, 0b111, 0b101, 0b101]),
    ('I', [0b111, 0b010, 0b010, 0b010, 0b111]),
    ('K', [0b101, 0b101, 0b110, 0b101, 0b101]),
    ('L', [0b100, 0b100, 0b100, 0b100, 0b111]),
    ('M', [0b101, 0b111, 0b101, 0b101, 0b101]),
    ('N', [0b111, 0b101, 0b101, 0b101, 0b101]),
    ('O', [0b111, 0b101, 0b101, 0b101, 0b111]),
    ('P', [0b111, 0b101, 0b111, 0b100, 0b100]),
    ('Q', [0b111, 0b101, 0b101, 0b111, 0b001]),
    ('R', [0b110, 0b101, 0b110, 0b101, 0b101]),
    ('S', [0b111, 0b100, 0b111, 0b001, 0b111]),
    ('T', [0b111, 0b010, 0b010, 0b010, 0b010]),
    ('U', [0b101, 0b101, 0b101, 0b101, 0b111]),
    ('V', [0b101, 0b101, 0b101, 0b010, 0b010]),
    ('W', [0b101, 0b101, 0b101, 0b111, 0b101]),
    ('X', [0b101, 0b101, 0b010, 0b101, 0b101]),
    ('Y', [0b101, 0b101, 0b111, 0b010, 0b010]),
    ('Z', [0b111, 0b001, 0b010, 0b100, 0b111]),
    (' ', [0b000, 0b000, 0b000, 0b000, 0b000]),
    ('%', [0b101, 0b001, 0b010, 0b100, 0b101]),
    ('(', [0b010, 0b100, 0b100, 0b100, 0b010]),
    (')', [0b010, 0b001, 0b001, 0b001, 0b010]),
    ('+', [0b000, 0b010, 0b111, 0b010, 0b000]),
    (',', [0b000, 0b000, 0b000, 0b010, 0b100]),
    ('-', [0b000, 0b000, 0b111, 0b000, 0b000]),
    ('.', [0b000, 0b000, 0b000, 0b000, 0b010]),
    ('/', [0b001, 0b001, 0b010, 0b100, 0b100]),
    (':', [0b000, 0b010, 0b000, 0b010, 0b000]),
    ('=', [0b000, 0b111, 0b000, 0b111, 0b000]),
    ('[', [0b110, 0b100, 0b100, 0b100, 0b110]),
    (']', [0b011, 0b001, 0b001, 0b001, 0b011]),
];

/// Drawn for anything not in [`FONT`].
const MISSING_GLYPH: [u8; 5] = [0b000, 0b000, 0b010, 0b000, 0b000];

fn glyph(c: char) -> [u8; 5] {
    let c = c.to_ascii_uppercase();
    FONT.iter().find(|(k, _)| *k == c).map_or(MISSING_GLYPH, |(_, rows)| *rows)
}

/// Mix two ARGB colours: `t` = 0 gives `a`, 1 gives `b`.  The result is opaque.
fn blend(a: u32, b: u32, t: f32) -> u32 {
    let t = t.clamp(0.0, 1.0);
    [16u32, 8, 0].into_iter().fold(0xFF00_0000, |acc, shift| {
        let ca = ((a >> shift) & 0xFF) as f32;
        let cb = ((b >> shift) & 0xFF) as f32;
        acc | (((ca + (cb - ca) * t).round() as u32) << shift)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blend_endpoints() {
        assert_eq!(blend(0xFF000000, 0xFFFFFFFF, 0.0), 0xFF000000);
        assert_eq!(blend(0xFF000000, 0xFFFFFFFF, 1.0), 0xFFFFFFFF);
        assert_eq!(blend(0xFF102030, 0xFF102030, 0.5), 0xFF102030);
    }

    #[test]
    fn every_legend_char_has_a_glyph() {
        for ch in KEY_LEGEND.chars() {
            assert_ne!(glyph(ch), MISSING_GLYPH, "{ch:?}");
        }
    }

    #[test]
    fn status_text_has_glyphs_in_either_case() {
        for ch in "Ready: press M to enable audio, R to record (Base volume 55%)".chars() {
            assert_ne!(glyph(ch), MISSING_GLYPH, "{ch:?}");
        }
        assert_eq!(glyph('q'), glyph('Q'));
    }

    #[test]
    fn font_has_no_duplicate_keys() {
        for (i, (a, _)) in FONT.iter().enumerate() {
            assert!(FONT[i + 1..].iter().all(|(b, _)| b != a), "{a:?}");
        }
    }
}
