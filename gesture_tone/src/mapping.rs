//! Continuous-to-musical mappings: depth → octave, horizontal position →
//! volume.
//!
//! Both are pure functions of their inputs and may be called at any cadence.
//! [`OctaveMapper`] only adds "report on change" bookkeeping on top.

use tracing::debug;

use crate::config::OctaveConfig;
use crate::scale::{MAX_OCTAVE, MIN_OCTAVE};

// ════════════════════════════════════════════════════════════════════════════
// Octave
// ════════════════════════════════════════════════════════════════════════════

/// Map an averaged depth onto an octave shift in `MIN_OCTAVE..=MAX_OCTAVE`.
///
/// `min_z` maps to -2, `max_z` to +2, the midpoint to 0.  Halves round
/// toward +∞.
pub fn octave_for_depth(depth: f32, cfg: &OctaveConfig) -> i32 {
    let span = cfg.max_z - cfg.min_z;
    if span == 0.0 || !span.is_finite() || !depth.is_finite() {
        return 0;
    }
    let t = ((depth - cfg.min_z) / span).clamp(0.0, 1.0);
    let scaled = t * (MAX_OCTAVE - MIN_OCTAVE) as f32 + MIN_OCTAVE as f32;
    ((scaled + 0.5).floor() as i32).clamp(MIN_OCTAVE, MAX_OCTAVE)
}

/// Remembers the last emitted octave so downstream work only happens on a
/// change.
#[derive(Debug, Clone)]
pub struct OctaveMapper {
    cfg:     OctaveConfig,
    current: i32,
}

impl OctaveMapper {
    pub fn new(cfg: OctaveConfig) -> Self {
        Self { cfg, current: 0 }
    }

    /// Last emitted octave (0 before the first change).
    pub fn current(&self) -> i32 { self.current }

    /// Recompute from `depth`; `Some` only when the value changed.
    pub fn update(&mut self, depth: f32) -> Option<i32> {
        let octave = octave_for_depth(depth, &self.cfg);
        if octave == self.current {
            return None;
        }
        debug!(from = self.current, to = octave, depth, "octave changed");
        self.current = octave;
        Some(octave)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Volume
// ════════════════════════════════════════════════════════════════════════════

/// Lower bound of the positional multiplier (left edge).
pub const MIN_MULTIPLIER: f32 = 0.5;
/// Upper bound of the positional multiplier (right edge).
pub const MAX_MULTIPLIER: f32 = 1.5;

/// Horizontal pointer position → volume multiplier in `[0.5, 1.5]`,
/// linear, 1.0 at the centre.  A zero-width viewport gives 1.0.
pub fn volume_multiplier(x: f32, width: f32) -> f32 {
    let half = width / 2.0;
    if half.is_nan() || half <= 0.0 || x.is_nan() {
        return 1.0;
    }
    let ratio = ((x - half) / half).clamp(-1.0, 1.0);
    1.0 + ratio * 0.5
}

/// `base_percent * multiplier`, clamped to 0–100.
pub fn effective_volume(base_percent: f32, multiplier: f32) -> f32 {
    (base_percent * multiplier).clamp(0.0, 100.0)
}
