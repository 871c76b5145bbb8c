//! Vertical position → note index, with hysteresis and a rate limit.
//!
//! The vertical extent is split into [`NOTE_COUNT`] equal zones, zone 0 at
//! the top.  Two independent guards keep the output from buzzing between
//! neighbours:
//!
//! * **Hysteresis**: a change is ignored while the pointer is within
//!   `hysteresis_px` of the y where the last change was committed.
//! * **Rate limit**: at most one committed change per `min_interval_ms`.
//!   A change refused by the rate limit is dropped, not queued; the next
//!   frame re-evaluates from scratch.

use tracing::debug;

use crate::config::SelectorConfig;
use crate::scale::NOTE_COUNT;

/// Zone index for `y` in a viewport of `height` pixels.  `None` for a
/// degenerate viewport or a non-finite `y`.
pub fn zone_for(y: f32, height: f32) -> Option<usize> {
    if !y.is_finite() || height.is_nan() || height <= 0.0 {
        return None;
    }
    let zone_h = height / NOTE_COUNT as f32;
    let raw = (y / zone_h).floor();
    Some(raw.clamp(0.0, (NOTE_COUNT - 1) as f32) as usize)
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Committed {
    index: usize,
    y:     f32,
    at_ms: f64,
}

/// Stateful note selector.  One per live input stream.
#[derive(Debug, Clone)]
pub struct NoteSelector {
    cfg:       SelectorConfig,
    committed: Option<Committed>,
}

impl NoteSelector {
    pub fn new(cfg: SelectorConfig) -> Self {
        Self { cfg, committed: None }
    }

    /// Currently selected index, `None` before the first commit or after a
    /// reset.
    pub fn current(&self) -> Option<usize> { self.committed.map(|c| c.index) }

    /// Y at which the current note was committed.
    pub fn last_change_y(&self) -> Option<f32> { self.committed.map(|c| c.y) }

    /// Forget everything; the next update commits unconditionally.
    pub fn reset(&mut self) {
        if self.committed.take().is_some() {
            debug!("note selector reset");
        }
    }

    /// Feed one pointer y.  Returns the new index when a change is
    /// committed on this call.
    pub fn update(&mut self, y: f32, height: f32, now_ms: f64) -> Option<usize> {
        let raw = zone_for(y, height)?;

        let Some(last) = self.committed else {
            self.committed = Some(Committed { index: raw, y, at_ms: now_ms });
            debug!(index = raw, y, "note selected");
            return Some(raw);
        };

        if raw == last.index {
            return None;
        }
        if (y - last.y).abs() < self.cfg.hysteresis_px {
            return None;
        }
        if now_ms - last.at_ms < self.cfg.min_interval_ms {
            return None;
        }

        self.committed = Some(Committed { index: raw, y, at_ms: now_ms });
        debug!(from = last.index, to = raw, y, "note changed");
        Some(raw)
    }
}

impl Default for NoteSelector {
    fn default() -> Self { Self::new(SelectorConfig::default()) }
}
