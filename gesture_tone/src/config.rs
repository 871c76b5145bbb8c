//! Engine configuration.
//!
//! Every section is `#[serde(default)]`, so a TOML file only needs to name
//! the values it wants to change:
//!
//! ```toml
//! [selector]
//! hysteresis_px = 30.0
//!
//! [octave]
//! min_z = -0.12
//! max_z = 0.06
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ToneError};
use crate::landmark::{INDEX_FINGER_TIP, LANDMARK_COUNT};

// ════════════════════════════════════════════════════════════════════════════
// Sections
// ════════════════════════════════════════════════════════════════════════════

/// Which landmark drives the pointer and how x is oriented.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointerConfig {
    /// Landmark index used as the pointer (8 = index fingertip).
    pub landmark: usize,
    /// Flip x for selfie-style cameras.
    pub mirror_x: bool,
}

/// Note selector thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Vertical dead-zone around the last committed change point (pixels).
    pub hysteresis_px: f32,
    /// Minimum time between two committed note changes (ms).
    pub min_interval_ms: f64,
}

/// Depth range mapped onto octave shifts -2..=+2.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OctaveConfig {
    /// Depth reading that maps to -2.
    pub min_z: f32,
    /// Depth reading that maps to +2.
    pub max_z: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    /// Volume before the positional multiplier, 0–100.
    pub base_percent: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Delay between the last replayed event and the final release (ms).
    pub tail_delay_ms: f64,
}

impl Default for PointerConfig {
    fn default() -> Self {
        Self { landmark: INDEX_FINGER_TIP, mirror_x: false }
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self { hysteresis_px: 20.0, min_interval_ms: 100.0 }
    }
}

impl Default for OctaveConfig {
    fn default() -> Self {
        Self { min_z: -0.1, max_z: 0.05 }
    }
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self { base_percent: 60.0 }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self { tail_delay_ms: 500.0 }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// EngineConfig
// ════════════════════════════════════════════════════════════════════════════

/// All tunables of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub pointer:  PointerConfig,
    pub selector: SelectorConfig,
    pub octave:   OctaveConfig,
    pub volume:   VolumeConfig,
    pub playback: PlaybackConfig,
}

impl EngineConfig {
    /// Parse from TOML text and validate.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let cfg: EngineConfig = toml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ToneError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Reject values the mapping functions cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.pointer.landmark >= LANDMARK_COUNT {
            return Err(ToneError::Invalid(format!(
                "pointer.landmark must be below {}, got {}",
                LANDMARK_COUNT, self.pointer.landmark
            )));
        }
        if self.selector.hysteresis_px < 0.0 {
            return Err(ToneError::Invalid("selector.hysteresis_px must be >= 0".into()));
        }
        if self.selector.min_interval_ms < 0.0 {
            return Err(ToneError::Invalid("selector.min_interval_ms must be >= 0".into()));
        }
        if self.octave.min_z >= self.octave.max_z {
            return Err(ToneError::Invalid(format!(
                "octave.min_z ({}) must be below octave.max_z ({})",
                self.octave.min_z, self.octave.max_z
            )));
        }
        if !(0.0..=100.0).contains(&self.volume.base_percent) {
            return Err(ToneError::Invalid("volume.base_percent must be within 0–100".into()));
        }
        if self.playback.tail_delay_ms < 0.0 {
            return Err(ToneError::Invalid("playback.tail_delay_ms must be >= 0".into()));
        }
        Ok(())
    }
}
