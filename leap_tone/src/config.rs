//! Host configuration, loaded from `leap_tone.toml`.
//!
//! ```toml
//! [engine.selector]
//! hysteresis_px = 25.0
//!
//! [midi]
//! port_hint = "fluid"
//! program   = 73
//!
//! [window]
//! width  = 1024
//! height = 720
//!
//! [log]
//! level = "debug"
//! ```
//!
//! A missing file means "all defaults"; a file that exists but does not
//! parse or validate is an error.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use gesture_tone::EngineConfig;

/// File looked up in the working directory when no path is given.
pub const DEFAULT_PATH: &str = "leap_tone.toml";

// ════════════════════════════════════════════════════════════════════════════
// Sections
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MidiConfig {
    /// Case-insensitive substring of the preferred output port name.
    /// Empty: prefer a known software synth, else the first port.
    pub port_hint: String,
    /// MIDI channel 0–15.
    pub channel: u8,
    /// General MIDI program sent when audio is armed.
    pub program: u8,
    /// Note-on velocity.
    pub velocity: u8,
    /// Pitch-bend range in semitones; glides within it never re-strike.
    pub bend_range: u8,
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self {
            port_hint:  String::new(),
            channel:    0,
            program:    80, // Lead 1 (square)
            velocity:   100,
            bend_range: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width:  usize,
    pub height: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { width: 960, height: 640 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default level when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// AppConfig
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub midi:   MidiConfig,
    pub window: WindowConfig,
    pub log:    LogConfig,
}

impl AppConfig {
    /// Smallest window the layout still fits in.
    pub const MIN_WIDTH:  usize = 480;
    pub const MIN_HEIGHT: usize = 320;

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let cfg: AppConfig = toml::from_str(text).context("malformed config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load `path`, or defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("in {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;
        let m = &self.midi;
        if m.channel > 15 {
            bail!("midi.channel must be 0–15, got {}", m.channel);
        }
        if m.program > 127 || m.velocity > 127 {
            bail!("midi.program and midi.velocity must be 0–127");
        }
        if !(1..=24).contains(&m.bend_range) {
            bail!("midi.bend_range must be 1–24 semitones, got {}", m.bend_range);
        }
        if self.window.width < Self::MIN_WIDTH || self.window.height < Self::MIN_HEIGHT {
            bail!(
                "window must be at least {}x{}, got {}x{}",
                Self::MIN_WIDTH, Self::MIN_HEIGHT, self.window.width, self.window.height
            );
        }
        Ok(())
    }
}

/// Config path from the first CLI argument, falling back to [`DEFAULT_PATH`].
pub fn config_path(arg: Option<String>) -> PathBuf {
    arg.map(PathBuf::from).unwrap_or_else(|| PathBuf::from(DEFAULT_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let cfg = AppConfig::load(Path::new("/definitely/not/here/leap_tone.toml")).unwrap();
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn path_from_argument_or_default() {
        assert_eq!(config_path(None), PathBuf::from(DEFAULT_PATH));
        assert_eq!(config_path(Some("x.toml".into())), PathBuf::from("x.toml"));
    }

    #[test]
    fn rejects_bad_midi_channel() {
        let err = AppConfig::from_toml_str("[midi]\nchannel = 16\n").unwrap_err();
        assert!(err.to_string().contains("channel"));
    }

    #[test]
    fn rejects_tiny_window() {
        assert!(AppConfig::from_toml_str("[window]\nwidth = 100\n").is_err());
    }
}
