//! # leap_tone
//!
//! A hand-tracking theremin: a LeapMotion controller (or the mouse) drives
//! the [`gesture_tone`] engine, notes go out over MIDI, and a small
//! software-rendered window shows what the engine is doing.
//!
//! ## Hand → sound
//!
//! | Movement | Effect |
//! |---|---|
//! | Fingertip up / down | Pick one of 7 notes (B at the top, C at the bottom) |
//! | Hand toward / away | Octave shift -2 … +2 |
//! | Fingertip left / right | Quieter / louder |
//! | Hand out of view | Note released |
//!
//! ## Feature flags
//!
//! * (default): **Simulation mode**: the mouse over the stage is the
//!   fingertip; scroll wheel or ↑/↓ set depth.
//! * `leap`: **Hardware mode**: polls a real LeapMotion controller via LeapC.
//!   The keyboard commands below still apply.
//!
//! ### Keyboard
//!
//! | Key | Action |
//! |---|---|
//! | `M` | Enable audio (nothing sounds before this) |
//! | `R` | Start / stop recording |
//! | `C` | Clear the recording |
//! | `P` | Play all events (again to stop) |
//! | `O` | Play selected events (again to stop) |
//! | `X` | Stop playback |
//! | `A` / `N` | Select all / none |
//! | `1`–`9` | Toggle selection of event 1–9 |
//! | `+` / `-` | Base volume up / down |
//! | `Q` | Quit |

pub mod config;
pub mod logging;
pub mod source;
pub mod midi_sink;
pub mod visualizer;
pub mod app;
