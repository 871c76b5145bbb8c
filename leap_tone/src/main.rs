//! leap_tone: interactive entry point.
//!
//! Usage: `leap_tone [config.toml]`

use anyhow::Result;
use tracing::info;

use leap_tone::app::run;
use leap_tone::config::{config_path, AppConfig};
use leap_tone::logging;

fn main() -> Result<()> {
    let path = config_path(std::env::args().nth(1));
    let cfg = AppConfig::load(&path)?;
    logging::init(&cfg.log)?;

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║            Leap Tone: Hand-Tracking Theremin                 ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    #[cfg(feature = "leap")]
    println!("  Mode: LeapMotion hardware");
    #[cfg(not(feature = "leap"))]
    println!("  Mode: Mouse simulation  (use --features leap for hardware)");
    println!("  Press M in the window to enable audio.");
    println!();

    info!(config = %path.display(), found = path.exists(), "configuration loaded");

    run(cfg)
}
