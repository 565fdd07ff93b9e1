// ── Runtime engine configuration ──
//
// Tuning for the refresh loop and animation. Built by the host from its
// config file and CLI flags; core never reads config files itself.

use std::path::PathBuf;
use std::time::Duration;

/// Slowest and fastest animation multipliers a host should offer.
pub const MIN_ANIMATION_SPEED: f64 = 0.25;
pub const MAX_ANIMATION_SPEED: f64 = 4.0;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Time between data refreshes.
    pub refresh_interval: Duration,
    /// Initial particle speed multiplier.
    pub animation_speed: f64,
    /// Directory holding `<kind>.txt` device icons. `None` draws shapes only.
    pub icon_dir: Option<PathBuf>,
    /// Ask the appliance for hostnames and fingerprints of client IPs.
    pub identity_lookup: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(5),
            animation_speed: 1.0,
            icon_dir: None,
            identity_lookup: true,
        }
    }
}

/// Clamp a multiplier into the supported range; non-finite becomes 1×.
pub fn clamp_speed(speed: f64) -> f64 {
    if speed.is_finite() {
        speed.clamp(MIN_ANIMATION_SPEED, MAX_ANIMATION_SPEED)
    } else {
        1.0
    }
}
