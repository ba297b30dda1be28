use serde::Serialize;

use crate::types::TankConfig;

/// Control mode of a tank, derived solely from the outdoor-reset flag.
/// Recomputed from every fresh config; never cached across cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TankMode {
    Flat,
    Curve,
}

impl TankMode {
    pub fn of(cfg: &TankConfig) -> Self {
        if cfg.curve_enabled() { TankMode::Curve } else { TankMode::Flat }
    }
}

/// Which controls are meaningful in the tank's current mode.
///
/// Exactly one of the flat-target control and the min/max endpoint
/// controls is writable at a time. The live target is a display value and
/// stays readable in both modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Availability {
    pub flat_target: bool,
    pub min_temp: bool,
    pub max_temp: bool,
    pub outdoor_reset: bool,
    pub shutdown_threshold: bool,
    pub live_target: bool,
}

impl Availability {
    pub fn for_config(cfg: &TankConfig) -> Self {
        let curve = TankMode::of(cfg) == TankMode::Curve;
        Self {
            flat_target: !curve,
            min_temp: curve,
            max_temp: curve,
            outdoor_reset: curve,
            shutdown_threshold: cfg.shutdown_threshold.is_some(),
            live_target: true,
        }
    }
}
