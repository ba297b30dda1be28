use std::fmt;

use serde::Serialize;

use crate::availability::Availability;
use crate::curve::CurveDirection;
use crate::params;

/// Temperature stored as Fahrenheit internally (the controller's native
/// unit). Provider precision is whole degrees.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct Temperature(f64);

impl Temperature {
    pub fn from_fahrenheit(f: f64) -> Self {
        Self(f)
    }

    pub fn from_celsius(c: f64) -> Self {
        Self(c * (9.0 / 5.0) + 32.0)
    }

    pub fn fahrenheit(&self) -> f64 {
        self.0
    }

    pub fn celsius(&self) -> f64 {
        (self.0 - 32.0) * (5.0 / 9.0)
    }

    /// Round to controller precision (whole degrees F).
    pub fn to_provider_fahrenheit(&self) -> i32 {
        self.0.round() as i32
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}\u{00b0}F", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tank {
    Hot,
    Cold,
}

impl Tank {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tank::Hot => "hot",
            Tank::Cold => "cold",
        }
    }

    /// A hot tank runs a heating curve, a cold tank the mirrored cooling
    /// curve.
    pub fn direction(&self) -> CurveDirection {
        match self {
            Tank::Hot => CurveDirection::Heating,
            Tank::Cold => CurveDirection::Cooling,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Min,
    Max,
}

/// Canonical per-tank configuration, rebuilt fresh from every snapshot.
///
/// The live target is intentionally absent: it is always derived (curve
/// evaluation or flat target), never stored alongside the endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TankConfig {
    pub tank: Tank,
    pub min_temp: Temperature,
    pub max_temp: Temperature,
    /// Design outdoor temperature; `None` means outdoor reset is off.
    pub outdoor_reset: Option<Temperature>,
    /// Curve near-end outdoor temperature (warm-weather shutdown for the
    /// hot tank, cold-weather shutdown for the cold one). Always present
    /// when the curve is enabled.
    pub shutdown_threshold: Option<Temperature>,
    /// Flat setpoint; present exactly when outdoor reset is off.
    pub flat_target: Option<Temperature>,
}

impl TankConfig {
    pub fn curve_enabled(&self) -> bool {
        self.outdoor_reset.is_some()
    }

    pub fn endpoint(&self, which: Endpoint) -> Temperature {
        match which {
            Endpoint::Min => self.min_temp,
            Endpoint::Max => self.max_temp,
        }
    }
}

/// Endpoint changes to push back to the controller. Produced by the write
/// operations; applying it is the caller's concern.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TankPatch {
    pub tank: Tank,
    pub min_temp: Option<Temperature>,
    pub max_temp: Option<Temperature>,
}

impl TankPatch {
    /// Render the patch as raw API fields, using the same key table the
    /// normalizer reads through. Values are rounded to controller
    /// precision.
    pub fn raw_fields(&self) -> Vec<(&'static str, f64)> {
        let mut fields = Vec::new();
        if let Some(min) = self.min_temp {
            fields.push((
                params::endpoint_key(self.tank, Endpoint::Min),
                f64::from(min.to_provider_fahrenheit()),
            ));
        }
        if let Some(max) = self.max_temp {
            fields.push((
                params::endpoint_key(self.tank, Endpoint::Max),
                f64::from(max.to_provider_fahrenheit()),
            ));
        }
        fields
    }
}

/// Normalized per-tank output for one refresh cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TankState {
    pub config: TankConfig,
    /// Measured tank temperature, when the controller reports one.
    pub current_temp: Option<Temperature>,
    /// Target as reported by the provider. Display passthrough only; the
    /// engine never resolves through it.
    pub reported_target: Option<Temperature>,
    /// Derived target: curve evaluation in curve mode, flat target
    /// otherwise.
    pub live_target: Temperature,
    pub availability: Availability,
}

/// Normalized per-device output for one refresh cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceState {
    pub device_id: String,
    pub device_type: Option<String>,
    pub firmware_version: Option<String>,
    pub outdoor_temp: Option<Temperature>,
    pub permanent_heat_demand: Option<bool>,
    pub permanent_cool_demand: Option<bool>,
    pub hot_tank: Option<TankState>,
    pub cold_tank: Option<TankState>,
}

impl DeviceState {
    pub fn tank(&self, tank: Tank) -> Option<&TankState> {
        match tank {
            Tank::Hot => self.hot_tank.as_ref(),
            Tank::Cold => self.cold_tank.as_ref(),
        }
    }
}
