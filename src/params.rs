use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::types::{Endpoint, Tank, TankConfig, Temperature};

/// Raw API endpoint keys, pinned per {tank, endpoint}.
///
/// The controller stores each curve endpoint under a "design" name: the
/// design supply temperature is the far end of the curve, which is the
/// hottest supply for the hot tank but the coldest for the cold tank. The
/// assignment therefore mirrors between tanks and must never be inferred
/// from the key text.
const ENDPOINT_KEYS: &[(Tank, Endpoint, &str)] = &[
    (Tank::Hot, Endpoint::Max, "hotTankDesignTemp"),
    (Tank::Hot, Endpoint::Min, "hotTankMinDesignTemp"),
    (Tank::Cold, Endpoint::Min, "coldTankDesignTemp"),
    (Tank::Cold, Endpoint::Max, "coldTankMinDesignTemp"),
];

pub(crate) fn endpoint_key(tank: Tank, endpoint: Endpoint) -> &'static str {
    ENDPOINT_KEYS
        .iter()
        .find(|(t, e, _)| *t == tank && *e == endpoint)
        .map(|(_, _, key)| *key)
        .expect("endpoint key table covers every tank/endpoint pair")
}

pub(crate) fn reset_key(tank: Tank) -> &'static str {
    match tank {
        Tank::Hot => "hotTankOutdoorReset",
        Tank::Cold => "coldTankOutdoorReset",
    }
}

pub(crate) fn shutdown_key(tank: Tank) -> &'static str {
    match tank {
        Tank::Hot => "warmWeatherShutdown",
        Tank::Cold => "coldWeatherShutdown",
    }
}

pub(crate) fn tank_temp_key(tank: Tank) -> &'static str {
    match tank {
        Tank::Hot => "hotTankTemp",
        Tank::Cold => "coldTankTemp",
    }
}

pub(crate) fn reported_target_key(tank: Tank) -> &'static str {
    match tank {
        Tank::Hot => "hotTankTargetTemp",
        Tank::Cold => "coldTankTargetTemp",
    }
}

pub(crate) const OUTDOOR_TEMP_KEY: &str = "outdoorTemp";
pub(crate) const DEVICE_TYPE_KEY: &str = "deviceType";
pub(crate) const FIRMWARE_KEY: &str = "firmwareVer";
pub(crate) const PERM_HEAT_DEMAND_KEY: &str = "permHeatDemand";
pub(crate) const PERM_COOL_DEMAND_KEY: &str = "permCoolDemand";

/// Off sentinel used by reset-curve reference temperatures.
const OFF: &str = "off";

/// Inclusive numeric bounds for one field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldBounds {
    pub min: f64,
    pub max: f64,
}

impl FieldBounds {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Per-field bounds. Used as the sanity check when reading a snapshot and
/// as the permitted range when validating a write. Values are data, not
/// code; override them if the provider's unit or limits change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bounds {
    pub tank_temp: FieldBounds,
    pub outdoor_reset: FieldBounds,
    pub shutdown_threshold: FieldBounds,
    pub outdoor_temp: FieldBounds,
    pub measured_temp: FieldBounds,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            tank_temp: FieldBounds::new(35.0, 200.0),
            outdoor_reset: FieldBounds::new(-40.0, 127.0),
            shutdown_threshold: FieldBounds::new(-40.0, 127.0),
            outdoor_temp: FieldBounds::new(-60.0, 150.0),
            measured_temp: FieldBounds::new(-60.0, 250.0),
        }
    }
}

/// One raw parameter as found in the snapshot. Numeric strings are
/// accepted; the controller API is not consistent about number vs string.
#[derive(Debug, Clone, Copy, PartialEq)]
enum RawField {
    Missing,
    Off,
    Number(f64),
}

fn raw_field(map: &Map<String, Value>, key: &'static str, tank: Option<Tank>) -> Result<RawField> {
    let malformed = || Error::MalformedSnapshot { tank, field: key };
    match map.get(key) {
        None => Ok(RawField::Missing),
        Some(Value::Number(n)) => n.as_f64().map(RawField::Number).ok_or_else(malformed),
        Some(Value::String(s)) => {
            if s == OFF {
                Ok(RawField::Off)
            } else {
                s.parse::<f64>().map(RawField::Number).map_err(|_| malformed())
            }
        }
        Some(_) => Err(malformed()),
    }
}

fn sane(field: &'static str, value: f64, bounds: FieldBounds) -> Result<Temperature> {
    if !value.is_finite() || !bounds.contains(value) {
        return Err(Error::UnitOutOfRange {
            field,
            value,
            min: bounds.min,
            max: bounds.max,
        });
    }
    Ok(Temperature::from_fahrenheit(value))
}

fn require_number(
    raw: RawField,
    field: &'static str,
    tank: Tank,
    bounds: FieldBounds,
) -> Result<Temperature> {
    match raw {
        RawField::Number(v) => sane(field, v, bounds),
        RawField::Missing | RawField::Off => Err(Error::MalformedSnapshot {
            tank: Some(tank),
            field,
        }),
    }
}

pub(crate) fn read_sensor(
    map: &Map<String, Value>,
    key: &'static str,
    bounds: FieldBounds,
    tank: Option<Tank>,
) -> Result<Option<Temperature>> {
    match raw_field(map, key, tank)? {
        RawField::Missing => Ok(None),
        RawField::Number(v) => sane(key, v, bounds).map(Some),
        RawField::Off => Err(Error::MalformedSnapshot { tank, field: key }),
    }
}

pub(crate) fn read_string(map: &Map<String, Value>, key: &'static str) -> Result<Option<String>> {
    match map.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(Error::MalformedSnapshot { tank: None, field: key }),
    }
}

pub(crate) fn read_bool(map: &Map<String, Value>, key: &'static str) -> Result<Option<bool>> {
    match map.get(key) {
        None => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(Error::MalformedSnapshot { tank: None, field: key }),
    }
}

/// Build a fresh `TankConfig` for one tank from a raw snapshot.
///
/// A tank with none of its configuration keys present is simply absent
/// (`Ok(None)`). A tank that shows any sign of being configured must carry
/// both endpoints and its outdoor-reset key; with the curve enabled the
/// shutdown key must be numeric as well. Gaps surface as errors rather
/// than guessed defaults.
pub fn normalize(snapshot: &Value, tank: Tank, bounds: &Bounds) -> Result<Option<TankConfig>> {
    let map = snapshot.as_object().ok_or(Error::MalformedSnapshot {
        tank: None,
        field: "snapshot",
    })?;

    let min_key = endpoint_key(tank, Endpoint::Min);
    let max_key = endpoint_key(tank, Endpoint::Max);
    let rst_key = reset_key(tank);
    let shd_key = shutdown_key(tank);

    let raw_min = raw_field(map, min_key, Some(tank))?;
    let raw_max = raw_field(map, max_key, Some(tank))?;
    let raw_reset = raw_field(map, rst_key, Some(tank))?;
    let raw_shutdown = raw_field(map, shd_key, Some(tank))?;

    let configured = [raw_min, raw_max, raw_reset, raw_shutdown]
        .iter()
        .any(|f| *f != RawField::Missing);
    if !configured {
        return Ok(None);
    }

    let min_temp = require_number(raw_min, min_key, tank, bounds.tank_temp)?;
    let max_temp = require_number(raw_max, max_key, tank, bounds.tank_temp)?;

    let outdoor_reset = match raw_reset {
        RawField::Off => None,
        RawField::Number(v) => Some(sane(rst_key, v, bounds.outdoor_reset)?),
        RawField::Missing => {
            return Err(Error::MalformedSnapshot {
                tank: Some(tank),
                field: rst_key,
            });
        }
    };

    let shutdown_threshold = match (outdoor_reset.is_some(), raw_shutdown) {
        // The curve needs both of its outdoor anchors.
        (true, raw) => Some(require_number(raw, shd_key, tank, bounds.shutdown_threshold)?),
        (false, RawField::Number(v)) => Some(sane(shd_key, v, bounds.shutdown_threshold)?),
        (false, _) => None,
    };

    if min_temp.fahrenheit() > max_temp.fahrenheit() {
        return Err(Error::InvalidRange {
            min: min_temp.fahrenheit(),
            max: max_temp.fahrenheit(),
        });
    }

    // The controller represents a flat setpoint as min == max; the min
    // endpoint is the authoritative read for it.
    let flat_target = match outdoor_reset {
        None => Some(min_temp),
        Some(_) => None,
    };

    Ok(Some(TankConfig {
        tank,
        min_temp,
        max_temp,
        outdoor_reset,
        shutdown_threshold,
        flat_target,
    }))
}
