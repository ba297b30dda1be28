use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::availability::Availability;
use crate::curve;
use crate::error::{Error, Result};
use crate::logger::{CycleLogMode, CycleLogger};
use crate::params::{self, Bounds, FieldBounds, normalize};
use crate::types::*;

pub struct TankEngineBuilder {
    bounds: Bounds,
    log_mode: Option<CycleLogMode>,
    log_path: Option<String>,
}

impl TankEngineBuilder {
    pub fn new() -> Self {
        Self {
            bounds: Bounds::default(),
            log_mode: None,
            log_path: None,
        }
    }

    pub fn bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn cycle_log(mut self, mode: CycleLogMode, path: impl Into<String>) -> Self {
        self.log_mode = Some(mode);
        self.log_path = Some(path.into());
        self
    }

    pub fn build(self) -> TankEngine {
        let logger = match (self.log_mode, self.log_path) {
            (Some(mode), Some(path)) => {
                Some(CycleLogger::new(mode, &path).expect("failed to open cycle log"))
            }
            _ => None,
        };

        TankEngine {
            bounds: self.bounds,
            logger,
        }
    }
}

impl Default for TankEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The single authority for "what is the current target" and for what a
/// write request means in the tank's current mode.
///
/// Stateless across cycles: every `resolve` call rebuilds tank state from
/// the snapshot it is given, so distinct devices (and repeated refreshes)
/// never share mutable state.
pub struct TankEngine {
    bounds: Bounds,
    logger: Option<CycleLogger>,
}

impl TankEngine {
    pub fn builder() -> TankEngineBuilder {
        TankEngineBuilder::new()
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Normalize one device snapshot into per-tank state with derived
    /// live targets and availability flags.
    pub fn resolve(&mut self, device_id: &str, snapshot: &Value) -> Result<DeviceState> {
        let map = snapshot.as_object().ok_or(Error::MalformedSnapshot {
            tank: None,
            field: "snapshot",
        })?;

        let outdoor_temp =
            params::read_sensor(map, params::OUTDOOR_TEMP_KEY, self.bounds.outdoor_temp, None)?;

        let hot_tank = self.resolve_tank(map, snapshot, Tank::Hot, outdoor_temp)?;
        let cold_tank = self.resolve_tank(map, snapshot, Tank::Cold, outdoor_temp)?;

        let state = DeviceState {
            device_id: device_id.to_string(),
            device_type: params::read_string(map, params::DEVICE_TYPE_KEY)?,
            firmware_version: params::read_string(map, params::FIRMWARE_KEY)?,
            outdoor_temp,
            permanent_heat_demand: params::read_bool(map, params::PERM_HEAT_DEMAND_KEY)?,
            permanent_cool_demand: params::read_bool(map, params::PERM_COOL_DEMAND_KEY)?,
            hot_tank,
            cold_tank,
        };

        debug!(
            device = device_id,
            hot = state.hot_tank.is_some(),
            cold = state.cold_tank.is_some(),
            "resolved snapshot"
        );

        if let Some(ref mut logger) = self.logger {
            logger.log_cycle(device_id, &state);
        }

        Ok(state)
    }

    fn resolve_tank(
        &self,
        map: &Map<String, Value>,
        snapshot: &Value,
        tank: Tank,
        outdoor_temp: Option<Temperature>,
    ) -> Result<Option<TankState>> {
        let config = match normalize(snapshot, tank, &self.bounds)? {
            Some(cfg) => cfg,
            None => return Ok(None),
        };

        let live_target = self.live_target(&config, outdoor_temp)?;
        trace!(tank = tank.as_str(), target = %live_target, "tank target resolved");

        let current_temp = params::read_sensor(
            map,
            params::tank_temp_key(tank),
            self.bounds.measured_temp,
            Some(tank),
        )?;
        let reported_target = params::read_sensor(
            map,
            params::reported_target_key(tank),
            self.bounds.tank_temp,
            Some(tank),
        )?;

        let availability = Availability::for_config(&config);

        Ok(Some(TankState {
            config,
            current_temp,
            reported_target,
            live_target,
            availability,
        }))
    }

    /// Derive the current target for a tank. Never read from a stored
    /// field: curve mode evaluates the curve, flat mode returns the flat
    /// setpoint.
    pub fn live_target(
        &self,
        cfg: &TankConfig,
        outdoor_temp: Option<Temperature>,
    ) -> Result<Temperature> {
        match (cfg.outdoor_reset, cfg.shutdown_threshold) {
            (Some(design), Some(shutdown)) => {
                let outdoor = outdoor_temp.ok_or(Error::MalformedSnapshot {
                    tank: Some(cfg.tank),
                    field: params::OUTDOOR_TEMP_KEY,
                })?;
                Ok(curve::evaluate(
                    outdoor,
                    cfg.min_temp,
                    cfg.max_temp,
                    design,
                    shutdown,
                    cfg.tank.direction(),
                ))
            }
            (Some(_), None) => Err(Error::MalformedSnapshot {
                tank: Some(cfg.tank),
                field: params::shutdown_key(cfg.tank),
            }),
            // Flat setpoint is stored as the collapsed min endpoint.
            (None, _) => Ok(cfg.flat_target.unwrap_or(cfg.min_temp)),
        }
    }

    /// Flat-mode write: set the target by collapsing both endpoints to the
    /// requested value. Rejected outright in curve mode so a "set target"
    /// can never silently relocate a curve endpoint.
    pub fn write_target(&mut self, cfg: &TankConfig, value: Temperature) -> Result<TankPatch> {
        if cfg.curve_enabled() {
            return Err(self.reject("write_target", cfg.tank, Error::NotWritableInCurveMode {
                tank: cfg.tank,
            }));
        }

        let field = params::reported_target_key(cfg.tank);
        if let Err(err) = check_write(field, value, self.bounds.tank_temp) {
            return Err(self.reject("write_target", cfg.tank, err));
        }

        let patch = TankPatch {
            tank: cfg.tank,
            min_temp: Some(value),
            max_temp: Some(value),
        };
        if let Some(ref mut logger) = self.logger {
            logger.log_write("write_target", cfg.tank, &patch.raw_fields());
        }
        Ok(patch)
    }

    /// Curve-mode (and always-available) write of one endpoint. Validates
    /// bounds and the min <= max invariant against the untouched other
    /// endpoint before producing a patch.
    pub fn write_endpoint(
        &mut self,
        cfg: &TankConfig,
        which: Endpoint,
        value: Temperature,
    ) -> Result<TankPatch> {
        let field = params::endpoint_key(cfg.tank, which);
        if let Err(err) = check_write(field, value, self.bounds.tank_temp) {
            return Err(self.reject("write_endpoint", cfg.tank, err));
        }

        let (min, max) = match which {
            Endpoint::Min => (value, cfg.max_temp),
            Endpoint::Max => (cfg.min_temp, value),
        };
        if min.fahrenheit() > max.fahrenheit() {
            return Err(self.reject("write_endpoint", cfg.tank, Error::InvalidRange {
                min: min.fahrenheit(),
                max: max.fahrenheit(),
            }));
        }

        let patch = TankPatch {
            tank: cfg.tank,
            min_temp: (which == Endpoint::Min).then_some(value),
            max_temp: (which == Endpoint::Max).then_some(value),
        };
        if let Some(ref mut logger) = self.logger {
            logger.log_write("write_endpoint", cfg.tank, &patch.raw_fields());
        }
        Ok(patch)
    }

    fn reject(&mut self, action: &str, tank: Tank, err: Error) -> Error {
        debug!(action, tank = tank.as_str(), %err, "write rejected");
        if let Some(ref mut logger) = self.logger {
            logger.log_reject(action, Some(tank), &err);
        }
        err
    }
}

fn check_write(field: &'static str, value: Temperature, bounds: FieldBounds) -> Result<()> {
    let v = value.fahrenheit();
    if !v.is_finite() || !bounds.contains(v) {
        return Err(Error::OutOfBounds {
            field,
            value: v,
            min: bounds.min,
            max: bounds.max,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> TankEngine {
        TankEngine::builder().build()
    }

    fn flat_config(target: f64) -> TankConfig {
        TankConfig {
            tank: Tank::Hot,
            min_temp: Temperature::from_fahrenheit(target),
            max_temp: Temperature::from_fahrenheit(target),
            outdoor_reset: None,
            shutdown_threshold: None,
            flat_target: Some(Temperature::from_fahrenheit(target)),
        }
    }

    fn curve_config() -> TankConfig {
        TankConfig {
            tank: Tank::Hot,
            min_temp: Temperature::from_fahrenheit(100.0),
            max_temp: Temperature::from_fahrenheit(130.0),
            outdoor_reset: Some(Temperature::from_fahrenheit(-10.0)),
            shutdown_threshold: Some(Temperature::from_fahrenheit(60.0)),
            flat_target: None,
        }
    }

    #[test]
    fn write_target_collapses_endpoints() {
        let patch = engine()
            .write_target(&flat_config(120.0), Temperature::from_fahrenheit(125.0))
            .unwrap();
        assert_eq!(patch.min_temp.unwrap().fahrenheit(), 125.0);
        assert_eq!(patch.max_temp.unwrap().fahrenheit(), 125.0);
    }

    #[test]
    fn write_target_rejected_in_curve_mode() {
        let cfg = curve_config();
        let err = engine()
            .write_target(&cfg, Temperature::from_fahrenheit(125.0))
            .unwrap_err();
        assert_eq!(err, Error::NotWritableInCurveMode { tank: Tank::Hot });
        // Rejection leaves the config untouched.
        assert_eq!(cfg, curve_config());
    }

    #[test]
    fn write_endpoint_checks_range_against_other_end() {
        let cfg = curve_config();
        let err = engine()
            .write_endpoint(&cfg, Endpoint::Min, Temperature::from_fahrenheit(140.0))
            .unwrap_err();
        assert_eq!(err, Error::InvalidRange { min: 140.0, max: 130.0 });

        let patch = engine()
            .write_endpoint(&cfg, Endpoint::Min, Temperature::from_fahrenheit(95.0))
            .unwrap();
        assert_eq!(patch.min_temp.unwrap().fahrenheit(), 95.0);
        assert!(patch.max_temp.is_none());
    }

    #[test]
    fn write_endpoint_enforces_configured_bounds() {
        let cfg = curve_config();
        let err = engine()
            .write_endpoint(&cfg, Endpoint::Max, Temperature::from_fahrenheit(250.0))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::OutOfBounds { field: "hotTankDesignTemp", value, .. } if value == 250.0
        ));
    }

    #[test]
    fn patch_renders_raw_fields_through_key_table() {
        let patch = engine()
            .write_target(&flat_config(120.0), Temperature::from_fahrenheit(125.0))
            .unwrap();
        let mut fields = patch.raw_fields();
        fields.sort_by_key(|(key, _)| *key);
        assert_eq!(
            fields,
            vec![("hotTankDesignTemp", 125.0), ("hotTankMinDesignTemp", 125.0)]
        );
    }

    #[test]
    fn live_target_flat_mode_reads_flat_setpoint() {
        let target = engine().live_target(&flat_config(120.0), None).unwrap();
        assert_eq!(target.fahrenheit(), 120.0);
    }

    #[test]
    fn live_target_curve_mode_requires_outdoor_reading() {
        let cfg = curve_config();
        let err = engine().live_target(&cfg, None).unwrap_err();
        assert_eq!(
            err,
            Error::MalformedSnapshot {
                tank: Some(Tank::Hot),
                field: "outdoorTemp"
            }
        );

        let target = engine()
            .live_target(&cfg, Some(Temperature::from_fahrenheit(25.0)))
            .unwrap();
        assert_eq!(target.fahrenheit(), 115.0);
    }
}
