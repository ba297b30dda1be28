use serde::Serialize;

use crate::types::Temperature;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveDirection {
    Heating,
    Cooling,
}

/// Evaluate the outdoor reset curve: linear between `(shutdown, min)` and
/// `(design, max)`, clamped to `[min, max]` beyond either end.
///
/// For heating the design temperature is the cold extreme (target rises as
/// outdoor falls); for cooling it is the warm extreme (target rises as
/// outdoor rises). When `design == shutdown` the curve degenerates to a
/// step at that single outdoor temperature.
///
/// Pure function; safe to call repeatedly.
pub fn evaluate(
    outdoor: Temperature,
    min: Temperature,
    max: Temperature,
    design: Temperature,
    shutdown: Temperature,
    direction: CurveDirection,
) -> Temperature {
    let o = outdoor.fahrenheit();
    let d = design.fahrenheit();
    let s = shutdown.fahrenheit();

    if d == s {
        let at_full = match direction {
            CurveDirection::Heating => o < d,
            CurveDirection::Cooling => o > d,
        };
        return if at_full { max } else { min };
    }

    let lo = min.fahrenheit();
    let hi = max.fahrenheit();
    let frac = ((s - o) / (s - d)).clamp(0.0, 1.0);
    Temperature::from_fahrenheit(lo + frac * (hi - lo))
}
