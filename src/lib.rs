mod availability;
mod curve;
mod engine;
mod error;
mod logger;
mod params;
mod types;

pub use availability::{Availability, TankMode};
pub use curve::{CurveDirection, evaluate};
pub use engine::{TankEngine, TankEngineBuilder};
pub use error::{Error, Result};
pub use logger::CycleLogMode;
pub use params::{Bounds, FieldBounds, normalize};
pub use types::*;
