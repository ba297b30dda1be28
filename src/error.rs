use std::fmt;

use crate::types::Tank;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    MalformedSnapshot {
        tank: Option<Tank>,
        field: &'static str,
    },
    UnitOutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    InvalidRange {
        min: f64,
        max: f64,
    },
    OutOfBounds {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    NotWritableInCurveMode {
        tank: Tank,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MalformedSnapshot { tank, field } => match tank {
                Some(tank) => write!(
                    f,
                    "malformed snapshot: {} tank field {field} missing or unusable",
                    tank.as_str()
                ),
                None => write!(f, "malformed snapshot: field {field} missing or unusable"),
            },
            Error::UnitOutOfRange { field, value, min, max } => {
                write!(f, "{field}: value {value} outside sane range {min}..{max}")
            }
            Error::InvalidRange { min, max } => {
                write!(f, "invalid range: min {min} exceeds max {max}")
            }
            Error::OutOfBounds { field, value, min, max } => {
                write!(f, "{field}: write value {value} outside permitted bounds {min}..{max}")
            }
            Error::NotWritableInCurveMode { tank } => {
                write!(
                    f,
                    "{} tank target is not writable while outdoor reset is enabled; write an endpoint instead",
                    tank.as_str()
                )
            }
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
