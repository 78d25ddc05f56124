//! Shared types, error enum, and geometric primitives for vatwatch-core.

use serde::Serialize;
use thiserror::Error;

/// All errors produced by vatwatch-core.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("invalid {what} '{token}' on line {line}")]
    Parse {
        line: usize,
        token: String,
        what: &'static str,
    },
    #[error("live feed decode failed: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("static data is not available yet")]
    NotReady,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config error: {0}")]
    Config(String),
}

impl WatchError {
    pub(crate) fn parse(line: usize, token: &str, what: &'static str) -> Self {
        WatchError::Parse {
            line,
            token: token.to_string(),
            what,
        }
    }
}

pub type Result<T> = std::result::Result<T, WatchError>;

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// A map point in decimal degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Point {
    pub lat: f64,
    pub lng: f64,
}

impl Point {
    pub fn new(lat: f64, lng: f64) -> Self {
        Point { lat, lng }
    }
}

/// FIR boundary polygon with its bounding box and label position.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Boundaries {
    pub is_oceanic: bool,
    pub is_extension: bool,
    pub min: Point,
    pub max: Point,
    pub center: Point,
    pub points: Vec<Point>,
}

// ---------------------------------------------------------------------------
// Callsign helpers
// ---------------------------------------------------------------------------

/// Split a controller callsign into its routing prefix and suffix.
///
/// `EDDF_N_TWR` yields `("EDDF", "TWR")`; a callsign without underscores
/// yields the whole callsign for both.
pub fn split_callsign(callsign: &str) -> (&str, &str) {
    let prefix = callsign.split('_').next().unwrap_or(callsign);
    let suffix = callsign.rsplit('_').next().unwrap_or(callsign);
    (prefix, suffix)
}

/// Suffixes of observer and supervisor logins that never map to a facility.
pub const SILENT_SUFFIXES: &[&str] = &["OBS", "SUP"];

pub fn is_silent_suffix(suffix: &str) -> bool {
    SILENT_SUFFIXES.contains(&suffix)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
