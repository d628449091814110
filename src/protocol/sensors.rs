// Bodies carried in `StatusReport::module_message`, one per reporting module.

use super::status::Location;
use super::wire::CodecError;
use crate::journal::Severity;
use postcard::{take_from_bytes, to_allocvec};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraFrame {
    pub camera_id: String,
    pub sol: u32,
    pub photo: Vec<u8>,
}

/// Elevation samples (mm) for the 3x3 cells centred on the rover, row major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainSurvey {
    pub center: Location,
    pub elevations_mm: Vec<i32>,
}

/// Distance (cm) to the nearest obstacle on each 45 degree bearing, starting at +x.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstacleRing {
    pub distances_cm: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    pub sol: u32,
    pub temperature_c: Option<f32>,
    pub pressure_pa: Option<f32>,
    pub wind_speed_ms: Option<f32>,
    pub humidity_pct: Option<f32>,
}

/// A radar return expressed relative to the rover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadarContact {
    pub location: Location,
    pub range: f32,
    /// Degrees in `[0, 360)`, measured counter-clockwise from +x.
    pub bearing_deg: f32,
}

impl RadarContact {
    pub fn relative_to(center: Location, contact: Location) -> Self {
        let dx = (i64::from(contact.x) - i64::from(center.x)) as f32;
        let dy = (i64::from(contact.y) - i64::from(center.y)) as f32;
        let bearing = dy.atan2(dx).to_degrees();
        Self {
            location: contact,
            range: dx.hypot(dy),
            bearing_deg: if bearing < 0.0 { bearing + 360.0 } else { bearing },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadarSweep {
    pub contacts: Vec<RadarContact>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeutronCounts {
    pub thermal: u32,
    pub epithermal: u32,
    pub water_equivalent_hydrogen_pct: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SclkInfo {
    pub sol: u32,
    /// Milliseconds since the mission epoch, on the rover clock.
    pub sclk_millis: i64,
    pub utc_millis: i64,
    pub offset_millis: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub at_millis: i64,
    pub source: String,
    pub severity: Severity,
    pub message: String,
    pub cause: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogBundle {
    pub entries: Vec<LogRecord>,
}

pub fn encode_body<T: Serialize>(body: &T) -> Result<Vec<u8>, CodecError> {
    to_allocvec(body).map_err(|e| CodecError::Encode(e.to_string()))
}

pub fn decode_body<T: DeserializeOwned>(message: &'static str, bytes: &[u8]) -> Result<T, CodecError> {
    let (body, rest) = take_from_bytes::<T>(bytes).map_err(|e| CodecError::Envelope {
        message,
        reason: e.to_string(),
    })?;

    if !rest.is_empty() {
        return Err(CodecError::TrailingBytes {
            message,
            remaining: rest.len(),
        });
    }

    Ok(body)
}
