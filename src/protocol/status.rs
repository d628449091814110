use super::wire::{CodecError, WireReader, WireWriter};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

const TAG_BATTERY_LEVEL: u32 = 1;
const TAG_LOCATION: u32 = 2;
const TAG_SOL_NUMBER: u32 = 3;
const TAG_SCET: u32 = 4;
const TAG_NOTES: u32 = 5;
const TAG_MODULE_REPORTING: u32 = 6;
const TAG_MODULE_MESSAGE: u32 = 7;

const KNOWN_TAGS: [u32; 7] = [
    TAG_BATTERY_LEVEL,
    TAG_LOCATION,
    TAG_SOL_NUMBER,
    TAG_SCET,
    TAG_NOTES,
    TAG_MODULE_REPORTING,
    TAG_MODULE_MESSAGE,
];

const TAG_X: u32 = 1;
const TAG_Y: u32 = 2;

/// Grid position of the rover on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Location {
    pub x: i32,
    pub y: i32,
}

impl Location {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Grid distance travelled when driving to `other`. Saturates at
    /// `u32::MAX` for corner-to-corner drives.
    pub fn manhattan_distance(&self, other: &Location) -> u32 {
        self.x.abs_diff(other.x).saturating_add(self.y.abs_diff(other.y))
    }

    /// The cell `(dx, dy)` away, or `None` when it lies off the grid.
    pub fn offset(&self, dx: i32, dy: i32) -> Option<Location> {
        Some(Location::new(self.x.checked_add(dx)?, self.y.checked_add(dy)?))
    }

    fn encode(&self) -> Result<WireWriter, CodecError> {
        let mut writer = WireWriter::new();
        writer.put(TAG_X, &self.x)?.put(TAG_Y, &self.y)?;
        Ok(writer)
    }

    fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let reader = WireReader::parse("location", bytes)?;
        Ok(Self {
            x: reader.required(TAG_X, "x")?,
            y: reader.required(TAG_Y, "y")?,
        })
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Onboard subsystem that produced a status report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Module {
    Kernel,
    CameraSensor,
    Radar,
    Lidar,
    WeatherSensor,
    Propulsion,
    Spectrometer,
    Sclk,
}

impl Module {
    /// Stable wire code. Never renumber an existing module.
    pub fn code(&self) -> u32 {
        match self {
            Module::Kernel => 0,
            Module::CameraSensor => 1,
            Module::Radar => 2,
            Module::Lidar => 3,
            Module::WeatherSensor => 4,
            Module::Propulsion => 5,
            Module::Spectrometer => 6,
            Module::Sclk => 7,
        }
    }

    pub fn from_code(code: u32) -> Result<Self, CodecError> {
        match code {
            0 => Ok(Module::Kernel),
            1 => Ok(Module::CameraSensor),
            2 => Ok(Module::Radar),
            3 => Ok(Module::Lidar),
            4 => Ok(Module::WeatherSensor),
            5 => Ok(Module::Propulsion),
            6 => Ok(Module::Spectrometer),
            7 => Ok(Module::Sclk),
            other => Err(CodecError::UnknownModule(other)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Module::Kernel => "KERNEL",
            Module::CameraSensor => "CAMERA_SENSOR",
            Module::Radar => "RADAR",
            Module::Lidar => "LIDAR",
            Module::WeatherSensor => "WEATHER_SENSOR",
            Module::Propulsion => "PROPULSION",
            Module::Spectrometer => "SPECTROMETER",
            Module::Sclk => "SCLK",
        }
    }
}

/// Snapshot of rover telemetry at the moment it was generated.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub battery_level: u32,
    pub location: Location,
    pub sol_number: u32,
    /// Spacecraft event time, Unix epoch milliseconds.
    pub scet: i64,
    pub notes: Option<String>,
    pub module_reporting: Module,
    /// Sensor output, e.g. an encoded camera frame.
    pub module_message: Option<Vec<u8>>,
}

impl StatusReport {
    /// Start a report stamped with the current time.
    pub fn new(module: Module, battery_level: u32, location: Location, sol_number: u32) -> Self {
        Self {
            battery_level,
            location,
            sol_number,
            scet: Utc::now().timestamp_millis(),
            notes: None,
            module_reporting: module,
            module_message: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.module_message = Some(payload);
        self
    }

    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let mut writer = WireWriter::new();
        writer
            .put(TAG_BATTERY_LEVEL, &self.battery_level)?
            .put_message(TAG_LOCATION, self.location.encode()?)?
            .put(TAG_SOL_NUMBER, &self.sol_number)?
            .put(TAG_SCET, &self.scet)?
            .put_opt(TAG_NOTES, self.notes.as_ref())?
            .put(TAG_MODULE_REPORTING, &self.module_reporting.code())?;

        if let Some(payload) = &self.module_message {
            writer.put_bytes(TAG_MODULE_MESSAGE, payload);
        }

        writer.finish()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let reader = WireReader::parse("status report", bytes)?;

        let unknown = reader.unknown_tags(&KNOWN_TAGS);
        if !unknown.is_empty() {
            debug!(tags = ?unknown, "Ignoring unknown status report fields");
        }

        let location = match reader.bytes(TAG_LOCATION) {
            Some(bytes) => Location::decode(bytes)?,
            None => {
                return Err(CodecError::MissingField {
                    message: "status report",
                    field: "location",
                })
            }
        };

        let module_code: u32 = reader.required(TAG_MODULE_REPORTING, "module_reporting")?;

        Ok(Self {
            battery_level: reader.required(TAG_BATTERY_LEVEL, "battery_level")?,
            location,
            sol_number: reader.required(TAG_SOL_NUMBER, "sol_number")?,
            scet: reader.required(TAG_SCET, "scet")?,
            notes: reader.optional(TAG_NOTES, "notes")?,
            module_reporting: Module::from_code(module_code)?,
            module_message: reader.bytes(TAG_MODULE_MESSAGE).map(<[u8]>::to_vec),
        })
    }
}
