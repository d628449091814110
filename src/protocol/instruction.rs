use super::wire::{CodecError, WireReader, WireWriter};
use crate::journal::Severity;
use serde::{Deserialize, Serialize};
use tracing::debug;

const TAG_ISSUED_AT: u32 = 1;

// Command tags. Exactly one of these is present in a valid instruction.
const TAG_MOVE: u32 = 10;
const TAG_CAMERA: u32 = 11;
const TAG_WEATHER: u32 = 12;
const TAG_SOFTWARE_UPDATE: u32 = 13;
const TAG_CLOCK_SYNC: u32 = 14;
const TAG_SHUTDOWN: u32 = 15;
const TAG_LOG_REQUEST: u32 = 16;
const TAG_EXPLORE: u32 = 17;
const TAG_RADAR_SCAN: u32 = 18;
const TAG_NEUTRON_SCAN: u32 = 19;

const COMMAND_TAGS: [u32; 10] = [
    TAG_MOVE,
    TAG_CAMERA,
    TAG_WEATHER,
    TAG_SOFTWARE_UPDATE,
    TAG_CLOCK_SYNC,
    TAG_SHUTDOWN,
    TAG_LOG_REQUEST,
    TAG_EXPLORE,
    TAG_RADAR_SCAN,
    TAG_NEUTRON_SCAN,
];

/// Drive target in surface grid coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveTarget {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraRequest {
    pub camera_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherMetric {
    Temperature,
    Pressure,
    WindSpeed,
    Humidity,
}

impl WeatherMetric {
    pub const ALL: [WeatherMetric; 4] = [
        WeatherMetric::Temperature,
        WeatherMetric::Pressure,
        WeatherMetric::WindSpeed,
        WeatherMetric::Humidity,
    ];
}

/// Weather metrics to sample. An empty list asks for every metric.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WeatherQuery {
    #[serde(default)]
    pub metrics: Vec<WeatherMetric>,
}

impl WeatherQuery {
    pub fn wants(&self, metric: WeatherMetric) -> bool {
        self.metrics.is_empty() || self.metrics.contains(&metric)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftwarePackage {
    pub version: String,
    pub image: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockSync {
    /// RFC 3339 UTC timestamp, e.g. `2026-10-16T12:00:00Z`.
    pub utc: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRequest {
    /// Lowest severity to include; `None` returns every entry.
    #[serde(default)]
    pub min_severity: Option<Severity>,
    #[serde(default = "default_log_limit")]
    pub limit: u32,
}

fn default_log_limit() -> u32 {
    50
}

impl Default for LogRequest {
    fn default() -> Self {
        Self {
            min_severity: None,
            limit: default_log_limit(),
        }
    }
}

/// The single command an instruction carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Move(MoveTarget),
    Camera(CameraRequest),
    Weather(WeatherQuery),
    SoftwareUpdate(SoftwarePackage),
    ClockSync(ClockSync),
    Shutdown,
    LogRequest(LogRequest),
    Explore,
    RadarScan,
    NeutronScan,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Move(_) => "move",
            Command::Camera(_) => "camera",
            Command::Weather(_) => "weather",
            Command::SoftwareUpdate(_) => "software update",
            Command::ClockSync(_) => "clock sync",
            Command::Shutdown => "shutdown",
            Command::LogRequest(_) => "log request",
            Command::Explore => "explore",
            Command::RadarScan => "radar scan",
            Command::NeutronScan => "neutron scan",
        }
    }

    fn tag(&self) -> u32 {
        match self {
            Command::Move(_) => TAG_MOVE,
            Command::Camera(_) => TAG_CAMERA,
            Command::Weather(_) => TAG_WEATHER,
            Command::SoftwareUpdate(_) => TAG_SOFTWARE_UPDATE,
            Command::ClockSync(_) => TAG_CLOCK_SYNC,
            Command::Shutdown => TAG_SHUTDOWN,
            Command::LogRequest(_) => TAG_LOG_REQUEST,
            Command::Explore => TAG_EXPLORE,
            Command::RadarScan => TAG_RADAR_SCAN,
            Command::NeutronScan => TAG_NEUTRON_SCAN,
        }
    }
}

/// A decoded uplink command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructionPayload {
    /// Ground time the command was issued, Unix epoch milliseconds.
    #[serde(default)]
    pub issued_at: Option<i64>,
    pub command: Command,
}

impl InstructionPayload {
    pub fn new(command: Command) -> Self {
        Self {
            issued_at: None,
            command,
        }
    }

    pub fn issued_at(mut self, millis: i64) -> Self {
        self.issued_at = Some(millis);
        self
    }

    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let mut writer = WireWriter::new();
        writer.put_opt(TAG_ISSUED_AT, self.issued_at.as_ref())?;

        let tag = self.command.tag();
        match &self.command {
            Command::Move(target) => writer.put(tag, target)?,
            Command::Camera(request) => writer.put(tag, request)?,
            Command::Weather(query) => writer.put(tag, query)?,
            Command::SoftwareUpdate(package) => writer.put(tag, package)?,
            Command::ClockSync(sync) => writer.put(tag, sync)?,
            Command::LogRequest(request) => writer.put(tag, request)?,
            Command::Shutdown | Command::Explore | Command::RadarScan | Command::NeutronScan => {
                writer.put(tag, &())?
            }
        };

        writer.finish()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let reader = WireReader::parse("instruction", bytes)?;

        let mut present = COMMAND_TAGS.iter().copied().filter(|tag| reader.has(*tag));
        let tag = present.next().ok_or(CodecError::NoCommand)?;
        if let Some(second) = present.next() {
            return Err(CodecError::ConflictingCommands { first: tag, second });
        }

        let mut known = COMMAND_TAGS.to_vec();
        known.push(TAG_ISSUED_AT);
        let unknown = reader.unknown_tags(&known);
        if !unknown.is_empty() {
            debug!(tags = ?unknown, "Ignoring unknown instruction fields");
        }

        let command = match tag {
            TAG_MOVE => Command::Move(reader.required(tag, "move")?),
            TAG_CAMERA => Command::Camera(reader.required(tag, "camera")?),
            TAG_WEATHER => Command::Weather(reader.required(tag, "weather")?),
            TAG_SOFTWARE_UPDATE => Command::SoftwareUpdate(reader.required(tag, "software_update")?),
            TAG_CLOCK_SYNC => Command::ClockSync(reader.required(tag, "clock_sync")?),
            TAG_LOG_REQUEST => Command::LogRequest(reader.required(tag, "log_request")?),
            TAG_SHUTDOWN => {
                reader.required::<()>(tag, "shutdown")?;
                Command::Shutdown
            }
            TAG_EXPLORE => {
                reader.required::<()>(tag, "explore")?;
                Command::Explore
            }
            TAG_RADAR_SCAN => {
                reader.required::<()>(tag, "radar_scan")?;
                Command::RadarScan
            }
            _ => {
                reader.required::<()>(tag, "neutron_scan")?;
                Command::NeutronScan
            }
        };

        Ok(Self {
            issued_at: reader.optional(TAG_ISSUED_AT, "issued_at")?,
            command,
        })
    }
}
