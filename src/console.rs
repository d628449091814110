// Line-oriented JSON console for driving a rover by hand

use crate::journal::Severity;
use crate::kernel::{Dispatch, KernelError, MetricsSnapshot, Operation, RoverStatus};
use crate::protocol::{
    Command, InstructionPayload, LogRequest, MoveTarget, SoftwarePackage, StatusReport,
    WeatherMetric, WeatherQuery,
};
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};

/// One console line, e.g. `{"op":"wake_up"}` or
/// `{"op":"receive","command":{"move":{"x":3,"y":4}}}`.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ConsoleRequest {
    Status,
    Metrics,
    /// Encodes the command as an instruction and delivers it as received bytes.
    Receive {
        command: Command,
        #[serde(default)]
        issued_at: Option<i64>,
    },
    Transmit {
        text: String,
    },
    Explore,
    Camera {
        camera_id: String,
    },
    Move {
        x: i32,
        y: i32,
    },
    Hibernate,
    Weather {
        #[serde(default)]
        metrics: Vec<WeatherMetric>,
    },
    Scan,
    Radar,
    Sleep,
    WakeUp,
    Update {
        version: String,
        #[serde(default)]
        image: Vec<u8>,
    },
    Shutdown,
    SyncClock {
        utc: String,
    },
    Logs {
        #[serde(default)]
        min_severity: Option<Severity>,
        #[serde(default)]
        limit: Option<u32>,
    },
    Neutrons,
    Sclk,
}

/// What the console should do with a parsed line.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Dispatch(Operation),
    Status,
    Metrics,
}

impl ConsoleRequest {
    pub fn into_action(self) -> Result<Action> {
        let operation = match self {
            ConsoleRequest::Status => return Ok(Action::Status),
            ConsoleRequest::Metrics => return Ok(Action::Metrics),
            ConsoleRequest::Receive { command, issued_at } => {
                let mut payload = InstructionPayload::new(command);
                if let Some(millis) = issued_at {
                    payload = payload.issued_at(millis);
                }
                let bytes = payload.encode().context("Failed to encode instruction")?;
                Operation::ReceiveMessage(bytes)
            }
            ConsoleRequest::Transmit { text } => Operation::TransmitMessage(text.into_bytes()),
            ConsoleRequest::Explore => Operation::ExploreArea,
            ConsoleRequest::Camera { camera_id } => Operation::ActivateCameraById(camera_id),
            ConsoleRequest::Move { x, y } => Operation::Move(MoveTarget { x, y }),
            ConsoleRequest::Hibernate => Operation::Hibernate,
            ConsoleRequest::Weather { metrics } => Operation::SenseWeather(WeatherQuery { metrics }),
            ConsoleRequest::Scan => Operation::ScanSurroundings,
            ConsoleRequest::Radar => Operation::PerformRadarScan,
            ConsoleRequest::Sleep => Operation::Sleep,
            ConsoleRequest::WakeUp => Operation::WakeUp,
            ConsoleRequest::Update { version, image } => {
                Operation::UpdateSoftware(SoftwarePackage { version, image })
            }
            ConsoleRequest::Shutdown => Operation::GracefulShutdown,
            ConsoleRequest::SyncClock { utc } => Operation::SynchronizeClocks(utc),
            ConsoleRequest::Logs { min_severity, limit } => {
                let defaults = LogRequest::default();
                Operation::RequestLogs(LogRequest {
                    min_severity,
                    limit: limit.unwrap_or(defaults.limit),
                })
            }
            ConsoleRequest::Neutrons => Operation::ShootNeutrons,
            ConsoleRequest::Sclk => Operation::GetSclkInformation,
        };
        Ok(Action::Dispatch(operation))
    }
}

pub fn parse_line(line: &str) -> Result<Action> {
    let request: ConsoleRequest =
        serde_json::from_str(line.trim()).context("Invalid console command")?;
    request.into_action()
}

fn render_report(report: &StatusReport) -> Value {
    json!({
        "module": report.module_reporting.name(),
        "battery_level": report.battery_level,
        "location": report.location,
        "sol": report.sol_number,
        "scet": report.scet,
        "notes": report.notes,
        "payload_bytes": report.module_message.as_ref().map(Vec::len),
    })
}

pub fn render_dispatch(outcome: &Result<Dispatch, KernelError>) -> Value {
    match outcome {
        Ok(Dispatch::Completed { state, report }) => json!({
            "outcome": "completed",
            "state": state,
            "report": report.as_ref().map(render_report),
        }),
        Ok(Dispatch::Rejected(rejection)) => json!({
            "outcome": "rejected",
            "state": rejection.state,
            "error": rejection.to_string(),
        }),
        Err(e) => render_fault(e),
    }
}

pub fn render_fault(err: &KernelError) -> Value {
    json!({ "outcome": "fault", "error": err.to_string() })
}

pub fn render_status(status: &RoverStatus) -> Value {
    json!({ "status": status })
}

pub fn render_metrics(snapshot: &MetricsSnapshot) -> Value {
    json!({ "metrics": snapshot })
}

pub fn render_error(err: &anyhow::Error) -> Value {
    json!({ "outcome": "invalid", "error": format!("{:#}", err) })
}
