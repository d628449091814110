use super::operation::{Operation, OperationKind};
use crate::protocol::Command;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::operation::OperationKind as Op;

/// The rover's operational modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKind {
    Sleeping,
    Hibernating,
    Listening,
    Transmitting,
    Photographing,
    Moving,
    Exploring,
    WeatherSensing,
    RadarScanning,
    Maintenance,
}

impl StateKind {
    pub const ALL: [StateKind; 10] = [
        StateKind::Sleeping,
        StateKind::Hibernating,
        StateKind::Listening,
        StateKind::Transmitting,
        StateKind::Photographing,
        StateKind::Moving,
        StateKind::Exploring,
        StateKind::WeatherSensing,
        StateKind::RadarScanning,
        StateKind::Maintenance,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StateKind::Sleeping => "Sleeping State",
            StateKind::Hibernating => "Hibernating State",
            StateKind::Listening => "Listening State",
            StateKind::Transmitting => "Transmitting State",
            StateKind::Photographing => "Photographing State",
            StateKind::Moving => "Moving State",
            StateKind::Exploring => "Exploring State",
            StateKind::WeatherSensing => "Weather Sensing State",
            StateKind::RadarScanning => "Radar Scanning State",
            StateKind::Maintenance => "Maintenance State",
        }
    }

    /// Operations this mode performs. Everything else is rejected.
    pub fn legal_operations(&self) -> &'static [OperationKind] {
        match self {
            StateKind::Sleeping => &[Op::ReceiveMessage, Op::WakeUp, Op::Hibernate],
            StateKind::Hibernating => &[Op::ReceiveMessage, Op::WakeUp],
            StateKind::Listening => &[
                Op::ReceiveMessage,
                Op::Sleep,
                Op::Hibernate,
                Op::GetSclkInformation,
            ],
            StateKind::Transmitting => &[
                Op::ReceiveMessage,
                Op::TransmitMessage,
                Op::Sleep,
                Op::Hibernate,
                Op::GetSclkInformation,
            ],
            StateKind::Photographing => &[Op::ReceiveMessage, Op::ActivateCameraById],
            StateKind::Moving => &[Op::ReceiveMessage, Op::Move],
            StateKind::Exploring => &[
                Op::ReceiveMessage,
                Op::ExploreArea,
                Op::ScanSurroundings,
                Op::ShootNeutrons,
            ],
            StateKind::WeatherSensing => &[Op::ReceiveMessage, Op::SenseWeather],
            StateKind::RadarScanning => &[Op::ReceiveMessage, Op::PerformRadarScan],
            StateKind::Maintenance => &[
                Op::ReceiveMessage,
                Op::UpdateSoftware,
                Op::SynchronizeClocks,
                Op::RequestLogs,
                Op::GracefulShutdown,
            ],
        }
    }

    pub fn permits(&self, operation: OperationKind) -> bool {
        self.legal_operations().contains(&operation)
    }

    /// Whether a received instruction is acted on, not just queued.
    pub fn routes_commands(&self) -> bool {
        matches!(self, StateKind::Listening | StateKind::Transmitting)
    }
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The mode that carries out a command, and the operation to run there.
pub fn route(command: Command) -> (StateKind, Operation) {
    match command {
        Command::Move(target) => (StateKind::Moving, Operation::Move(target)),
        Command::Camera(request) => (
            StateKind::Photographing,
            Operation::ActivateCameraById(request.camera_id),
        ),
        Command::Weather(query) => (StateKind::WeatherSensing, Operation::SenseWeather(query)),
        Command::SoftwareUpdate(package) => {
            (StateKind::Maintenance, Operation::UpdateSoftware(package))
        }
        Command::ClockSync(sync) => {
            (StateKind::Maintenance, Operation::SynchronizeClocks(sync.utc))
        }
        Command::Shutdown => (StateKind::Maintenance, Operation::GracefulShutdown),
        Command::LogRequest(request) => (StateKind::Maintenance, Operation::RequestLogs(request)),
        Command::Explore => (StateKind::Exploring, Operation::ExploreArea),
        Command::RadarScan => (StateKind::RadarScanning, Operation::PerformRadarScan),
        Command::NeutronScan => (StateKind::Exploring, Operation::ShootNeutrons),
    }
}

/// The active mode instance. A fresh one is built on every transition; only
/// its handled-operation counter changes while it is active.
#[derive(Debug, Clone)]
pub struct State {
    kind: StateKind,
    entered_at: DateTime<Utc>,
    handled: u64,
}

impl State {
    pub(crate) fn enter(kind: StateKind) -> Self {
        Self {
            kind,
            entered_at: Utc::now(),
            handled: 0,
        }
    }

    pub fn kind(&self) -> StateKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn entered_at(&self) -> DateTime<Utc> {
        self.entered_at
    }

    /// Legal operations this instance has carried out.
    pub fn handled(&self) -> u64 {
        self.handled
    }

    pub(crate) fn record_handled(&mut self) {
        self.handled += 1;
    }
}

/// An operation the current mode does not perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IllegalOperation {
    pub operation: OperationKind,
    pub state: StateKind,
}

impl fmt::Display for IllegalOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot {} in {}", self.operation.verb(), self.state.name())
    }
}
