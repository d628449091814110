use crate::protocol::{LogRequest, MoveTarget, SoftwarePackage, WeatherQuery};
use serde::Serialize;

/// Every operation a state can be asked to perform, without arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    ReceiveMessage,
    TransmitMessage,
    ExploreArea,
    ActivateCameraById,
    Move,
    Hibernate,
    SenseWeather,
    ScanSurroundings,
    PerformRadarScan,
    Sleep,
    WakeUp,
    UpdateSoftware,
    GracefulShutdown,
    SynchronizeClocks,
    RequestLogs,
    ShootNeutrons,
    GetSclkInformation,
}

impl OperationKind {
    pub const ALL: [OperationKind; 17] = [
        OperationKind::ReceiveMessage,
        OperationKind::TransmitMessage,
        OperationKind::ExploreArea,
        OperationKind::ActivateCameraById,
        OperationKind::Move,
        OperationKind::Hibernate,
        OperationKind::SenseWeather,
        OperationKind::ScanSurroundings,
        OperationKind::PerformRadarScan,
        OperationKind::Sleep,
        OperationKind::WakeUp,
        OperationKind::UpdateSoftware,
        OperationKind::GracefulShutdown,
        OperationKind::SynchronizeClocks,
        OperationKind::RequestLogs,
        OperationKind::ShootNeutrons,
        OperationKind::GetSclkInformation,
    ];

    /// Phrase used in rejection diagnostics: "cannot <verb> in ...".
    pub fn verb(&self) -> &'static str {
        match self {
            OperationKind::ReceiveMessage => "receive messages",
            OperationKind::TransmitMessage => "transmit messages",
            OperationKind::ExploreArea => "explore the area",
            OperationKind::ActivateCameraById => "activate the camera",
            OperationKind::Move => "move",
            OperationKind::Hibernate => "hibernate",
            OperationKind::SenseWeather => "sense weather",
            OperationKind::ScanSurroundings => "scan surroundings",
            OperationKind::PerformRadarScan => "perform a radar scan",
            OperationKind::Sleep => "sleep",
            OperationKind::WakeUp => "wake up",
            OperationKind::UpdateSoftware => "update software",
            OperationKind::GracefulShutdown => "shut down",
            OperationKind::SynchronizeClocks => "synchronize clocks",
            OperationKind::RequestLogs => "request logs",
            OperationKind::ShootNeutrons => "shoot neutrons",
            OperationKind::GetSclkInformation => "get SCLK information",
        }
    }

    /// Fixed battery draw in power units. Driving adds a per-cell cost on top.
    pub fn power_cost(&self) -> u32 {
        match self {
            OperationKind::ReceiveMessage
            | OperationKind::Hibernate
            | OperationKind::Sleep
            | OperationKind::WakeUp
            | OperationKind::GracefulShutdown
            | OperationKind::Move => 0,
            OperationKind::SynchronizeClocks | OperationKind::GetSclkInformation => 1,
            OperationKind::RequestLogs => 2,
            OperationKind::SenseWeather => 4,
            OperationKind::TransmitMessage => 5,
            OperationKind::ScanSurroundings => 6,
            OperationKind::ActivateCameraById => 10,
            OperationKind::PerformRadarScan => 12,
            OperationKind::ExploreArea => 15,
            OperationKind::UpdateSoftware => 20,
            OperationKind::ShootNeutrons => 25,
        }
    }
}

/// An operation together with its arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    ReceiveMessage(Vec<u8>),
    TransmitMessage(Vec<u8>),
    ExploreArea,
    ActivateCameraById(String),
    Move(MoveTarget),
    Hibernate,
    SenseWeather(WeatherQuery),
    ScanSurroundings,
    PerformRadarScan,
    Sleep,
    WakeUp,
    UpdateSoftware(SoftwarePackage),
    GracefulShutdown,
    SynchronizeClocks(String),
    RequestLogs(LogRequest),
    ShootNeutrons,
    GetSclkInformation,
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::ReceiveMessage(_) => OperationKind::ReceiveMessage,
            Operation::TransmitMessage(_) => OperationKind::TransmitMessage,
            Operation::ExploreArea => OperationKind::ExploreArea,
            Operation::ActivateCameraById(_) => OperationKind::ActivateCameraById,
            Operation::Move(_) => OperationKind::Move,
            Operation::Hibernate => OperationKind::Hibernate,
            Operation::SenseWeather(_) => OperationKind::SenseWeather,
            Operation::ScanSurroundings => OperationKind::ScanSurroundings,
            Operation::PerformRadarScan => OperationKind::PerformRadarScan,
            Operation::Sleep => OperationKind::Sleep,
            Operation::WakeUp => OperationKind::WakeUp,
            Operation::UpdateSoftware(_) => OperationKind::UpdateSoftware,
            Operation::GracefulShutdown => OperationKind::GracefulShutdown,
            Operation::SynchronizeClocks(_) => OperationKind::SynchronizeClocks,
            Operation::RequestLogs(_) => OperationKind::RequestLogs,
            Operation::ShootNeutrons => OperationKind::ShootNeutrons,
            Operation::GetSclkInformation => OperationKind::GetSclkInformation,
        }
    }
}
