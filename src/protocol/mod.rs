// Telemetry and command wire protocol

mod instruction;
pub mod sensors;
mod status;
mod wire;


pub use instruction::{
    CameraRequest, ClockSync, Command, InstructionPayload, LogRequest, MoveTarget,
    SoftwarePackage, WeatherMetric, WeatherQuery,
};
pub use status::{Location, Module, StatusReport};
pub use wire::{CodecError, WireReader, WireWriter};
