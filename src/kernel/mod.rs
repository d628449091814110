// Rover state machine: states, the rover context, and its task

mod error;
mod fleet;
mod handle;
mod handlers;
mod metrics;
mod operation;
mod rover;
mod state;
mod subsystems;

#[cfg(test)]
mod tests;

pub use error::KernelError;
pub use fleet::Fleet;
pub use handle::{spawn, RoverHandle};
pub use handlers::{MAX_RADAR_CONTACTS, MOVE_COST_PER_CELL};
pub use metrics::{KernelMetrics, MetricsSnapshot};
pub use operation::{Operation, OperationKind};
pub use rover::{Dispatch, Rover, RoverStatus, MAX_HANDOFFS, TRANSMITTER_SOURCE};
pub use state::{route, IllegalOperation, State, StateKind};
pub use subsystems::{Battery, Camera, SpacecraftClock, SOL_MILLIS};
