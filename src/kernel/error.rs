use super::operation::OperationKind;
use super::state::StateKind;
use crate::protocol::CodecError;
use std::fmt;

/// Faults that abort an operation. A rejected command is not one of these;
/// see `Dispatch::Rejected`.
#[derive(Debug, Clone, PartialEq)]
pub enum KernelError {
    /// A routed handoff landed on a state that does not perform the operation.
    HandoffRefused {
        state: StateKind,
        operation: OperationKind,
    },
    /// Handoffs did not settle within the allowed number of steps.
    HandoffLimit(usize),
    /// The rover's task has stopped.
    RoverUnavailable,
    /// A report could not be serialized.
    Encode(CodecError),
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::HandoffRefused { state, operation } => write!(
                f,
                "Handoff refused: {} does not {}",
                state.name(),
                operation.verb()
            ),
            KernelError::HandoffLimit(steps) => {
                write!(f, "Handoff did not settle after {} steps", steps)
            }
            KernelError::RoverUnavailable => write!(f, "Rover task is no longer running"),
            KernelError::Encode(e) => write!(f, "Failed to encode report: {}", e),
        }
    }
}

impl std::error::Error for KernelError {}

impl From<CodecError> for KernelError {
    fn from(err: CodecError) -> Self {
        KernelError::Encode(err)
    }
}
