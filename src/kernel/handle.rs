use super::error::KernelError;
use super::operation::Operation;
use super::rover::{Dispatch, Rover, RoverStatus};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{error, info};

enum Request {
    Dispatch {
        operation: Operation,
        reply: oneshot::Sender<Result<Dispatch, KernelError>>,
    },
    Status {
        reply: oneshot::Sender<RoverStatus>,
    },
}

/// Moves the rover onto its own task. Requests are served one at a time, in
/// arrival order. The task ends, returning the rover, once every handle is
/// dropped.
pub fn spawn(rover: Rover, capacity: usize) -> (RoverHandle, JoinHandle<Rover>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let name = rover.name().to_string();
    let task = tokio::spawn(run(rover, rx));
    (RoverHandle { name, tx }, task)
}

async fn run(mut rover: Rover, mut rx: mpsc::Receiver<Request>) -> Rover {
    info!(rover = %rover.name(), "Rover task started");

    while let Some(request) = rx.recv().await {
        match request {
            Request::Dispatch { operation, reply } => {
                let outcome = rover.dispatch(operation).await;
                if let Err(e) = &outcome {
                    error!(rover = %rover.name(), error = %e, "Dispatch aborted");
                }
                // Caller may have given up waiting.
                let _ = reply.send(outcome);
            }
            Request::Status { reply } => {
                let _ = reply.send(rover.status());
            }
        }
    }

    info!(rover = %rover.name(), "Rover task stopped");
    rover
}

/// Cloneable front door to a spawned rover.
#[derive(Clone)]
pub struct RoverHandle {
    name: String,
    tx: mpsc::Sender<Request>,
}

impl RoverHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn dispatch(&self, operation: Operation) -> Result<Dispatch, KernelError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(Request::Dispatch { operation, reply })
            .await
            .map_err(|_| KernelError::RoverUnavailable)?;
        response.await.map_err(|_| KernelError::RoverUnavailable)?
    }

    pub async fn status(&self) -> Result<RoverStatus, KernelError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(Request::Status { reply })
            .await
            .map_err(|_| KernelError::RoverUnavailable)?;
        response.await.map_err(|_| KernelError::RoverUnavailable)
    }

    /// Convenience for `Operation::ReceiveMessage`.
    pub async fn receive_message(&self, bytes: Vec<u8>) -> Result<Dispatch, KernelError> {
        self.dispatch(Operation::ReceiveMessage(bytes)).await
    }
}
