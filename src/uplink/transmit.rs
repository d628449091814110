use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Why bytes are leaving the rover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransmitIntent {
    /// An encoded `StatusReport` produced by the kernel.
    StatusReport,
    /// Bytes handed to the Transmitting state for relay.
    Relay,
}

/// One unit of downlink traffic.
#[derive(Debug, Clone)]
pub struct Transmission {
    /// Time-ordered UUIDv7
    pub id: Uuid,
    pub intent: TransmitIntent,
    pub payload: Vec<u8>,
    pub queued_at: DateTime<Utc>,
}

impl Transmission {
    pub fn new(intent: TransmitIntent, payload: Vec<u8>) -> Self {
        Self {
            id: Uuid::now_v7(),
            intent,
            payload,
            queued_at: Utc::now(),
        }
    }
}

/// Transmission boundary. No acknowledgement flows back to the kernel.
pub trait Transmitter: Send + Sync {
    fn transmit(&self, transmission: Transmission) -> Result<()>;
}

/// Hands transmissions to whoever holds the receiving end of a channel.
#[derive(Clone)]
pub struct ChannelTransmitter {
    tx: mpsc::UnboundedSender<Transmission>,
}

impl ChannelTransmitter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Transmission>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Transmitter for ChannelTransmitter {
    fn transmit(&self, transmission: Transmission) -> Result<()> {
        self.tx
            .send(transmission)
            .map_err(|_| anyhow!("Downlink channel closed"))
    }
}
