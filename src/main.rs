use anyhow::{Context, Result};
use rover::config::{load_config, RoverConfig};
use rover::console::{
    parse_line, render_dispatch, render_error, render_fault, render_metrics, render_status, Action,
};
use rover::journal::{Journal, TracingSink};
use rover::kernel::{self, KernelMetrics, Rover};
use rover::protocol::StatusReport;
use rover::uplink::{
    ChannelTransmitter, DetachedAnimator, HttpPhotoQuery, Transmission, TransmitIntent, Uplink,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rover=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match std::env::var("ROVER_CONFIG") {
        Ok(path) => load_config(&path)?,
        Err(_) => RoverConfig::default(),
    }
    .with_env_overrides();

    info!(
        rover = %config.rover.name,
        initial_state = %config.rover.initial_state,
        photo_archive = %config.photo.base_url,
        "Rover starting..."
    );

    let (transmitter, downlink) = ChannelTransmitter::new();
    let uplink = Uplink {
        photo: Arc::new(HttpPhotoQuery::new(&config.photo)?),
        transmitter: Arc::new(transmitter),
        animator: Arc::new(DetachedAnimator::new(Handle::current())),
    };
    let journal = Journal::new(Arc::new(TracingSink), config.journal.capacity);
    let metrics = KernelMetrics::new();

    let rover = Rover::new(&config, uplink, journal, metrics.clone());
    let (handle, task) = kernel::spawn(rover, config.kernel.mailbox_capacity);

    tokio::spawn(log_downlink(downlink));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines
        .next_line()
        .await
        .context("Failed to read console input")?
    {
        if line.trim().is_empty() {
            continue;
        }

        let rendered = match parse_line(&line) {
            Ok(Action::Dispatch(operation)) => render_dispatch(&handle.dispatch(operation).await),
            Ok(Action::Status) => match handle.status().await {
                Ok(status) => render_status(&status),
                Err(e) => render_fault(&e),
            },
            Ok(Action::Metrics) => render_metrics(&metrics.snapshot()),
            Err(e) => render_error(&e),
        };
        println!("{}", rendered);
    }

    drop(handle);
    let rover = task.await.context("Rover task failed")?;
    info!(rover = %rover.name(), state = %rover.state_kind(), "Console closed");

    Ok(())
}

/// Stands in for the ground station: decodes and logs everything downlinked.
async fn log_downlink(mut downlink: UnboundedReceiver<Transmission>) {
    while let Some(transmission) = downlink.recv().await {
        match transmission.intent {
            TransmitIntent::StatusReport => match StatusReport::decode(&transmission.payload) {
                Ok(report) => info!(
                    id = %transmission.id,
                    module = report.module_reporting.name(),
                    battery = report.battery_level,
                    location = %report.location,
                    sol = report.sol_number,
                    notes = report.notes.as_deref().unwrap_or(""),
                    "Status report downlinked"
                ),
                Err(e) => warn!(id = %transmission.id, error = %e, "Undecodable report on downlink"),
            },
            TransmitIntent::Relay => info!(
                id = %transmission.id,
                bytes = transmission.payload.len(),
                "Message relayed"
            ),
        }
    }
}
