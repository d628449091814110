use super::error::KernelError;
use super::metrics::KernelMetrics;
use super::operation::Operation;
use super::state::{IllegalOperation, State, StateKind};
use super::subsystems::{Battery, Camera, SpacecraftClock};
use crate::config::RoverConfig;
use crate::journal::Journal;
use crate::protocol::{Location, Module, StatusReport};
use crate::queue::InstructionQueue;
use crate::uplink::{Transmission, TransmitIntent, Uplink};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Upper bound on state-to-state handoffs within one dispatch.
pub const MAX_HANDOFFS: usize = 4;

/// Journal source for downlink failures.
pub const TRANSMITTER_SOURCE: &str = "Transmitter";

/// Outcome of a dispatch that did not fault.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    Completed {
        /// State the rover ended up in
        state: StateKind,
        /// Last report transmitted, if any
        report: Option<StatusReport>,
    },
    Rejected(IllegalOperation),
}

/// What a handler asks the dispatch loop to do next.
pub(super) enum Step {
    Done(Option<StatusReport>),
    Handoff { to: StateKind, operation: Operation },
}

/// Read-only view of a rover, for consoles and the fleet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoverStatus {
    pub name: String,
    pub state: StateKind,
    pub state_name: &'static str,
    pub battery_primary: u32,
    pub battery_auxiliary: u32,
    pub camera_lifespan: u32,
    pub location: Location,
    pub sol: u32,
    pub queued_instructions: usize,
    pub software_version: String,
}

/// The rover context. Owns every subsystem; only its current state decides
/// what an operation does.
pub struct Rover {
    pub(super) name: String,
    pub(super) auth_key: String,
    pub(super) archive_path: PathBuf,
    pub(super) state: State,
    pub(super) battery: Battery,
    pub(super) camera: Camera,
    pub(super) queue: InstructionQueue,
    pub(super) clock: SpacecraftClock,
    pub(super) location: Location,
    pub(super) software_version: String,
    pub(super) photo_timeout: Duration,
    pub(super) uplink: Uplink,
    pub(super) journal: Journal,
    pub(super) metrics: KernelMetrics,
    pub(super) rng: StdRng,
}

impl Rover {
    pub fn new(config: &RoverConfig, uplink: Uplink, journal: Journal, metrics: KernelMetrics) -> Self {
        let settings = &config.rover;

        let clock = match config.clock.starting_sol {
            Some(sol) => SpacecraftClock::starting_at_sol(sol, Utc::now()),
            None => SpacecraftClock::new(config.clock.mission_epoch),
        };

        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        metrics.record_entry(settings.initial_state);

        let mut rover = Self {
            name: settings.name.clone(),
            auth_key: config.photo.auth_key.clone(),
            archive_path: settings.archive_path.clone(),
            state: State::enter(settings.initial_state),
            battery: Battery::new(config.power.primary_units, config.power.auxiliary_units),
            camera: Camera::new(config.camera.lifespan),
            queue: InstructionQueue::new(),
            clock,
            location: Location::new(settings.start_x, settings.start_y),
            software_version: settings.software_version.clone(),
            photo_timeout: Duration::from_millis(config.photo.timeout_ms),
            uplink,
            journal,
            metrics,
            rng,
        };

        let started = format!(
            "{} started in {} at {} on sol {}",
            rover.name,
            rover.state.name(),
            rover.location,
            rover.clock.sol()
        );
        rover.write_system_log(&started);
        info!(rover = %rover.name, state = %rover.state.kind(), "Rover initialized");

        rover
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn state_kind(&self) -> StateKind {
        self.state.kind()
    }

    pub fn state_name(&self) -> &'static str {
        self.state.name()
    }

    pub fn battery(&self) -> Battery {
        self.battery
    }

    pub fn camera(&self) -> Camera {
        self.camera
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn sol(&self) -> u32 {
        self.clock.sol()
    }

    pub fn clock(&self) -> &SpacecraftClock {
        &self.clock
    }

    pub fn queue(&self) -> &InstructionQueue {
        &self.queue
    }

    pub fn software_version(&self) -> &str {
        &self.software_version
    }

    pub fn archive_path(&self) -> &PathBuf {
        &self.archive_path
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn metrics(&self) -> &KernelMetrics {
        &self.metrics
    }

    pub fn status(&self) -> RoverStatus {
        RoverStatus {
            name: self.name.clone(),
            state: self.state.kind(),
            state_name: self.state.name(),
            battery_primary: self.battery.primary,
            battery_auxiliary: self.battery.auxiliary,
            camera_lifespan: self.camera.lifespan,
            location: self.location,
            sol: self.clock.sol(),
            queued_instructions: self.queue.len(),
            software_version: self.software_version.clone(),
        }
    }

    /// Forwards an operation to the current state.
    ///
    /// An operation the state does not perform is refused with one error
    /// journal entry and no other effect. Routed instructions are followed
    /// through their handoffs until a state finishes the work.
    pub async fn dispatch(&mut self, operation: Operation) -> Result<Dispatch, KernelError> {
        self.metrics.record_dispatch();

        let current = self.state.kind();
        let kind = operation.kind();

        if !current.permits(kind) {
            let rejection = IllegalOperation {
                operation: kind,
                state: current,
            };
            self.metrics.record_rejection();
            debug!(rover = %self.name, state = %current, operation = ?kind, "Operation rejected");
            self.write_error_log(&rejection.to_string(), None);
            return Ok(Dispatch::Rejected(rejection));
        }

        let entered = self.state.clone();
        let outcome = self.run_handoffs(operation).await;
        if let Err(e) = &outcome {
            self.abort_dispatch(entered, e);
        }
        outcome
    }

    async fn run_handoffs(&mut self, operation: Operation) -> Result<Dispatch, KernelError> {
        let mut operation = operation;
        for _ in 0..MAX_HANDOFFS {
            self.state.record_handled();

            match self.perform(operation).await? {
                Step::Done(report) => {
                    return Ok(Dispatch::Completed {
                        state: self.state.kind(),
                        report,
                    });
                }
                Step::Handoff { to, operation: next } => {
                    if !to.permits(next.kind()) {
                        return Err(KernelError::HandoffRefused {
                            state: to,
                            operation: next.kind(),
                        });
                    }
                    self.set_state(to);
                    operation = next;
                }
            }
        }

        Err(KernelError::HandoffLimit(MAX_HANDOFFS))
    }

    /// Puts back the state a faulted dispatch started in, undoing any handoff
    /// made on the way.
    pub(super) fn abort_dispatch(&mut self, entered: State, err: &KernelError) {
        if self.state.kind() != entered.kind() {
            debug!(rover = %self.name, from = %self.state.kind(), to = %entered.kind(), "Handoff rolled back");
        }
        self.state = entered;
        self.write_error_log("Operation aborted", Some(err.to_string()));
    }

    /// Replaces the current state with a fresh instance of `kind`.
    pub fn set_state(&mut self, kind: StateKind) {
        let from = self.state.kind();
        self.state = State::enter(kind);
        self.metrics.record_transition(kind);

        debug!(rover = %self.name, from = %from, to = %kind, "State transition");
        self.write_system_log(&format!("{} -> {}", from.name(), kind.name()));
    }

    /// Hands bytes to the transmission boundary. A boundary failure is
    /// logged; the caller carries on.
    pub fn transmit_message(&mut self, payload: Vec<u8>, intent: TransmitIntent) {
        let transmission = Transmission::new(intent, payload);
        let id = transmission.id;
        let bytes = transmission.payload.len();

        match self.uplink.transmitter.transmit(transmission) {
            Ok(()) => {
                debug!(rover = %self.name, %id, bytes, intent = ?intent, "Transmission queued");
            }
            Err(e) => {
                self.metrics.record_external_failure();
                self.journal.error(TRANSMITTER_SOURCE, "Transmission failed", Some(e.to_string()));
            }
        }
    }

    /// Journals `message` under the current state's name.
    pub fn write_system_log(&mut self, message: &str) {
        self.journal.info(self.state.name(), message);
    }

    pub fn write_error_log(&mut self, message: &str, cause: Option<String>) {
        self.journal.error(self.state.name(), message, cause);
    }

    /// Report stamped with the rover's current readings.
    pub(super) fn report(&self, module: Module) -> StatusReport {
        StatusReport::new(module, self.battery.primary, self.location, self.clock.sol())
    }

    /// Report carrying primary and auxiliary power combined.
    pub(super) fn full_power_report(&self, module: Module) -> StatusReport {
        StatusReport::new(module, self.battery.total(), self.location, self.clock.sol())
    }

    /// Moves to `next` and transmits the report. An unencodable report aborts
    /// before the transition.
    pub(super) fn finish(&mut self, report: StatusReport, next: StateKind) -> Result<Step, KernelError> {
        let bytes = report.encode()?;
        self.set_state(next);
        self.transmit_message(bytes, TransmitIntent::StatusReport);
        self.metrics.record_report();
        Ok(Step::Done(Some(report)))
    }
}
