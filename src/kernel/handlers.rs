// What each legal operation does once the current state has accepted it.

use super::error::KernelError;
use super::operation::Operation;
use super::rover::{Rover, Step};
use super::state::{route, StateKind};
use crate::protocol::sensors::{
    encode_body, CameraFrame, LogBundle, LogRecord, NeutronCounts, ObstacleRing, RadarContact,
    RadarSweep, SclkInfo, TerrainSurvey, WeatherReading,
};
use crate::protocol::{
    InstructionPayload, Location, LogRequest, Module, MoveTarget, SoftwarePackage, WeatherMetric,
    WeatherQuery,
};
use crate::uplink::animation::{radar_blip_duration, CAMERA_SHUTTER, TERRAIN_SWEEP};
use crate::uplink::{AnimationCue, CueKind, PhotoRequest, TransmitIntent};
use chrono::{DateTime, Utc};
use rand::Rng;
use std::sync::Arc;
use tracing::debug;

/// Extra battery draw per grid cell driven.
pub const MOVE_COST_PER_CELL: u32 = 2;

/// Most radar contacts a single sweep can return.
pub const MAX_RADAR_CONTACTS: usize = 5;

const RADAR_RANGE: i32 = 10;

impl Rover {
    pub(super) async fn perform(&mut self, operation: Operation) -> Result<Step, KernelError> {
        self.battery.draw(operation.kind().power_cost());

        match operation {
            Operation::ReceiveMessage(bytes) => Ok(self.receive_message(bytes)),
            Operation::TransmitMessage(bytes) => Ok(self.relay(bytes)),
            Operation::ExploreArea => self.explore_area(),
            Operation::ActivateCameraById(camera_id) => self.activate_camera_by_id(camera_id).await,
            Operation::Move(target) => self.move_to(target),
            Operation::Hibernate => Ok(self.change_mode(StateKind::Hibernating)),
            Operation::SenseWeather(query) => self.sense_weather(&query),
            Operation::ScanSurroundings => self.scan_surroundings(),
            Operation::PerformRadarScan => self.perform_radar_scan(),
            Operation::Sleep => Ok(self.change_mode(StateKind::Sleeping)),
            Operation::WakeUp => Ok(self.change_mode(StateKind::Listening)),
            Operation::UpdateSoftware(package) => self.update_software(package),
            Operation::GracefulShutdown => self.graceful_shutdown(),
            Operation::SynchronizeClocks(utc) => self.synchronize_clocks(&utc),
            Operation::RequestLogs(request) => self.request_logs(&request),
            Operation::ShootNeutrons => self.shoot_neutrons(),
            Operation::GetSclkInformation => self.get_sclk_information(),
        }
    }

    /// Queues the raw bytes, then decodes them. Idle states act on a decoded
    /// instruction by handing off to the state that carries it out.
    fn receive_message(&mut self, bytes: Vec<u8>) -> Step {
        let decoded = InstructionPayload::decode(&bytes);
        self.queue.enqueue(bytes);

        let payload = match decoded {
            Ok(payload) => payload,
            Err(e) => {
                self.metrics.record_decode_failure();
                self.write_error_log(
                    &format!("Malformed instruction, {} queued", self.queue.len()),
                    Some(e.to_string()),
                );
                return Step::Done(None);
            }
        };

        self.write_system_log(&format!(
            "Received {} instruction, {} queued",
            payload.command.name(),
            self.queue.len()
        ));

        if !self.state.kind().routes_commands() {
            return Step::Done(None);
        }

        let (to, operation) = route(payload.command);
        debug!(rover = %self.name, to = %to, operation = ?operation.kind(), "Routing instruction");
        Step::Handoff { to, operation }
    }

    fn relay(&mut self, bytes: Vec<u8>) -> Step {
        self.transmit_message(bytes, TransmitIntent::Relay);
        self.set_state(StateKind::Listening);
        Step::Done(None)
    }

    fn change_mode(&mut self, to: StateKind) -> Step {
        self.set_state(to);
        Step::Done(None)
    }

    async fn activate_camera_by_id(&mut self, camera_id: String) -> Result<Step, KernelError> {
        if self.camera.is_end_of_life() {
            self.write_error_log(&format!("Camera {} has reached end of life", camera_id), None);
            let report = self
                .full_power_report(Module::CameraSensor)
                .with_notes(format!("Camera {} has reached end of life, no photo taken", camera_id));
            return self.finish(report, StateKind::Transmitting);
        }

        self.uplink
            .animator
            .animate(AnimationCue::new(CueKind::CameraShutter, self.location, CAMERA_SHUTTER));

        let request = PhotoRequest {
            camera_id: camera_id.clone(),
            sol: self.clock.sol(),
            auth_key: self.auth_key.clone(),
        };

        let photo = Arc::clone(&self.uplink.photo);
        let outcome = match tokio::time::timeout(self.photo_timeout, photo.query(&request)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(format!("{:#}", e)),
            Err(_) => Err(format!(
                "Photo query timed out after {} ms",
                self.photo_timeout.as_millis()
            )),
        };

        let report = match outcome {
            Ok(response) => {
                debug!(rover = %self.name, query = %response.query, bytes = response.photo.len(), "Photo received");
                let frame = CameraFrame {
                    camera_id: camera_id.clone(),
                    sol: request.sol,
                    photo: response.photo,
                };
                let payload = encode_body(&frame)?;
                self.camera.consume_shot();
                self.report(Module::CameraSensor)
                    .with_notes(format!("Camera {} shot taken", camera_id))
                    .with_payload(payload)
            }
            Err(cause) => {
                self.metrics.record_external_failure();
                self.write_error_log(
                    &format!("Camera {} was not able to take a shot", camera_id),
                    Some(cause.clone()),
                );
                self.report(Module::CameraSensor)
                    .with_notes(format!("Camera {} was not able to take a shot: {}", camera_id, cause))
            }
        };

        self.finish(report, StateKind::Transmitting)
    }

    fn move_to(&mut self, target: MoveTarget) -> Result<Step, KernelError> {
        let from = self.location;
        let to = Location::new(target.x, target.y);
        let cells = from.manhattan_distance(&to);

        self.battery.draw(cells.saturating_mul(MOVE_COST_PER_CELL));
        self.location = to;

        let report = self
            .report(Module::Propulsion)
            .with_notes(format!("Moved {} cells from {} to {}", cells, from, to));
        self.finish(report, StateKind::Transmitting)
    }

    fn explore_area(&mut self) -> Result<Step, KernelError> {
        self.uplink
            .animator
            .animate(AnimationCue::new(CueKind::TerrainSweep, self.location, TERRAIN_SWEEP));

        let elevations_mm = (0..9).map(|_| self.rng.gen_range(-500..=500)).collect();
        let survey = TerrainSurvey {
            center: self.location,
            elevations_mm,
        };

        let report = self
            .report(Module::Lidar)
            .with_notes(format!("Terrain survey around {}", self.location))
            .with_payload(encode_body(&survey)?);
        self.finish(report, StateKind::Transmitting)
    }

    fn scan_surroundings(&mut self) -> Result<Step, KernelError> {
        let ring = ObstacleRing {
            distances_cm: (0..8).map(|_| self.rng.gen_range(50..=2000)).collect(),
        };

        let report = self
            .report(Module::Lidar)
            .with_notes("Obstacle scan complete")
            .with_payload(encode_body(&ring)?);
        self.finish(report, StateKind::Transmitting)
    }

    fn shoot_neutrons(&mut self) -> Result<Step, KernelError> {
        let thermal: u32 = self.rng.gen_range(200..800);
        let epithermal: u32 = self.rng.gen_range(100..400);
        // Thermal neutrons pile up where hydrogen moderates the epithermal flux.
        let ratio = thermal as f32 / epithermal as f32;
        let counts = NeutronCounts {
            thermal,
            epithermal,
            water_equivalent_hydrogen_pct: (ratio * 1.5).min(100.0),
        };

        let report = self
            .report(Module::Spectrometer)
            .with_notes(format!(
                "Neutron spectroscopy: {:.2}% water-equivalent hydrogen",
                counts.water_equivalent_hydrogen_pct
            ))
            .with_payload(encode_body(&counts)?);
        self.finish(report, StateKind::Transmitting)
    }

    fn sense_weather(&mut self, query: &WeatherQuery) -> Result<Step, KernelError> {
        let mut sample = |metric: WeatherMetric, low: f32, high: f32| {
            query.wants(metric).then(|| self.rng.gen_range(low..=high))
        };

        let temperature_c = sample(WeatherMetric::Temperature, -90.0, 0.0);
        let pressure_pa = sample(WeatherMetric::Pressure, 600.0, 900.0);
        let wind_speed_ms = sample(WeatherMetric::WindSpeed, 0.0, 30.0);
        let humidity_pct = sample(WeatherMetric::Humidity, 0.0, 5.0);

        let reading = WeatherReading {
            sol: self.clock.sol(),
            temperature_c,
            pressure_pa,
            wind_speed_ms,
            humidity_pct,
        };
        let sampled = WeatherMetric::ALL
            .iter()
            .filter(|m| query.wants(**m))
            .count();

        let report = self
            .report(Module::WeatherSensor)
            .with_notes(format!("Weather sampled, {} metrics", sampled))
            .with_payload(encode_body(&reading)?);
        self.finish(report, StateKind::Transmitting)
    }

    fn perform_radar_scan(&mut self) -> Result<Step, KernelError> {
        let center = self.location;
        let count = self.rng.gen_range(0..=MAX_RADAR_CONTACTS);

        let mut contacts = Vec::with_capacity(count);
        while contacts.len() < count {
            let dx = self.rng.gen_range(-RADAR_RANGE..=RADAR_RANGE);
            let dy = self.rng.gen_range(-RADAR_RANGE..=RADAR_RANGE);
            if dx == 0 && dy == 0 {
                continue;
            }
            // Returns beyond the grid edge are resampled.
            if let Some(contact) = center.offset(dx, dy) {
                contacts.push(RadarContact::relative_to(center, contact));
            }
        }
        contacts.sort_by(|a, b| {
            a.bearing_deg
                .total_cmp(&b.bearing_deg)
                .then(a.range.total_cmp(&b.range))
        });

        for contact in &contacts {
            self.uplink.animator.animate(AnimationCue::new(
                CueKind::RadarBlip,
                contact.location,
                radar_blip_duration(),
            ));
        }

        let notes = format!("Radar sweep found {} contacts", contacts.len());
        let sweep = RadarSweep { contacts };
        let report = self
            .report(Module::Radar)
            .with_notes(notes)
            .with_payload(encode_body(&sweep)?);
        self.finish(report, StateKind::Transmitting)
    }

    fn update_software(&mut self, package: SoftwarePackage) -> Result<Step, KernelError> {
        let notes = if package.version.trim().is_empty() || package.image.is_empty() {
            self.write_error_log(
                "Software update refused",
                Some("package has no version or no image".to_string()),
            );
            format!(
                "Software update refused, still running {}",
                self.software_version
            )
        } else {
            let previous = std::mem::replace(&mut self.software_version, package.version);
            let notes = format!(
                "Software updated from {} to {} ({} bytes)",
                previous,
                self.software_version,
                package.image.len()
            );
            self.write_system_log(&notes);
            notes
        };

        let report = self.report(Module::Kernel).with_notes(notes);
        self.finish(report, StateKind::Transmitting)
    }

    fn synchronize_clocks(&mut self, utc: &str) -> Result<Step, KernelError> {
        let notes = match DateTime::parse_from_rfc3339(utc) {
            Ok(time) => {
                self.clock.synchronize(time.with_timezone(&Utc));
                let notes = format!("Clock synchronized to {}, sol {}", utc, self.clock.sol());
                self.write_system_log(&notes);
                notes
            }
            Err(e) => {
                self.write_error_log(
                    &format!("Clock sync rejected timestamp {:?}", utc),
                    Some(e.to_string()),
                );
                format!("Clock sync failed, {:?} is not an RFC 3339 timestamp", utc)
            }
        };

        let report = self
            .report(Module::Sclk)
            .with_notes(notes)
            .with_payload(encode_body(&self.sclk_info())?);
        self.finish(report, StateKind::Transmitting)
    }

    fn request_logs(&mut self, request: &LogRequest) -> Result<Step, KernelError> {
        let entries: Vec<LogRecord> = self
            .journal
            .query(request.min_severity, request.limit as usize)
            .into_iter()
            .map(|entry| LogRecord {
                at_millis: entry.at.timestamp_millis(),
                source: entry.source,
                severity: entry.severity,
                message: entry.message,
                cause: entry.cause,
            })
            .collect();

        let notes = format!("{} log entries", entries.len());
        let bundle = LogBundle { entries };
        let report = self
            .report(Module::Kernel)
            .with_notes(notes)
            .with_payload(encode_body(&bundle)?);
        self.finish(report, StateKind::Transmitting)
    }

    fn graceful_shutdown(&mut self) -> Result<Step, KernelError> {
        self.write_system_log("Graceful shutdown requested");
        let report = self
            .full_power_report(Module::Kernel)
            .with_notes("Shutting down gracefully");
        self.finish(report, StateKind::Hibernating)
    }

    fn get_sclk_information(&mut self) -> Result<Step, KernelError> {
        let report = self
            .report(Module::Sclk)
            .with_notes(format!("SCLK reading for sol {}", self.clock.sol()))
            .with_payload(encode_body(&self.sclk_info())?);
        self.finish(report, StateKind::Transmitting)
    }

    fn sclk_info(&self) -> SclkInfo {
        SclkInfo {
            sol: self.clock.sol(),
            sclk_millis: self.clock.sclk_millis(),
            utc_millis: self.clock.now().timestamp_millis(),
            offset_millis: self.clock.offset().num_milliseconds(),
        }
    }
}
