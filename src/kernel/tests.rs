use super::*;
use crate::config::RoverConfig;
use crate::journal::{Journal, MemorySink, Severity};
use crate::protocol::sensors::{
    decode_body, CameraFrame, LogBundle, ObstacleRing, RadarSweep, SclkInfo, TerrainSurvey,
    WeatherReading,
};
use crate::protocol::{
    CameraRequest, Command, InstructionPayload, Location, LogRequest, Module,
    MoveTarget, SoftwarePackage, StatusReport, WeatherMetric, WeatherQuery,
};
use crate::uplink::animation::radar_blip_duration;
use crate::uplink::{
    AnimationCue, Animator, ChannelTransmitter, CueKind, PhotoQuery, PhotoRequest, PhotoResponse,
    Transmission, TransmitIntent, Uplink,
};
use anyhow::{anyhow, bail};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

enum PhotoBehaviour {
    Succeed(Vec<u8>),
    Fail(&'static str),
    Hang,
}

struct FakePhotoQuery {
    behaviour: PhotoBehaviour,
    calls: AtomicUsize,
    last_request: Mutex<Option<PhotoRequest>>,
}

impl FakePhotoQuery {
    fn new(behaviour: PhotoBehaviour) -> Self {
        Self {
            behaviour,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PhotoQuery for FakePhotoQuery {
    async fn query(&self, request: &PhotoRequest) -> anyhow::Result<PhotoResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());

        match &self.behaviour {
            PhotoBehaviour::Succeed(photo) => Ok(PhotoResponse {
                photo: photo.clone(),
                query: format!("camera={}&sol={}", request.camera_id, request.sol),
                response: "200 OK".to_string(),
            }),
            PhotoBehaviour::Fail(reason) => Err(anyhow!(*reason)),
            PhotoBehaviour::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                bail!("never answered")
            }
        }
    }
}

#[derive(Default)]
struct RecordingAnimator {
    cues: Mutex<Vec<AnimationCue>>,
}

impl RecordingAnimator {
    fn cues(&self) -> Vec<AnimationCue> {
        self.cues.lock().unwrap().clone()
    }
}

impl Animator for RecordingAnimator {
    fn animate(&self, cue: AnimationCue) {
        self.cues.lock().unwrap().push(cue);
    }
}

struct Fixture {
    rover: Rover,
    sink: MemorySink,
    downlink: UnboundedReceiver<Transmission>,
    photo: Arc<FakePhotoQuery>,
    animator: Arc<RecordingAnimator>,
    metrics: KernelMetrics,
}

impl Fixture {
    fn transmissions(&mut self) -> Vec<Transmission> {
        let mut sent = Vec::new();
        while let Ok(t) = self.downlink.try_recv() {
            sent.push(t);
        }
        sent
    }
}

fn test_config(initial: StateKind) -> RoverConfig {
    let mut config = RoverConfig::default();
    config.rover.initial_state = initial;
    config.rover.seed = Some(7);
    config.clock.starting_sol = Some(100);
    config.photo.timeout_ms = 50;
    config
}

fn fixture_with(config: RoverConfig, behaviour: PhotoBehaviour) -> Fixture {
    let sink = MemorySink::new();
    let (transmitter, downlink) = ChannelTransmitter::new();
    let photo = Arc::new(FakePhotoQuery::new(behaviour));
    let animator = Arc::new(RecordingAnimator::default());
    let metrics = KernelMetrics::new();

    let uplink = Uplink {
        photo: photo.clone(),
        transmitter: Arc::new(transmitter),
        animator: animator.clone(),
    };
    let journal = Journal::new(Arc::new(sink.clone()), 64);
    let rover = Rover::new(&config, uplink, journal, metrics.clone());
    sink.clear();

    Fixture {
        rover,
        sink,
        downlink,
        photo,
        animator,
        metrics,
    }
}

fn fixture(initial: StateKind) -> Fixture {
    fixture_with(test_config(initial), PhotoBehaviour::Succeed(vec![0xCA, 0xFE]))
}

fn sample_operation(kind: OperationKind) -> Operation {
    match kind {
        OperationKind::ReceiveMessage => Operation::ReceiveMessage(vec![1]),
        OperationKind::TransmitMessage => Operation::TransmitMessage(vec![1]),
        OperationKind::ExploreArea => Operation::ExploreArea,
        OperationKind::ActivateCameraById => Operation::ActivateCameraById("FHAZ".to_string()),
        OperationKind::Move => Operation::Move(MoveTarget { x: 5, y: 5 }),
        OperationKind::Hibernate => Operation::Hibernate,
        OperationKind::SenseWeather => Operation::SenseWeather(WeatherQuery::default()),
        OperationKind::ScanSurroundings => Operation::ScanSurroundings,
        OperationKind::PerformRadarScan => Operation::PerformRadarScan,
        OperationKind::Sleep => Operation::Sleep,
        OperationKind::WakeUp => Operation::WakeUp,
        OperationKind::UpdateSoftware => Operation::UpdateSoftware(SoftwarePackage {
            version: "9.9.9".to_string(),
            image: vec![1, 2, 3],
        }),
        OperationKind::GracefulShutdown => Operation::GracefulShutdown,
        OperationKind::SynchronizeClocks => {
            Operation::SynchronizeClocks("2030-01-01T00:00:00Z".to_string())
        }
        OperationKind::RequestLogs => Operation::RequestLogs(LogRequest::default()),
        OperationKind::ShootNeutrons => Operation::ShootNeutrons,
        OperationKind::GetSclkInformation => Operation::GetSclkInformation,
    }
}

fn instruction(command: Command) -> Vec<u8> {
    InstructionPayload::new(command).encode().unwrap()
}

fn completed(dispatch: Dispatch) -> (StateKind, Option<StatusReport>) {
    match dispatch {
        Dispatch::Completed { state, report } => (state, report),
        Dispatch::Rejected(rejection) => panic!("unexpected rejection: {}", rejection),
    }
}

#[tokio::test]
async fn test_illegal_operations_leave_rover_untouched() {
    for state in StateKind::ALL {
        for kind in OperationKind::ALL {
            if state.permits(kind) {
                continue;
            }

            let mut f = fixture(state);
            let before = f.rover.status();
            let entered_at = f.rover.state().entered_at();

            let outcome = f.rover.dispatch(sample_operation(kind)).await.unwrap();

            assert_eq!(
                outcome,
                Dispatch::Rejected(IllegalOperation {
                    operation: kind,
                    state
                })
            );
            assert_eq!(f.rover.status(), before, "{} / {:?}", state, kind);
            assert_eq!(f.rover.state().entered_at(), entered_at);
            assert_eq!(f.rover.state().handled(), 0);
            assert!(f.transmissions().is_empty());
            assert!(f.animator.cues().is_empty());
            assert_eq!(f.photo.calls(), 0);

            let logged = f.sink.entries();
            assert_eq!(logged.len(), 1, "{} / {:?}", state, kind);
            assert_eq!(logged[0].severity, Severity::Error);
            assert_eq!(
                logged[0].message,
                format!("cannot {} in {}", kind.verb(), state.name())
            );
        }
    }
}

#[tokio::test]
async fn test_photographing_rejects_software_update() {
    let mut f = fixture(StateKind::Photographing);

    let outcome = f
        .rover
        .dispatch(sample_operation(OperationKind::UpdateSoftware))
        .await
        .unwrap();

    assert!(matches!(outcome, Dispatch::Rejected(_)));
    assert_eq!(f.rover.software_version(), "1.0.0");
    assert_eq!(f.sink.errors()[0].message, "cannot update software in Photographing State");
    assert_eq!(f.metrics.rejected(), 1);
}

#[tokio::test]
async fn test_camera_success_transmits_frame() {
    let mut f = fixture(StateKind::Photographing);
    let primary = f.rover.battery().primary;

    let outcome = f
        .rover
        .dispatch(Operation::ActivateCameraById("FHAZ".to_string()))
        .await
        .unwrap();
    let (state, report) = completed(outcome);
    let report = report.unwrap();

    assert_eq!(state, StateKind::Transmitting);
    assert_eq!(f.rover.state_kind(), StateKind::Transmitting);
    assert_eq!(f.rover.camera().lifespan, 99);
    assert_eq!(report.module_reporting, Module::CameraSensor);
    assert_eq!(report.sol_number, 100);
    assert_eq!(
        report.battery_level,
        primary - OperationKind::ActivateCameraById.power_cost()
    );

    let frame: CameraFrame =
        decode_body("CameraFrame", report.module_message.as_deref().unwrap()).unwrap();
    assert_eq!(frame.camera_id, "FHAZ");
    assert_eq!(frame.sol, 100);
    assert_eq!(frame.photo, vec![0xCA, 0xFE]);

    let request = f.photo.last_request.lock().unwrap().clone().unwrap();
    assert_eq!(request.camera_id, "FHAZ");
    assert_eq!(request.sol, 100);
    assert_eq!(request.auth_key, "DEMO_KEY");

    let sent = f.transmissions();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].intent, TransmitIntent::StatusReport);
    assert_eq!(StatusReport::decode(&sent[0].payload).unwrap(), report);

    let cues = f.animator.cues();
    assert_eq!(cues.len(), 1);
    assert_eq!(cues[0].kind, CueKind::CameraShutter);
}

#[tokio::test]
async fn test_camera_failure_still_reports() {
    let mut f = fixture_with(
        test_config(StateKind::Photographing),
        PhotoBehaviour::Fail("archive unreachable"),
    );

    let outcome = f
        .rover
        .dispatch(Operation::ActivateCameraById("NAVCAM".to_string()))
        .await
        .unwrap();
    let (state, report) = completed(outcome);
    let report = report.unwrap();

    assert_eq!(state, StateKind::Transmitting);
    assert_eq!(f.rover.camera().lifespan, 100);
    assert!(report.module_message.is_none());
    assert!(report.notes.unwrap().contains("archive unreachable"));
    assert_eq!(f.transmissions().len(), 1);

    let errors = f.sink.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].cause.as_deref(), Some("archive unreachable"));
    assert_eq!(f.metrics.snapshot().external_failures, 1);
}

#[tokio::test]
async fn test_camera_timeout_is_a_failure() {
    let mut f = fixture_with(test_config(StateKind::Photographing), PhotoBehaviour::Hang);

    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        f.rover.dispatch(Operation::ActivateCameraById("MAST".to_string())),
    )
    .await
    .expect("dispatch must not wait on a hung photo query")
    .unwrap();
    let (state, report) = completed(outcome);
    let report = report.unwrap();

    assert_eq!(state, StateKind::Transmitting);
    assert!(report.module_message.is_none());
    assert!(report.notes.unwrap().contains("timed out"));
    assert_eq!(f.rover.camera().lifespan, 100);
    assert_eq!(f.transmissions().len(), 1);
}

#[tokio::test]
async fn test_worn_out_camera_never_queries() {
    let mut config = test_config(StateKind::Photographing);
    config.camera.lifespan = 0;
    let mut f = fixture_with(config, PhotoBehaviour::Succeed(vec![1]));

    let outcome = f
        .rover
        .dispatch(Operation::ActivateCameraById("FHAZ".to_string()))
        .await
        .unwrap();
    let (state, report) = completed(outcome);
    let report = report.unwrap();

    assert_eq!(state, StateKind::Transmitting);
    assert_eq!(f.photo.calls(), 0);
    assert!(f.animator.cues().is_empty());
    assert_eq!(report.battery_level, f.rover.battery().total());
    assert!(report.notes.unwrap().contains("end of life"));
    assert!(report.module_message.is_none());
    assert_eq!(f.transmissions().len(), 1);
}

#[tokio::test]
async fn test_malformed_message_is_queued_and_logged_once() {
    let mut f = fixture(StateKind::Listening);

    let outcome = f
        .rover
        .dispatch(Operation::ReceiveMessage(vec![0xFF, 0xFF, 0xFF]))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        Dispatch::Completed {
            state: StateKind::Listening,
            report: None
        }
    );
    assert_eq!(f.rover.queue().len(), 1);
    assert_eq!(f.rover.queue().peek(), Some(&[0xFF, 0xFF, 0xFF][..]));
    assert_eq!(f.sink.errors().len(), 1);
    assert!(f.transmissions().is_empty());
    assert_eq!(f.metrics.snapshot().decode_failures, 1);
}

#[tokio::test]
async fn test_sleeping_rover_queues_then_wakes_to_listening() {
    let mut f = fixture(StateKind::Sleeping);
    let camera = instruction(Command::Camera(CameraRequest {
        camera_id: "FHAZ".to_string(),
    }));

    let outcome = f.rover.dispatch(Operation::ReceiveMessage(camera)).await.unwrap();
    assert_eq!(
        outcome,
        Dispatch::Completed {
            state: StateKind::Sleeping,
            report: None
        }
    );
    assert_eq!(f.rover.queue().len(), 1);
    assert!(f.transmissions().is_empty());
    assert_eq!(f.photo.calls(), 0);

    f.rover.dispatch(Operation::WakeUp).await.unwrap();
    assert_eq!(f.rover.state_name(), "Listening State");

    f.sink.clear();
    let outcome = f
        .rover
        .dispatch(Operation::ActivateCameraById("FHAZ".to_string()))
        .await
        .unwrap();
    assert!(matches!(outcome, Dispatch::Rejected(_)));
    assert_eq!(f.sink.errors()[0].message, "cannot activate the camera in Listening State");
    assert_eq!(f.photo.calls(), 0);
}

#[tokio::test]
async fn test_listening_routes_move_instruction() {
    let mut f = fixture(StateKind::Listening);
    let bytes = instruction(Command::Move(MoveTarget { x: 3, y: 4 }));

    let outcome = f.rover.dispatch(Operation::ReceiveMessage(bytes)).await.unwrap();
    let (state, report) = completed(outcome);
    let report = report.unwrap();

    assert_eq!(state, StateKind::Transmitting);
    assert_eq!(f.rover.location(), Location::new(3, 4));
    assert_eq!(report.module_reporting, Module::Propulsion);
    assert_eq!(report.location, Location::new(3, 4));
    assert_eq!(f.rover.battery().primary, 1000 - 7 * MOVE_COST_PER_CELL);
    assert_eq!(f.rover.queue().len(), 1);
    assert_eq!(f.metrics.entries_of(StateKind::Moving), 1);
    assert_eq!(f.transmissions().len(), 1);
}

#[tokio::test]
async fn test_transmitting_routes_camera_instruction() {
    let mut f = fixture(StateKind::Transmitting);
    let bytes = instruction(Command::Camera(CameraRequest {
        camera_id: "CHEMCAM".to_string(),
    }));

    let outcome = f.rover.dispatch(Operation::ReceiveMessage(bytes)).await.unwrap();
    let (state, report) = completed(outcome);

    assert_eq!(state, StateKind::Transmitting);
    assert_eq!(report.unwrap().module_reporting, Module::CameraSensor);
    assert_eq!(f.photo.calls(), 1);
    assert_eq!(f.metrics.entries_of(StateKind::Photographing), 1);
}

#[tokio::test]
async fn test_busy_state_only_queues_instructions() {
    let mut f = fixture(StateKind::Moving);
    let bytes = instruction(Command::RadarScan);

    let outcome = f.rover.dispatch(Operation::ReceiveMessage(bytes)).await.unwrap();

    assert_eq!(
        outcome,
        Dispatch::Completed {
            state: StateKind::Moving,
            report: None
        }
    );
    assert_eq!(f.rover.queue().len(), 1);
    assert!(f.transmissions().is_empty());
}

#[tokio::test]
async fn test_relay_returns_to_listening() {
    let mut f = fixture(StateKind::Transmitting);

    let outcome = f
        .rover
        .dispatch(Operation::TransmitMessage(vec![9, 9, 9]))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        Dispatch::Completed {
            state: StateKind::Listening,
            report: None
        }
    );
    let sent = f.transmissions();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].intent, TransmitIntent::Relay);
    assert_eq!(sent[0].payload, vec![9, 9, 9]);
}

#[tokio::test]
async fn test_clock_sync_moves_sol() {
    let mut f = fixture(StateKind::Maintenance);
    assert_eq!(f.rover.sol(), 100);

    let target = Utc::now() + ChronoDuration::milliseconds(SOL_MILLIS * 50 + 60_000);
    let outcome = f
        .rover
        .dispatch(Operation::SynchronizeClocks(target.to_rfc3339()))
        .await
        .unwrap();
    let (state, report) = completed(outcome);
    let report = report.unwrap();

    assert_eq!(state, StateKind::Transmitting);
    assert_eq!(f.rover.sol(), 150);
    assert_eq!(report.module_reporting, Module::Sclk);

    let info: SclkInfo = decode_body("SclkInfo", report.module_message.as_deref().unwrap()).unwrap();
    assert_eq!(info.sol, 150);
    assert!(info.offset_millis > 0);
}

#[tokio::test]
async fn test_clock_sync_rejects_garbage_timestamp() {
    let mut f = fixture(StateKind::Maintenance);

    let outcome = f
        .rover
        .dispatch(Operation::SynchronizeClocks("yesterday".to_string()))
        .await
        .unwrap();
    let (_, report) = completed(outcome);

    assert_eq!(f.rover.sol(), 100);
    assert_eq!(f.rover.clock().offset(), ChronoDuration::zero());
    assert!(report.unwrap().notes.unwrap().contains("not an RFC 3339"));
    assert_eq!(f.sink.errors().len(), 1);
}

#[tokio::test]
async fn test_log_request_filters_by_severity() {
    let mut f = fixture(StateKind::Maintenance);
    f.rover.write_system_log("Wheel odometry nominal");
    f.rover.write_error_log("Thruster fault", Some("valve stuck".to_string()));

    let outcome = f
        .rover
        .dispatch(Operation::RequestLogs(LogRequest {
            min_severity: Some(Severity::Error),
            limit: 10,
        }))
        .await
        .unwrap();
    let (_, report) = completed(outcome);
    let report = report.unwrap();
    let bundle: LogBundle =
        decode_body("LogBundle", report.module_message.as_deref().unwrap()).unwrap();

    assert_eq!(report.module_reporting, Module::Kernel);
    assert_eq!(bundle.entries.len(), 1);
    assert_eq!(bundle.entries[0].message, "Thruster fault");
    assert_eq!(bundle.entries[0].cause.as_deref(), Some("valve stuck"));
}

#[tokio::test]
async fn test_log_request_keeps_newest() {
    let mut f = fixture(StateKind::Maintenance);
    f.rover.write_system_log("first");
    f.rover.write_system_log("second");

    let outcome = f
        .rover
        .dispatch(Operation::RequestLogs(LogRequest {
            min_severity: None,
            limit: 1,
        }))
        .await
        .unwrap();
    let (_, report) = completed(outcome);
    let bundle: LogBundle =
        decode_body("LogBundle", report.unwrap().module_message.as_deref().unwrap()).unwrap();

    assert_eq!(bundle.entries.len(), 1);
    assert_eq!(bundle.entries[0].message, "second");
}

#[tokio::test]
async fn test_radar_scan_cues_one_blip_per_contact() {
    for seed in 0..8 {
        let mut config = test_config(StateKind::RadarScanning);
        config.rover.seed = Some(seed);
        let mut f = fixture_with(config, PhotoBehaviour::Fail("unused"));

        let outcome = f.rover.dispatch(Operation::PerformRadarScan).await.unwrap();
        let (state, report) = completed(outcome);
        let report = report.unwrap();
        let sweep: RadarSweep =
            decode_body("RadarSweep", report.module_message.as_deref().unwrap()).unwrap();

        assert_eq!(state, StateKind::Transmitting);
        assert_eq!(report.module_reporting, Module::Radar);
        assert!(sweep.contacts.len() <= MAX_RADAR_CONTACTS);
        assert!(sweep
            .contacts
            .windows(2)
            .all(|pair| pair[0].bearing_deg <= pair[1].bearing_deg));

        let cues = f.animator.cues();
        assert_eq!(cues.len(), sweep.contacts.len());
        for (cue, contact) in cues.iter().zip(&sweep.contacts) {
            assert_eq!(cue.kind, CueKind::RadarBlip);
            assert_eq!(cue.location, contact.location);
            assert_eq!(cue.duration, radar_blip_duration());
        }
    }
}

#[tokio::test]
async fn test_exploring_operations_report_lidar_and_spectrometer() {
    let mut f = fixture(StateKind::Exploring);
    let (_, report) = completed(f.rover.dispatch(Operation::ExploreArea).await.unwrap());
    let report = report.unwrap();
    let survey: TerrainSurvey =
        decode_body("TerrainSurvey", report.module_message.as_deref().unwrap()).unwrap();
    assert_eq!(report.module_reporting, Module::Lidar);
    assert_eq!(survey.elevations_mm.len(), 9);
    assert_eq!(f.animator.cues()[0].kind, CueKind::TerrainSweep);

    let mut f = fixture(StateKind::Exploring);
    let (_, report) = completed(f.rover.dispatch(Operation::ScanSurroundings).await.unwrap());
    let ring: ObstacleRing =
        decode_body("ObstacleRing", report.unwrap().module_message.as_deref().unwrap()).unwrap();
    assert_eq!(ring.distances_cm.len(), 8);

    let mut f = fixture(StateKind::Exploring);
    let (state, report) = completed(f.rover.dispatch(Operation::ShootNeutrons).await.unwrap());
    assert_eq!(state, StateKind::Transmitting);
    assert_eq!(report.unwrap().module_reporting, Module::Spectrometer);
}

#[tokio::test]
async fn test_weather_reports_requested_metrics_only() {
    let mut f = fixture(StateKind::WeatherSensing);
    let query = WeatherQuery {
        metrics: vec![WeatherMetric::Temperature],
    };

    let (_, report) = completed(f.rover.dispatch(Operation::SenseWeather(query)).await.unwrap());
    let report = report.unwrap();
    let reading: WeatherReading =
        decode_body("WeatherReading", report.module_message.as_deref().unwrap()).unwrap();

    assert_eq!(report.module_reporting, Module::WeatherSensor);
    assert!(reading.temperature_c.is_some());
    assert!(reading.pressure_pa.is_none());
    assert!(reading.wind_speed_ms.is_none());
    assert!(reading.humidity_pct.is_none());
}

#[tokio::test]
async fn test_software_update() {
    let mut f = fixture(StateKind::Maintenance);
    f.rover
        .dispatch(Operation::UpdateSoftware(SoftwarePackage {
            version: "2.1.0".to_string(),
            image: vec![0; 16],
        }))
        .await
        .unwrap();
    assert_eq!(f.rover.software_version(), "2.1.0");

    let mut f = fixture(StateKind::Maintenance);
    let (state, report) = completed(
        f.rover
            .dispatch(Operation::UpdateSoftware(SoftwarePackage {
                version: "2.1.0".to_string(),
                image: Vec::new(),
            }))
            .await
            .unwrap(),
    );
    assert_eq!(state, StateKind::Transmitting);
    assert_eq!(f.rover.software_version(), "1.0.0");
    assert!(report.unwrap().notes.unwrap().contains("refused"));
}

#[tokio::test]
async fn test_shutdown_hibernates_and_wake_up_listens() {
    let mut f = fixture(StateKind::Maintenance);

    let (state, report) = completed(f.rover.dispatch(Operation::GracefulShutdown).await.unwrap());
    assert_eq!(state, StateKind::Hibernating);
    assert_eq!(report.unwrap().battery_level, 1500);

    let (state, report) = completed(f.rover.dispatch(Operation::WakeUp).await.unwrap());
    assert_eq!(state, StateKind::Listening);
    assert!(report.is_none());
}

#[tokio::test]
async fn test_sclk_information_from_listening() {
    let mut f = fixture(StateKind::Listening);

    let (state, report) = completed(f.rover.dispatch(Operation::GetSclkInformation).await.unwrap());
    let report = report.unwrap();

    assert_eq!(state, StateKind::Transmitting);
    assert_eq!(report.module_reporting, Module::Sclk);
    assert_eq!(report.sol_number, 100);
}

#[tokio::test]
async fn test_transition_builds_fresh_state() {
    let mut f = fixture(StateKind::Listening);

    f.rover.dispatch(Operation::ReceiveMessage(vec![0xFF])).await.unwrap();
    assert_eq!(f.rover.state().handled(), 1);

    f.rover.dispatch(Operation::Sleep).await.unwrap();
    f.rover.dispatch(Operation::WakeUp).await.unwrap();
    assert_eq!(f.rover.state_kind(), StateKind::Listening);
    assert_eq!(f.rover.state().handled(), 0);
    assert_eq!(f.metrics.transitions(), 2);
}

#[tokio::test]
async fn test_transmitter_failure_is_recovered() {
    let mut f = fixture(StateKind::Moving);
    let (transmitter, downlink) = ChannelTransmitter::new();
    drop(downlink);
    f.rover.uplink.transmitter = Arc::new(transmitter);

    let (state, report) = completed(
        f.rover
            .dispatch(Operation::Move(MoveTarget { x: 1, y: 0 }))
            .await
            .unwrap(),
    );

    assert_eq!(state, StateKind::Transmitting);
    assert!(report.is_some());
    assert_eq!(f.metrics.snapshot().external_failures, 1);
    assert_eq!(f.sink.errors()[0].message, "Transmission failed");
    assert_eq!(f.sink.errors()[0].source, TRANSMITTER_SOURCE);
}

#[tokio::test]
async fn test_journal_entries_name_the_active_state() {
    let mut f = fixture(StateKind::Photographing);

    f.rover.dispatch(Operation::Move(MoveTarget { x: 1, y: 1 })).await.unwrap();
    f.rover
        .dispatch(Operation::ActivateCameraById("FHAZ".to_string()))
        .await
        .unwrap();

    let entries = f.sink.entries();
    assert_eq!(entries[0].source, "Photographing State");
    assert_eq!(entries[0].message, "cannot move in Photographing State");
    let transition = entries.last().unwrap();
    assert_eq!(transition.message, "Photographing State -> Transmitting State");
    assert_eq!(transition.source, "Transmitting State");
}

#[tokio::test]
async fn test_drive_to_far_corner_keeps_rover_running() {
    let f = fixture(StateKind::Moving);
    let (handle, _task) = spawn(f.rover, 4);

    let corner = MoveTarget {
        x: i32::MIN,
        y: i32::MIN,
    };
    let (state, report) = completed(handle.dispatch(Operation::Move(corner)).await.unwrap());
    let report = report.unwrap();

    assert_eq!(state, StateKind::Transmitting);
    assert_eq!(report.location, Location::new(i32::MIN, i32::MIN));
    assert_eq!(report.battery_level, 0);
    assert!(report.notes.unwrap().contains(&u32::MAX.to_string()));

    let status = handle.status().await.unwrap();
    assert_eq!(status.location, Location::new(i32::MIN, i32::MIN));
    assert_eq!(status.battery_primary + status.battery_auxiliary, 0);

    handle.dispatch(Operation::Sleep).await.unwrap();
    assert_eq!(handle.status().await.unwrap().state, StateKind::Sleeping);
}

#[tokio::test]
async fn test_radar_scan_at_grid_edge() {
    for seed in 0..8 {
        let mut config = test_config(StateKind::Listening);
        config.rover.seed = Some(seed);
        config.rover.start_x = i32::MAX;
        config.rover.start_y = i32::MIN;
        let mut f = fixture_with(config, PhotoBehaviour::Fail("unused"));

        let (state, report) = completed(
            f.rover
                .dispatch(Operation::ReceiveMessage(instruction(Command::RadarScan)))
                .await
                .unwrap(),
        );
        let sweep: RadarSweep =
            decode_body("RadarSweep", report.unwrap().module_message.as_deref().unwrap()).unwrap();

        assert_eq!(state, StateKind::Transmitting);
        assert!(sweep.contacts.len() <= MAX_RADAR_CONTACTS);
        for contact in &sweep.contacts {
            assert!(contact.location.x < i32::MAX || contact.location.y > i32::MIN);
            assert!(contact.range > 0.0);
            assert!(contact.range <= (2.0f32 * 10.0 * 10.0).sqrt() + 0.01);
        }
        assert_eq!(f.animator.cues().len(), sweep.contacts.len());
    }
}

#[tokio::test]
async fn test_unreachable_starting_sol_still_boots() {
    let mut config = test_config(StateKind::Listening);
    config.clock.starting_sol = Some(u32::MAX);
    let mut f = fixture_with(config, PhotoBehaviour::Fail("unused"));

    assert!(f.rover.sol() > 0);
    let (state, report) = completed(
        f.rover
            .dispatch(Operation::GetSclkInformation)
            .await
            .unwrap(),
    );
    assert_eq!(state, StateKind::Transmitting);
    assert_eq!(report.unwrap().sol_number, f.rover.sol());
}

#[tokio::test]
async fn test_faulted_dispatch_returns_to_entry_state() {
    let mut f = fixture(StateKind::Listening);
    let entered = f.rover.state().clone();

    // A routed instruction has already handed off when the target faults.
    f.rover.set_state(StateKind::Moving);
    f.rover
        .abort_dispatch(entered.clone(), &KernelError::HandoffLimit(MAX_HANDOFFS));

    assert_eq!(f.rover.state_kind(), StateKind::Listening);
    assert_eq!(f.rover.state().entered_at(), entered.entered_at());
    let errors = f.sink.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "Operation aborted");
    assert_eq!(errors[0].source, "Listening State");
    assert_eq!(
        errors[0].cause.as_deref(),
        Some("Handoff did not settle after 4 steps")
    );
}

#[tokio::test]
async fn test_handle_serves_requests_in_order() {
    let f = fixture(StateKind::Sleeping);
    let (handle, task) = spawn(f.rover, 8);

    handle.dispatch(Operation::WakeUp).await.unwrap();
    let moved = handle
        .receive_message(instruction(Command::Move(MoveTarget { x: 2, y: 0 })))
        .await
        .unwrap();
    assert!(matches!(
        moved,
        Dispatch::Completed {
            state: StateKind::Transmitting,
            ..
        }
    ));

    let status = handle.status().await.unwrap();
    assert_eq!(status.location, Location::new(2, 0));
    assert_eq!(status.queued_instructions, 1);

    drop(handle);
    let rover = task.await.unwrap();
    assert_eq!(rover.state_kind(), StateKind::Transmitting);
}

#[tokio::test]
async fn test_handle_reports_stopped_rover() {
    let f = fixture(StateKind::Sleeping);
    let (handle, task) = spawn(f.rover, 1);
    task.abort();
    let _ = task.await;

    let err = handle.dispatch(Operation::WakeUp).await.unwrap_err();
    assert_eq!(err, KernelError::RoverUnavailable);
}

#[tokio::test]
async fn test_fleet_keeps_rovers_apart() {
    let fleet = Fleet::new();

    let mut first = test_config(StateKind::Sleeping);
    first.rover.name = "Spirit".to_string();
    let mut second = test_config(StateKind::Sleeping);
    second.rover.name = "Opportunity".to_string();

    let (spirit, _) = spawn(fixture_with(first, PhotoBehaviour::Fail("unused")).rover, 4);
    let (opportunity, _) = spawn(fixture_with(second, PhotoBehaviour::Fail("unused")).rover, 4);
    fleet.insert(spirit);
    fleet.insert(opportunity);

    assert_eq!(fleet.names(), vec!["Opportunity", "Spirit"]);

    fleet.dispatch("Spirit", Operation::WakeUp).await.unwrap();

    let statuses = fleet.statuses().await;
    assert_eq!(statuses.len(), 2);
    assert_eq!(statuses[0].state, StateKind::Sleeping);
    assert_eq!(statuses[1].state, StateKind::Listening);

    let err = fleet.dispatch("Sojourner", Operation::WakeUp).await.unwrap_err();
    assert_eq!(err, KernelError::RoverUnavailable);
}

#[test]
fn test_kernel_error_messages() {
    let err = KernelError::HandoffRefused {
        state: StateKind::Moving,
        operation: OperationKind::ShootNeutrons,
    };
    assert_eq!(err.to_string(), "Handoff refused: Moving State does not shoot neutrons");
    assert_eq!(
        KernelError::HandoffLimit(MAX_HANDOFFS).to_string(),
        "Handoff did not settle after 4 steps"
    );
}
