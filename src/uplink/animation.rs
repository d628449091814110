use crate::protocol::Location;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::debug;

/// Radar blip rendering: bright, normal, then dimmed.
pub const RADAR_BLIP_PHASES: [Duration; 3] = [
    Duration::from_millis(300),
    Duration::from_millis(200),
    Duration::from_millis(200),
];

pub const CAMERA_SHUTTER: Duration = Duration::from_millis(500);

pub const TERRAIN_SWEEP: Duration = Duration::from_millis(1500);

pub fn radar_blip_duration() -> Duration {
    RADAR_BLIP_PHASES.iter().sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueKind {
    CameraShutter,
    RadarBlip,
    TerrainSweep,
}

/// Request to render something at a surface location.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationCue {
    pub kind: CueKind,
    pub location: Location,
    pub duration: Duration,
}

impl AnimationCue {
    pub fn new(kind: CueKind, location: Location, duration: Duration) -> Self {
        Self {
            kind,
            location,
            duration,
        }
    }
}

/// Animation boundary. Calls must return immediately; the kernel never
/// waits on rendering.
pub trait Animator: Send + Sync {
    fn animate(&self, cue: AnimationCue);
}

/// Discards every cue.
pub struct NoopAnimator;

impl Animator for NoopAnimator {
    fn animate(&self, _cue: AnimationCue) {}
}

/// Plays each cue on its own detached tokio task.
pub struct DetachedAnimator {
    runtime: Handle,
}

impl DetachedAnimator {
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }
}

impl Animator for DetachedAnimator {
    fn animate(&self, cue: AnimationCue) {
        // JoinHandle dropped on purpose: nothing observes completion.
        self.runtime.spawn(async move {
            debug!(kind = ?cue.kind, location = %cue.location, "Animation started");
            tokio::time::sleep(cue.duration).await;
            debug!(kind = ?cue.kind, "Animation finished");
        });
    }
}
