// External collaborators the kernel talks to

pub mod animation;
mod photo;
mod transmit;

use std::sync::Arc;

pub use animation::{AnimationCue, Animator, CueKind, DetachedAnimator, NoopAnimator};
pub use photo::{HttpPhotoQuery, PhotoQuery, PhotoRequest, PhotoResponse};
pub use transmit::{ChannelTransmitter, Transmission, TransmitIntent, Transmitter};

/// The boundaries a rover is wired to.
#[derive(Clone)]
pub struct Uplink {
    pub photo: Arc<dyn PhotoQuery>,
    pub transmitter: Arc<dyn Transmitter>,
    pub animator: Arc<dyn Animator>,
}
