use chrono::{DateTime, Duration, Utc};

/// Length of a Martian solar day.
pub const SOL_MILLIS: i64 = 88_775_244;

/// Primary and auxiliary power, in abstract units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Battery {
    pub primary: u32,
    pub auxiliary: u32,
}

impl Battery {
    pub fn new(primary: u32, auxiliary: u32) -> Self {
        Self { primary, auxiliary }
    }

    /// Draws from primary first, then auxiliary. Saturates at zero and
    /// returns what was actually drawn.
    pub fn draw(&mut self, units: u32) -> u32 {
        let from_primary = units.min(self.primary);
        self.primary -= from_primary;

        let from_auxiliary = (units - from_primary).min(self.auxiliary);
        self.auxiliary -= from_auxiliary;

        from_primary + from_auxiliary
    }

    pub fn total(&self) -> u32 {
        self.primary.saturating_add(self.auxiliary)
    }
}

/// Remaining shots before the camera is worn out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Camera {
    pub lifespan: u32,
}

impl Camera {
    pub fn new(lifespan: u32) -> Self {
        Self { lifespan }
    }

    pub fn is_end_of_life(&self) -> bool {
        self.lifespan == 0
    }

    pub fn consume_shot(&mut self) {
        self.lifespan = self.lifespan.saturating_sub(1);
    }
}

/// Spacecraft clock: mission epoch plus a correction applied by clock sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpacecraftClock {
    epoch: DateTime<Utc>,
    offset: Duration,
}

impl SpacecraftClock {
    pub fn new(epoch: DateTime<Utc>) -> Self {
        Self {
            epoch,
            offset: Duration::zero(),
        }
    }

    /// Clock whose current sol is `sol` at `now`. An epoch earlier than the
    /// calendar can represent is pinned to `DateTime::<Utc>::MIN_UTC`.
    pub fn starting_at_sol(sol: u32, now: DateTime<Utc>) -> Self {
        let epoch = Duration::try_milliseconds(SOL_MILLIS * i64::from(sol))
            .and_then(|elapsed| now.checked_sub_signed(elapsed))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self::new(epoch)
    }

    pub fn epoch(&self) -> DateTime<Utc> {
        self.epoch
    }

    pub fn now(&self) -> DateTime<Utc> {
        Utc::now() + self.offset
    }

    pub fn offset(&self) -> Duration {
        self.offset
    }

    /// Milliseconds since the mission epoch.
    pub fn sclk_millis(&self) -> i64 {
        (self.now() - self.epoch).num_milliseconds()
    }

    pub fn sol(&self) -> u32 {
        let sols = self.sclk_millis().max(0) / SOL_MILLIS;
        u32::try_from(sols).unwrap_or(u32::MAX)
    }

    /// Sets the correction so that the clock reads `utc` right now.
    pub fn synchronize(&mut self, utc: DateTime<Utc>) {
        self.offset = utc - Utc::now();
    }
}
