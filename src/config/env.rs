use super::RoverConfig;
use tracing::warn;

impl RoverConfig {
    /// Apply `ROVER_*` environment overrides on top of file or default values.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup. Unparsable values are
    /// ignored with a warning.
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = lookup("ROVER_NAME") {
            self.rover.name = v;
        }
        if let Some(v) = lookup("ROVER_NASA_API_KEY") {
            self.photo.auth_key = v;
        }
        if let Some(v) = lookup("ROVER_PHOTO_BASE_URL") {
            self.photo.base_url = v;
        }
        if let Some(v) = lookup("ROVER_PHOTO_TIMEOUT_MS") {
            match v.parse::<u64>() {
                Ok(ms) => self.photo.timeout_ms = ms,
                Err(_) => warn!(value = %v, "Ignoring invalid ROVER_PHOTO_TIMEOUT_MS"),
            }
        }
        if let Some(v) = lookup("ROVER_SEED") {
            match v.parse::<u64>() {
                Ok(seed) => self.rover.seed = Some(seed),
                Err(_) => warn!(value = %v, "Ignoring invalid ROVER_SEED"),
            }
        }

        self
    }
}
