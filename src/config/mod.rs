mod env;

use crate::kernel::StateKind;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::PathBuf;

/// Complete rover configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoverConfig {
    #[serde(default)]
    pub rover: RoverSettings,
    #[serde(default)]
    pub power: PowerConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub clock: ClockConfig,
    #[serde(default)]
    pub photo: PhotoConfig,
    #[serde(default)]
    pub journal: JournalConfig,
    #[serde(default)]
    pub kernel: KernelConfig,
}

/// Identity and starting conditions
#[derive(Debug, Clone, Deserialize)]
pub struct RoverSettings {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_initial_state")]
    pub initial_state: StateKind,
    #[serde(default)]
    pub start_x: i32,
    #[serde(default)]
    pub start_y: i32,
    #[serde(default = "default_software_version")]
    pub software_version: String,
    /// Where downlinked products are archived on the ground. Opaque to the kernel.
    #[serde(default = "default_archive_path")]
    pub archive_path: PathBuf,
    /// Seed for synthetic sensor readings; random when unset.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_name() -> String {
    "Curiosity".to_string()
}

fn default_initial_state() -> StateKind {
    StateKind::Sleeping
}

fn default_software_version() -> String {
    "1.0.0".to_string()
}

fn default_archive_path() -> PathBuf {
    PathBuf::from("data/archive")
}

impl Default for RoverSettings {
    fn default() -> Self {
        Self {
            name: default_name(),
            initial_state: default_initial_state(),
            start_x: 0,
            start_y: 0,
            software_version: default_software_version(),
            archive_path: default_archive_path(),
            seed: None,
        }
    }
}

/// Battery capacity in power units
#[derive(Debug, Clone, Deserialize)]
pub struct PowerConfig {
    #[serde(default = "default_primary_units")]
    pub primary_units: u32,
    #[serde(default = "default_auxiliary_units")]
    pub auxiliary_units: u32,
}

fn default_primary_units() -> u32 {
    1000
}

fn default_auxiliary_units() -> u32 {
    500
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            primary_units: default_primary_units(),
            auxiliary_units: default_auxiliary_units(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    /// Shots left before the camera reaches end of life
    #[serde(default = "default_camera_lifespan")]
    pub lifespan: u32,
}

fn default_camera_lifespan() -> u32 {
    100
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            lifespan: default_camera_lifespan(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClockConfig {
    /// Landing time; sol 0 starts here
    #[serde(default = "default_mission_epoch")]
    pub mission_epoch: DateTime<Utc>,
    /// When set, the epoch is shifted so the rover boots on this sol
    #[serde(default)]
    pub starting_sol: Option<u32>,
}

fn default_mission_epoch() -> DateTime<Utc> {
    // 2012-08-06T05:17:57Z
    DateTime::from_timestamp(1_344_230_277, 0).unwrap_or_default()
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            mission_epoch: default_mission_epoch(),
            starting_sol: None,
        }
    }
}

/// Remote photo archive
#[derive(Debug, Clone, Deserialize)]
pub struct PhotoConfig {
    #[serde(default = "default_photo_base_url")]
    pub base_url: String,
    #[serde(default = "default_photo_rover")]
    pub rover_name: String,
    #[serde(default = "default_auth_key")]
    pub auth_key: String,
    #[serde(default = "default_photo_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_photo_base_url() -> String {
    "https://api.nasa.gov/mars-photos/api/v1".to_string()
}

fn default_photo_rover() -> String {
    "curiosity".to_string()
}

fn default_auth_key() -> String {
    "DEMO_KEY".to_string()
}

fn default_photo_timeout_ms() -> u64 {
    5000
}

impl Default for PhotoConfig {
    fn default() -> Self {
        Self {
            base_url: default_photo_base_url(),
            rover_name: default_photo_rover(),
            auth_key: default_auth_key(),
            timeout_ms: default_photo_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JournalConfig {
    /// Entries retained for log downlink requests
    #[serde(default = "default_journal_capacity")]
    pub capacity: usize,
}

fn default_journal_capacity() -> usize {
    256
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            capacity: default_journal_capacity(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct KernelConfig {
    /// Pending requests buffered in front of each rover task
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,
}

fn default_mailbox_capacity() -> usize {
    64
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: default_mailbox_capacity(),
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<RoverConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path))?;
    let config: RoverConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file '{}'", path))?;
    Ok(config)
}
