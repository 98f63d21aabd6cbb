//! Configuration management for fieldhand
//!
//! Worker timings, safety thresholds, storage geometry and farming toggles,
//! stored as JSON under the data directory.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use fieldhand_world::CropType;

pub mod paths;

pub use paths::{config_path, data_dir};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Loop pacing, all in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Sleep between ticks
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Pause at the top of each harvesting step
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,
    /// Settle time before and after navigation
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    /// Wait while the actor is busy
    #[serde(default = "default_busy_wait_ms")]
    pub busy_wait_ms: u64,
    /// Wait for storage slots to show up
    #[serde(default = "default_storage_wait_ms")]
    pub storage_wait_ms: u64,
    /// Pause between take rounds
    #[serde(default = "default_take_interval_ms")]
    pub take_interval_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            step_delay_ms: default_step_delay_ms(),
            settle_ms: default_settle_ms(),
            busy_wait_ms: default_busy_wait_ms(),
            storage_wait_ms: default_storage_wait_ms(),
            take_interval_ms: default_take_interval_ms(),
        }
    }
}

impl WorkerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn busy_wait(&self) -> Duration {
        Duration::from_millis(self.busy_wait_ms)
    }

    pub fn storage_wait(&self) -> Duration {
        Duration::from_millis(self.storage_wait_ms)
    }

    pub fn take_interval(&self) -> Duration {
        Duration::from_millis(self.take_interval_ms)
    }
}

fn default_poll_interval_ms() -> u64 {
    200
}

fn default_step_delay_ms() -> u64 {
    100
}

fn default_settle_ms() -> u64 {
    300
}

fn default_busy_wait_ms() -> u64 {
    500
}

fn default_storage_wait_ms() -> u64 {
    1000
}

fn default_take_interval_ms() -> u64 {
    1000
}

/// Meter thresholds as fractions in [0, 1]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyConfig {
    #[serde(default = "default_min_health")]
    pub min_health: f64,
    #[serde(default = "default_min_energy")]
    pub min_energy: f64,
    #[serde(default = "default_min_stamina")]
    pub min_stamina: f64,
    /// Stamina and hydration level at which drinking stops
    #[serde(default = "default_drink_target")]
    pub drink_target: f64,
    #[serde(default = "default_drink_interval_ms")]
    pub drink_interval_ms: u64,
    /// Drinks attempted in one tick before giving up until the next
    #[serde(default = "default_max_drink_rounds")]
    pub max_drink_rounds: u32,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            min_health: default_min_health(),
            min_energy: default_min_energy(),
            min_stamina: default_min_stamina(),
            drink_target: default_drink_target(),
            drink_interval_ms: default_drink_interval_ms(),
            max_drink_rounds: default_max_drink_rounds(),
        }
    }
}

impl SafetyConfig {
    pub fn drink_interval(&self) -> Duration {
        Duration::from_millis(self.drink_interval_ms)
    }
}

fn default_min_health() -> f64 {
    0.10
}

fn default_min_energy() -> f64 {
    0.30
}

fn default_min_stamina() -> f64 {
    0.40
}

fn default_drink_target() -> f64 {
    0.99
}

fn default_drink_interval_ms() -> u64 {
    1000
}

fn default_max_drink_rounds() -> u32 {
    60
}

/// Remote storage geometry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Slots the storage shows once fully opened
    #[serde(default = "default_slot_count")]
    pub slot_count: usize,
    /// Most units a single slot may hold
    #[serde(default = "default_slot_capacity")]
    pub slot_capacity: u32,
    /// Units one free inventory slot can take
    #[serde(default = "default_seed_weight")]
    pub seed_weight: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            slot_count: default_slot_count(),
            slot_capacity: default_slot_capacity(),
            seed_weight: default_seed_weight(),
        }
    }
}

fn default_slot_count() -> usize {
    10
}

fn default_slot_capacity() -> u32 {
    200_000
}

fn default_seed_weight() -> u32 {
    50
}

/// What to farm and how
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FarmingConfig {
    #[serde(default = "default_true")]
    pub harvest: bool,
    #[serde(default = "default_true")]
    pub plant: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop: Option<CropType>,
    /// Wrap around to the first field after the last one
    #[serde(default = "default_true")]
    pub cycle_fields: bool,
}

impl Default for FarmingConfig {
    fn default() -> Self {
        Self {
            harvest: true,
            plant: true,
            crop: None,
            cycle_fields: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub safety: SafetyConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub farming: FarmingConfig,
}

impl Config {
    /// Load from the default location
    pub async fn load() -> Result<Self> {
        let path = config_path();
        Self::load_from(&path).await
    }

    /// Load from specific location; a missing file yields defaults
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("◆ No config at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        debug!("◆ Loading config from {:?}", path);
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save to the default location
    pub async fn save(&self) -> Result<()> {
        let path = config_path();
        self.save_to(&path).await
    }

    /// Save to specific location
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        debug!("◆ Writing config to {:?}", path);

        if let Some(parent) = path.parent() {
            paths::ensure_dir(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Reject values the worker cannot run with
    pub fn validate(&self) -> Result<()> {
        let safety = &self.safety;
        for (name, value) in [
            ("safety.min_health", safety.min_health),
            ("safety.min_energy", safety.min_energy),
            ("safety.min_stamina", safety.min_stamina),
            ("safety.drink_target", safety.drink_target),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        if safety.drink_target < safety.min_stamina {
            return Err(ConfigError::Invalid(
                "safety.drink_target is below safety.min_stamina".to_string(),
            ));
        }
        if self.storage.slot_count == 0 {
            return Err(ConfigError::Invalid(
                "storage.slot_count must be positive".to_string(),
            ));
        }
        if self.storage.slot_capacity == 0 {
            return Err(ConfigError::Invalid(
                "storage.slot_capacity must be positive".to_string(),
            ));
        }
        if self.storage.seed_weight == 0 {
            return Err(ConfigError::Invalid(
                "storage.seed_weight must be positive".to_string(),
            ));
        }
        if self.worker.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "worker.poll_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Write the default config unless one exists, then load it
pub async fn init() -> Result<Config> {
    init_at(&config_path()).await
}

/// `init` against an explicit config file
pub async fn init_at(path: &Path) -> Result<Config> {
    if path.exists() {
        warn!("◆ Config already exists at {:?}", path);
    } else {
        Config::default().save_to(path).await?;
        info!("◆ Config written to {:?}", path);
    }

    Config::load_from(path).await
}
