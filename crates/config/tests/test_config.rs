//! Tests for Config serialization, persistence and validation

use fieldhand_config::{
    init_at, Config, ConfigError, FarmingConfig, SafetyConfig, StorageConfig, WorkerConfig,
};
use fieldhand_world::CropType;
use std::time::Duration;
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

/// Helper to create a temporary directory for tests
fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

// ============================================================================
// Defaults
// ============================================================================

#[test]
fn test_config_defaults() {
    let config = Config::default();

    // Worker pacing
    assert_eq!(config.worker.poll_interval_ms, 200);
    assert_eq!(config.worker.step_delay_ms, 100);
    assert_eq!(config.worker.settle_ms, 300);
    assert_eq!(config.worker.busy_wait_ms, 500);
    assert_eq!(config.worker.storage_wait_ms, 1000);
    assert_eq!(config.worker.take_interval_ms, 1000);

    // Safety thresholds
    assert_eq!(config.safety.min_health, 0.10);
    assert_eq!(config.safety.min_energy, 0.30);
    assert_eq!(config.safety.min_stamina, 0.40);
    assert_eq!(config.safety.drink_target, 0.99);
    assert_eq!(config.safety.max_drink_rounds, 60);

    // Storage geometry
    assert_eq!(config.storage.slot_count, 10);
    assert_eq!(config.storage.slot_capacity, 200_000);
    assert_eq!(config.storage.seed_weight, 50);

    // Farming
    assert!(config.farming.harvest);
    assert!(config.farming.plant);
    assert!(config.farming.crop.is_none());
    assert!(config.farming.cycle_fields);
}

#[test]
fn test_duration_helpers() {
    let worker = WorkerConfig::default();
    assert_eq!(worker.poll_interval(), Duration::from_millis(200));
    assert_eq!(worker.settle(), Duration::from_millis(300));
    assert_eq!(worker.take_interval(), Duration::from_secs(1));
    assert_eq!(SafetyConfig::default().drink_interval(), Duration::from_secs(1));
}

#[test]
fn test_section_defaults_match_root_defaults() {
    let config = Config::default();
    assert_eq!(
        StorageConfig::default().slot_capacity,
        config.storage.slot_capacity
    );
    assert_eq!(FarmingConfig::default().harvest, config.farming.harvest);
}

// ============================================================================
// Serialization
// ============================================================================

#[test]
fn test_config_serialization_structure() {
    let json = serde_json::to_string(&Config::default()).expect("Failed to serialize");
    let parsed: serde_json::Value = serde_json::from_str(&json).expect("Invalid JSON");

    assert!(parsed.get("worker").is_some());
    assert!(parsed.get("safety").is_some());
    assert!(parsed.get("storage").is_some());
    assert!(parsed.get("farming").is_some());
    // unset crop is omitted
    assert!(parsed["farming"].get("crop").is_none());
}

#[test]
fn test_partial_json_fills_defaults() {
    let json = r#"{
        "safety": { "min_health": 0.2 },
        "farming": { "plant": false, "crop": "red-onion" }
    }"#;

    let config: Config = serde_json::from_str(json).expect("Failed to deserialize");

    assert_eq!(config.safety.min_health, 0.2);
    assert_eq!(config.safety.min_energy, 0.30);
    assert!(config.farming.harvest);
    assert!(!config.farming.plant);
    assert_eq!(config.farming.crop, Some(CropType::RedOnion));
    assert_eq!(config.worker.poll_interval_ms, 200);
}

#[test]
fn test_empty_json_is_default() {
    let config: Config = serde_json::from_str("{}").expect("Failed to deserialize");
    assert_eq!(config.storage.slot_count, 10);
    assert!(config.farming.cycle_fields);
}

// ============================================================================
// Persistence
// ============================================================================

#[tokio::test]
async fn test_save_and_load_round_trip() {
    let dir = temp_dir();
    let path = dir.path().join("nested").join("config.json");

    let mut config = Config::default();
    config.farming.crop = Some(CropType::Carrot);
    config.storage.slot_count = 16;
    config.save_to(&path).await.expect("Failed to save");

    let loaded = Config::load_from(&path).await.expect("Failed to load");
    assert_eq!(loaded.farming.crop, Some(CropType::Carrot));
    assert_eq!(loaded.storage.slot_count, 16);
}

#[tokio::test]
async fn test_missing_file_yields_defaults() {
    let dir = temp_dir();
    let loaded = Config::load_from(&dir.path().join("absent.json"))
        .await
        .expect("Failed to load");
    assert_eq!(loaded.worker.poll_interval_ms, 200);
}

#[tokio::test]
async fn test_malformed_file_is_an_error() {
    let dir = temp_dir();
    let path = dir.path().join("config.json");
    tokio::fs::write(&path, "{ not json").await.unwrap();

    let result = Config::load_from(&path).await;
    assert!(matches!(result, Err(ConfigError::Json(_))));
}

#[tokio::test]
async fn test_init_writes_once() {
    let dir = temp_dir();
    let path = dir.path().join("config.json");

    let first = init_at(&path).await.expect("Failed to init");
    assert!(path.exists());
    assert_eq!(first.storage.seed_weight, 50);

    let mut edited = first.clone();
    edited.farming.harvest = false;
    edited.save_to(&path).await.unwrap();

    let second = init_at(&path).await.expect("Failed to init");
    assert!(!second.farming.harvest);
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_default_config_is_valid() {
    assert_ok!(Config::default().validate());
}

#[test]
fn test_threshold_out_of_range_is_invalid() {
    let mut config = Config::default();
    config.safety.min_energy = 1.5;
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn test_drink_target_below_stamina_threshold_is_invalid() {
    let mut config = Config::default();
    config.safety.drink_target = 0.3;
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn test_zero_slots_is_invalid() {
    let mut config = Config::default();
    config.storage.slot_count = 0;
    let err = assert_err!(config.validate());
    assert!(err.to_string().contains("slot_count"));
}

#[test]
fn test_zero_slot_capacity_is_invalid() {
    let mut config = Config::default();
    config.storage.slot_capacity = 0;
    let err = assert_err!(config.validate());
    assert!(err.to_string().contains("slot_capacity"));
}

#[tokio::test]
async fn test_invalid_file_is_rejected_on_load() {
    let dir = temp_dir();
    let path = dir.path().join("config.json");
    tokio::fs::write(&path, r#"{ "storage": { "seed_weight": 0 } }"#)
        .await
        .unwrap();

    let result = Config::load_from(&path).await;
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}
