// src/config.rs
//! Engine configuration
//!
//! A `CaptureConfig` describes one embedding: the project it captures for,
//! the ingestion endpoint, the flush profiles of the two capture instances,
//! and the replay opt-in. Configuration can be built programmatically or
//! loaded from an optional `beacon` file with `BEACON_*` environment
//! overrides.

use crate::utils::errors::{CaptureError, Result};
use serde::{Deserialize, Serialize};

/// Flush thresholds and pacing for one capture instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlushProfile {
    /// Interval between scheduler ticks in milliseconds
    pub flush_interval_ms: u64,

    /// Buffered events that trigger a threshold flush
    pub max_events_per_batch: usize,

    /// Approximate serialized bytes that trigger a threshold flush
    pub max_batch_bytes: usize,

    /// Buffered events allowed while no access token is cached
    pub preauth_max_events: usize,

    /// Approximate buffered bytes allowed while no access token is cached
    pub preauth_max_bytes: usize,
}

impl Default for FlushProfile {
    fn default() -> Self {
        Self::events()
    }
}

impl FlushProfile {
    /// Profile for the DOM event instance.
    pub fn events() -> Self {
        Self {
            flush_interval_ms: 10_000,
            max_events_per_batch: 50,
            max_batch_bytes: 64_000,
            preauth_max_events: 10_000,
            preauth_max_bytes: 5_000_000,
        }
    }

    /// Profile for the screen replay instance. Recorder events are larger
    /// and more frequent, so both thresholds and pacing are wider.
    pub fn replay() -> Self {
        Self {
            flush_interval_ms: 5_000,
            max_events_per_batch: 200,
            max_batch_bytes: 512_000,
            preauth_max_events: 10_000,
            preauth_max_bytes: 5_000_000,
        }
    }

    /// Validate profile thresholds.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.flush_interval_ms == 0 {
            return Err("flush interval cannot be 0".to_string());
        }
        if self.max_events_per_batch == 0 {
            return Err("batch event threshold cannot be 0".to_string());
        }
        if self.max_batch_bytes == 0 {
            return Err("batch byte threshold cannot be 0".to_string());
        }
        if self.preauth_max_events < self.max_events_per_batch {
            return Err("pre-auth event cap cannot be below the batch threshold".to_string());
        }
        if self.preauth_max_bytes < self.max_batch_bytes {
            return Err("pre-auth byte cap cannot be below the batch threshold".to_string());
        }
        Ok(())
    }
}

/// Screen replay recording options.
///
/// Replays are disabled by default; embedders opt in with `enabled`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayOptions {
    /// Whether session replays are recorded at all
    pub enabled: bool,

    /// Whether the recorder should mask the content of all input elements
    pub mask_all_inputs: bool,

    /// Class name whose elements the recorder replaces with a placeholder
    pub block_class: Option<String>,

    /// CSS selector whose elements the recorder replaces with a placeholder
    pub block_selector: Option<String>,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            mask_all_inputs: true,
            block_class: None,
            block_selector: None,
        }
    }
}

/// Configuration for one capture embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Project the captured data belongs to; namespaces the stored session
    pub project_id: String,

    /// Ingestion endpoint receiving batch POSTs
    pub endpoint: String,

    /// Flush profile of the DOM event instance
    pub events: FlushProfile,

    /// Flush profile of the replay instance
    pub replay: FlushProfile,

    /// Replay recording options
    pub replays: ReplayOptions,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            endpoint: String::new(),
            events: FlushProfile::events(),
            replay: FlushProfile::replay(),
            replays: ReplayOptions::default(),
        }
    }
}

impl CaptureConfig {
    /// Create a configuration with default profiles.
    pub fn new(project_id: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// Load configuration from an optional `beacon` file (any format the
    /// `config` crate understands) layered under `BEACON_*` environment
    /// overrides, e.g. `BEACON_PROJECT_ID`, `BEACON_EVENTS__MAX_BATCH_BYTES`.
    pub fn load() -> Result<Self> {
        let loaded = config::Config::builder()
            .add_source(config::File::with_name("beacon").required(false))
            .add_source(config::Environment::with_prefix("BEACON").separator("__"))
            .build()
            .map_err(|e| CaptureError::Configuration(e.to_string()))?;

        let config: Self = loaded
            .try_deserialize()
            .map_err(|e| CaptureError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.project_id.is_empty() {
            return Err(CaptureError::Configuration(
                "project id cannot be empty".to_string(),
            ));
        }
        if self.endpoint.is_empty() {
            return Err(CaptureError::Configuration(
                "ingestion endpoint cannot be empty".to_string(),
            ));
        }
        self.events
            .validate()
            .map_err(|e| CaptureError::Configuration(format!("events profile: {}", e)))?;
        self.replay
            .validate()
            .map_err(|e| CaptureError::Configuration(format!("replay profile: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profiles() {
        let events = FlushProfile::events();
        assert_eq!(events.flush_interval_ms, 10_000);
        assert_eq!(events.max_events_per_batch, 50);
        assert_eq!(events.max_batch_bytes, 64_000);

        let replay = FlushProfile::replay();
        assert_eq!(replay.flush_interval_ms, 5_000);
        assert_eq!(replay.max_events_per_batch, 200);
        assert_eq!(replay.max_batch_bytes, 512_000);
    }

    #[test]
    fn test_replay_disabled_by_default() {
        let options = ReplayOptions::default();
        assert!(!options.enabled);
        assert!(options.mask_all_inputs);
    }

    #[test]
    fn test_validate_rejects_empty_project() {
        let config = CaptureConfig::new("", "https://ingest.example.com/v1/events");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = CaptureConfig::new("proj_1", "https://ingest.example.com/v1/events");
        config.events.flush_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_preauth_cap_below_threshold() {
        let mut profile = FlushProfile::replay();
        profile.preauth_max_events = 100;
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_valid_config_passes() {
        let config = CaptureConfig::new("proj_1", "https://ingest.example.com/v1/events");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_replay_options_roundtrip() {
        let options = ReplayOptions {
            enabled: true,
            mask_all_inputs: false,
            block_class: Some("no-capture".to_string()),
            block_selector: None,
        };
        let json = serde_json::to_string(&options).unwrap();
        let back: ReplayOptions = serde_json::from_str(&json).unwrap();
        assert!(back.enabled);
        assert!(!back.mask_all_inputs);
        assert_eq!(back.block_class.as_deref(), Some("no-capture"));
    }
}
