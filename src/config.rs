//! Engine configuration.
//!
//! Loaded from a JSON file or built in code. Every field has a default so a
//! partial config file (or `{}`) is valid.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Recognized engine options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Contacts with fewer messages than this are excluded from the map.
    #[serde(default = "default_min_messages")]
    pub min_messages: usize,
    /// Contact domains dropped during grouping (automated senders etc.).
    #[serde(default)]
    pub excluded_domains: Vec<String>,
    /// Regex patterns matched against the contact email; matches are dropped.
    #[serde(default)]
    pub excluded_patterns: Vec<String>,
    /// Only messages within this window of "now" are considered for
    /// commitment extraction.
    #[serde(default = "default_commitment_lookback_days")]
    pub commitment_lookback_days: i64,
    /// Master toggle for oracle-backed commitment extraction.
    #[serde(default = "default_true")]
    pub extract_commitments: bool,
    /// Forward-projection horizon for the predictor.
    #[serde(default = "default_prediction_horizon_days")]
    pub prediction_horizon_days: i64,
    /// Contacts processed concurrently per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Pause between contact batches, to respect oracle rate limits.
    #[serde(default = "default_batch_pause_ms")]
    pub batch_pause_ms: u64,
    /// Optional overall deadline. When exceeded, remaining contacts are
    /// truncated and the partial map is returned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_ms: Option<u64>,
    /// Messages with bodies shorter than this skip oracle classification.
    #[serde(default = "default_min_commitment_body_chars")]
    pub min_commitment_body_chars: usize,
    /// Oracle endpoint configuration (None = extraction disabled unless an
    /// oracle is injected directly).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oracle: Option<OracleConfig>,
}

/// HTTP oracle endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleConfig {
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_oracle_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_oracle_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_min_messages() -> usize {
    3
}
fn default_commitment_lookback_days() -> i64 {
    90
}
fn default_true() -> bool {
    true
}
fn default_prediction_horizon_days() -> i64 {
    30
}
fn default_batch_size() -> usize {
    10
}
fn default_batch_pause_ms() -> u64 {
    500
}
fn default_min_commitment_body_chars() -> usize {
    40
}
fn default_oracle_max_attempts() -> u32 {
    3
}
fn default_oracle_timeout_secs() -> u64 {
    30
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_messages: default_min_messages(),
            excluded_domains: Vec::new(),
            excluded_patterns: Vec::new(),
            commitment_lookback_days: default_commitment_lookback_days(),
            extract_commitments: default_true(),
            prediction_horizon_days: default_prediction_horizon_days(),
            batch_size: default_batch_size(),
            batch_pause_ms: default_batch_pause_ms(),
            deadline_ms: None,
            min_commitment_body_chars: default_min_commitment_body_chars(),
            oracle: None,
        }
    }
}

impl EngineConfig {
    /// Load config from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, EngineError> {
        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&content)
            .map_err(|e| EngineError::Configuration(format!("{}: {}", path.display(), e)))?;
        Ok(config)
    }
}
