//! Text-classification oracle interface.
//!
//! The oracle is an external, stateless service that reads one bounded
//! message prompt and returns candidate commitments. The engine never
//! reimplements classification; it validates whatever comes back and
//! degrades to "no commitments" on any failure.
//!
//! Clients are explicit handles injected into the engine — lifecycle is
//! owned by the caller, never module-level globals.

pub mod http;
pub mod prompt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use http::{HttpOracle, RetryPolicy};
pub use prompt::OracleRequest;

// ─────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────

/// Errors from oracle calls.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Oracle rate limit exceeded")]
    RateLimited,
    #[error("Oracle error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Malformed oracle response: {0}")]
    MalformedResponse(String),
    #[error("Invalid oracle endpoint: {0}")]
    InvalidEndpoint(String),
}

impl OracleError {
    /// Returns true if retrying the same call could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            OracleError::Http(e) => e.is_timeout() || e.is_connect(),
            OracleError::RateLimited => true,
            OracleError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────
// Candidate structure
// ─────────────────────────────────────────────────────────────────────

/// Which party in the source message made the promise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateParty {
    Sender,
    Recipient,
}

/// One candidate commitment as returned by the oracle.
///
/// This is the strict shape: entries missing required fields are dropped
/// during validation rather than trusted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateCommitment {
    /// Exact quoted commitment text from the message body.
    pub text: String,
    pub party: CandidateParty,
    /// Optional ISO due date as written by the oracle; parsed defensively
    /// downstream.
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub context: String,
    pub confidence: f64,
}

/// Candidates below this confidence are discarded.
pub const MIN_CONFIDENCE: f64 = 0.6;

/// Validate a raw oracle payload entry-by-entry.
///
/// Each entry is parsed independently so one malformed element drops only
/// itself, not the whole response. Entries with empty text or an
/// out-of-range confidence are rejected.
pub fn validate_candidates(raw: &[serde_json::Value]) -> Vec<CandidateCommitment> {
    let mut valid = Vec::with_capacity(raw.len());
    for value in raw {
        match serde_json::from_value::<CandidateCommitment>(value.clone()) {
            Ok(candidate) => {
                if candidate.text.trim().is_empty() {
                    log::debug!("Dropping oracle candidate with empty text");
                    continue;
                }
                if !(0.0..=1.0).contains(&candidate.confidence) {
                    log::debug!(
                        "Dropping oracle candidate with confidence {}",
                        candidate.confidence
                    );
                    continue;
                }
                valid.push(candidate);
            }
            Err(e) => {
                log::debug!("Dropping malformed oracle candidate: {}", e);
            }
        }
    }
    valid
}

// ─────────────────────────────────────────────────────────────────────
// Trait + implementations
// ─────────────────────────────────────────────────────────────────────

/// A stateless commitment-classification oracle.
#[async_trait]
pub trait CommitmentOracle: Send + Sync {
    /// Classify one message. Implementations return only validated
    /// candidates; callers still apply the confidence threshold.
    async fn extract(&self, request: &OracleRequest) -> Result<Vec<CandidateCommitment>, OracleError>;
}

/// Oracle that never finds commitments. Used when extraction is disabled
/// and as a test stand-in.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopOracle;

#[async_trait]
impl CommitmentOracle for NoopOracle {
    async fn extract(
        &self,
        _request: &OracleRequest,
    ) -> Result<Vec<CandidateCommitment>, OracleError> {
        Ok(Vec::new())
    }
}

/// Call the oracle with bounded retries.
///
/// A call that still fails after `max_attempts` is treated as "no
/// commitments found" for that message — one bad message never fails the
/// contact.
pub async fn extract_with_retry(
    oracle: &dyn CommitmentOracle,
    request: &OracleRequest,
    max_attempts: u32,
) -> Vec<CandidateCommitment> {
    let attempts = max_attempts.max(1);
    for attempt in 1..=attempts {
        match oracle.extract(request).await {
            Ok(candidates) => return candidates,
            Err(e) if e.is_retryable() && attempt < attempts => {
                log::warn!(
                    "Oracle retry {}/{} for message {}: {}",
                    attempt,
                    attempts,
                    request.message_id,
                    e
                );
                tokio::time::sleep(std::time::Duration::from_millis(
                    250 * u64::from(attempt),
                ))
                .await;
            }
            Err(e) => {
                log::warn!(
                    "Oracle failed for message {} (treating as no commitments): {}",
                    request.message_id,
                    e
                );
                return Vec::new();
            }
        }
    }
    Vec::new()
}
