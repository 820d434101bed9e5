//! HTTP implementation of the commitment oracle.
//!
//! POSTs the bounded prompt to a configured endpoint with optional bearer
//! auth and parses the structured candidate list. Transient failures are
//! retried with exponential backoff; a Retry-After header is honored.

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use super::prompt::OracleRequest;
use super::{validate_candidates, CandidateCommitment, CommitmentOracle, OracleError};
use crate::config::OracleConfig;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 250,
            max_backoff_ms: 2_000,
        }
    }
}

fn retry_delay(attempt: u32, policy: &RetryPolicy, retry_after: Option<&reqwest::header::HeaderValue>) -> Duration {
    if let Some(value) = retry_after.and_then(|v| v.to_str().ok()) {
        if let Ok(secs) = value.parse::<u64>() {
            return Duration::from_secs(secs.min(30));
        }
    }

    let exponent = 2u64.saturating_pow(attempt.saturating_sub(1));
    let base = policy
        .initial_backoff_ms
        .saturating_mul(exponent)
        .min(policy.max_backoff_ms);
    Duration::from_millis(base)
}

fn status_is_retryable(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

/// Send a request with retries on transient failures.
async fn send_with_retry(
    request: reqwest::RequestBuilder,
    policy: &RetryPolicy,
) -> Result<reqwest::Response, OracleError> {
    let attempts = policy.max_attempts.max(1);
    for attempt in 1..=attempts {
        let Some(cloned) = request.try_clone() else {
            return request.send().await.map_err(OracleError::Http);
        };

        match cloned.send().await {
            Ok(response) => {
                let status = response.status();
                if status_is_retryable(status) && attempt < attempts {
                    let delay = retry_delay(
                        attempt,
                        policy,
                        response.headers().get(reqwest::header::RETRY_AFTER),
                    );
                    log::warn!(
                        "oracle retry {}/{} after status {} (sleep {:?})",
                        attempt,
                        attempts,
                        status,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                return Ok(response);
            }
            Err(err) => {
                let retryable_transport = err.is_timeout() || err.is_connect();
                if retryable_transport && attempt < attempts {
                    let delay = retry_delay(attempt, policy, None);
                    log::warn!(
                        "oracle retry {}/{} after transport error: {} (sleep {:?})",
                        attempt,
                        attempts,
                        err,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                return Err(OracleError::Http(err));
            }
        }
    }

    Err(OracleError::RateLimited)
}

/// Oracle client for a JSON-over-HTTP classification endpoint.
pub struct HttpOracle {
    client: reqwest::Client,
    endpoint: Url,
    api_key: Option<String>,
    policy: RetryPolicy,
}

impl HttpOracle {
    pub fn new(endpoint: &str, api_key: Option<String>) -> Result<Self, OracleError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| OracleError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
            policy: RetryPolicy::default(),
        })
    }

    /// Build from the config section, applying its timeout and attempts.
    pub fn from_config(config: &OracleConfig) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|e| OracleError::InvalidEndpoint(format!("{}: {}", config.endpoint, e)))?;
        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key.clone(),
            policy: RetryPolicy {
                max_attempts: config.max_attempts,
                ..RetryPolicy::default()
            },
        })
    }

    fn parse_response(&self, body: &serde_json::Value) -> Vec<CandidateCommitment> {
        let raw = body
            .get("commitments")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();
        validate_candidates(&raw)
    }
}

#[async_trait]
impl CommitmentOracle for HttpOracle {
    async fn extract(
        &self,
        request: &OracleRequest,
    ) -> Result<Vec<CandidateCommitment>, OracleError> {
        let mut builder = self
            .client
            .post(self.endpoint.clone())
            .json(&serde_json::json!({ "prompt": request.prompt }));
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = send_with_retry(builder, &self.policy).await?;
        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(OracleError::RateLimited);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(OracleError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| OracleError::MalformedResponse(e.to_string()))?;
        Ok(self.parse_response(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_invalid_endpoint_rejected() {
        assert!(matches!(
            HttpOracle::new("not a url", None),
            Err(OracleError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_parse_response_shape() {
        let oracle = HttpOracle::new("https://oracle.internal/v1/classify", None).unwrap();
        let body = json!({
            "commitments": [
                {"text": "I'll send the deck tomorrow", "party": "sender", "confidence": 0.9},
                {"text": "", "party": "sender", "confidence": 0.9}
            ]
        });
        let candidates = oracle.parse_response(&body);
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn test_parse_response_missing_array_is_empty() {
        let oracle = HttpOracle::new("https://oracle.internal/v1/classify", None).unwrap();
        assert!(oracle.parse_response(&json!({})).is_empty());
        assert!(oracle.parse_response(&json!({"commitments": "nope"})).is_empty());
    }

    #[test]
    fn test_retry_delay_honors_retry_after() {
        let policy = RetryPolicy::default();
        let header = reqwest::header::HeaderValue::from_static("5");
        assert_eq!(retry_delay(1, &policy, Some(&header)), Duration::from_secs(5));
    }

    #[test]
    fn test_retry_delay_backoff_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(retry_delay(1, &policy, None), Duration::from_millis(250));
        assert_eq!(retry_delay(2, &policy, None), Duration::from_millis(500));
        assert_eq!(retry_delay(10, &policy, None), Duration::from_millis(2_000));
    }
}
