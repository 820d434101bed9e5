//! Extraction run orchestration.
//!
//! Groups a user's messages per contact, then runs the per-contact
//! pipeline (series → trajectory → commitments → classification →
//! prediction) across a bounded-concurrency pool: contacts are processed
//! in batches with a short pause between batches so the oracle's rate
//! limits are respected. A failing or panicking contact is logged and
//! skipped; the run always returns a (possibly partial) map.
//!
//! "Now" is an explicit argument: given the same input and the same now,
//! the run is deterministic apart from the timestamp fields.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::task::JoinSet;

use crate::aggregate;
use crate::commitments;
use crate::config::EngineConfig;
use crate::contacts::{group_by_contact, ExclusionRules};
use crate::error::EngineError;
use crate::health;
use crate::oracle::{extract_with_retry, CommitmentOracle, NoopOracle, OracleRequest};
use crate::predictor;
use crate::timeseries;
use crate::trajectory;
use crate::types::{Commitment, Message, Person, Relationship, RelationshipMap};

/// The relationship engine. The oracle handle is injected by the caller,
/// which owns its lifecycle.
pub struct RelationshipEngine {
    config: Arc<EngineConfig>,
    oracle: Arc<dyn CommitmentOracle>,
}

impl RelationshipEngine {
    pub fn new(config: EngineConfig, oracle: Arc<dyn CommitmentOracle>) -> Self {
        Self {
            config: Arc::new(config),
            oracle,
        }
    }

    /// Engine without an oracle — commitment ledgers come out empty.
    pub fn with_noop_oracle(config: EngineConfig) -> Self {
        Self::new(config, Arc::new(NoopOracle))
    }

    /// Run a full extraction and produce an immutable snapshot.
    ///
    /// Blocks (asynchronously) until every contact batch has finished or
    /// the configured deadline truncates the remainder. With no messages
    /// at all, returns an empty map.
    pub async fn compute(
        &self,
        user_email: &str,
        messages: &[Message],
        now: DateTime<Utc>,
    ) -> RelationshipMap {
        if messages.is_empty() {
            log::info!("No messages supplied; returning empty relationship map");
            return RelationshipMap::empty(now);
        }

        let rules = ExclusionRules::from_config(&self.config);
        let groups = group_by_contact(messages, user_email, &rules);

        let contacts: Vec<(String, Vec<Message>)> = groups
            .into_iter()
            .filter(|(email, group)| {
                if group.len() < self.config.min_messages {
                    log::debug!(
                        "Excluding {} ({} messages < threshold {})",
                        email,
                        group.len(),
                        self.config.min_messages
                    );
                    false
                } else {
                    true
                }
            })
            .collect();

        log::info!(
            "Extraction run: {} contacts after grouping and thresholding",
            contacts.len()
        );

        let started = Instant::now();
        let deadline = self.config.deadline_ms.map(Duration::from_millis);
        let mut relationships = Vec::with_capacity(contacts.len());

        let batch_size = self.config.batch_size.max(1);
        let total_batches = contacts.len().div_ceil(batch_size);

        for (batch_idx, batch) in contacts.chunks(batch_size).enumerate() {
            if let Some(limit) = deadline {
                if started.elapsed() >= limit {
                    let remaining: usize = contacts.len() - batch_idx * batch_size;
                    log::warn!(
                        "Deadline reached after {:?}; truncating {} remaining contacts",
                        started.elapsed(),
                        remaining
                    );
                    break;
                }
            }

            let mut tasks: JoinSet<(String, Result<Relationship, EngineError>)> = JoinSet::new();
            for (email, group) in batch {
                let email = email.clone();
                let group = group.clone();
                let config = Arc::clone(&self.config);
                let oracle = Arc::clone(&self.oracle);
                tasks.spawn(async move {
                    let result = build_relationship(&email, group, &config, oracle, now).await;
                    (email, result)
                });
            }

            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((_, Ok(relationship))) => relationships.push(relationship),
                    Ok((email, Err(e))) => {
                        log::warn!("Skipping contact {}: {}", email, e);
                    }
                    Err(join_err) => {
                        log::warn!("Skipping contact after task failure: {}", join_err);
                    }
                }
            }

            if batch_idx + 1 < total_batches && self.config.batch_pause_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.batch_pause_ms)).await;
            }
        }

        aggregate::build_map(relationships, now)
    }
}

/// The per-contact pipeline. Contact-local state only — nothing here is
/// shared across contacts.
async fn build_relationship(
    contact_email: &str,
    messages: Vec<Message>,
    config: &EngineConfig,
    oracle: Arc<dyn CommitmentOracle>,
    now: DateTime<Utc>,
) -> Result<Relationship, EngineError> {
    if messages.is_empty() {
        return Err(EngineError::EmptyContact(contact_email.to_string()));
    }

    let person = resolve_person(contact_email, &messages);

    let series = timeseries::build_series(&messages);
    let trajectory = trajectory::compute(&series, &messages, now);

    let mut all_commitments: Vec<Commitment> = Vec::new();
    if config.extract_commitments {
        let cutoff = now - chrono::Duration::days(config.commitment_lookback_days);
        for message in &messages {
            if message.timestamp < cutoff {
                continue;
            }
            if !commitments::qualifies_for_extraction(message, config.min_commitment_body_chars) {
                continue;
            }
            let request = OracleRequest::from_message(message);
            let max_attempts = config.oracle.as_ref().map(|o| o.max_attempts).unwrap_or(3);
            let candidates = extract_with_retry(oracle.as_ref(), &request, max_attempts).await;
            all_commitments.extend(commitments::build_commitments(&candidates, message, now));
        }
        commitments::refresh_statuses(&mut all_commitments, &messages, now);
    }

    let open_commitments: Vec<Commitment> = all_commitments
        .iter()
        .filter(|c| c.is_open())
        .cloned()
        .collect();

    let status = health::classify(&trajectory, &open_commitments, series.len());
    let score = health::score(&trajectory, status, &open_commitments);
    let prediction = predictor::predict(
        &trajectory,
        status,
        &open_commitments,
        series.len(),
        config.prediction_horizon_days,
    );

    let first_interaction = messages.iter().map(|m| m.timestamp).min().unwrap_or(now);
    let last_interaction = messages.iter().map(|m| m.timestamp).max().unwrap_or(now);

    Ok(Relationship {
        person,
        trajectory,
        commitments: all_commitments,
        open_commitments,
        status,
        score,
        prediction,
        first_interaction,
        last_interaction,
        total_messages: messages.len(),
    })
}

/// Canonical Person for a contact group.
///
/// Prefers a `From:` header carrying a display name; falls back to the
/// bare canonical email.
fn resolve_person(contact_email: &str, messages: &[Message]) -> Person {
    messages
        .iter()
        .filter(|m| !m.is_from_user)
        .filter_map(|m| Person::resolve(&m.from))
        .find(|p| p.email == contact_email && p.name.is_some())
        .or_else(|| Person::resolve(contact_email))
        .unwrap_or_else(|| Person {
            email: contact_email.to_string(),
            name: None,
            domain: contact_email.split('@').nth(1).unwrap_or("").to_string(),
            company: None,
        })
}
