//! Commitment extraction and lifecycle.
//!
//! Candidates come from the oracle; this module filters qualifying
//! messages, converts surviving candidates into `Commitment` records with
//! stable ids, and drives the monotonic status lifecycle
//! (`pending → overdue → fulfilled`, with `fulfilled` terminal).

pub mod fulfillment;

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use sha2::{Digest, Sha256};

use crate::oracle::{CandidateCommitment, CandidateParty, MIN_CONFIDENCE};
use crate::types::{Commitment, CommitmentDirection, CommitmentStatus, Message};

/// Boilerplate markers that disqualify a message from oracle extraction.
/// These are bulk-mail tells, not conversation.
const AUTOMATED_MARKERS: &[&str] = &[
    "unsubscribe",
    "do not reply",
    "do-not-reply",
    "this is an automated",
    "view this email in your browser",
    "manage your preferences",
];

/// Stable id from the commitment's identifying inputs, so reruns over the
/// same messages produce the same ledger.
fn fingerprint(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update(b"|");
    }
    format!("{:x}", hasher.finalize())
}

/// Whether a message is worth an oracle call.
pub fn qualifies_for_extraction(message: &Message, min_body_chars: usize) -> bool {
    if message.body.trim().chars().count() < min_body_chars {
        return false;
    }
    let lowered = message.body.to_lowercase();
    !AUTOMATED_MARKERS.iter().any(|m| lowered.contains(m))
}

/// Parse an oracle-supplied due date defensively. Invalid dates become
/// `None`, never an error.
pub fn parse_due_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(23, 59, 59).map(|dt| dt.and_utc());
    }
    None
}

/// Convert validated oracle candidates for one message into commitments.
///
/// Candidates below the confidence threshold are discarded. Direction is
/// `outbound` when the promising party is the user; a due date already in
/// the past makes the initial status `overdue`.
pub fn build_commitments(
    candidates: &[CandidateCommitment],
    message: &Message,
    now: DateTime<Utc>,
) -> Vec<Commitment> {
    candidates
        .iter()
        .filter(|c| c.confidence >= MIN_CONFIDENCE)
        .map(|candidate| {
            let promiser_is_user = match candidate.party {
                CandidateParty::Sender => message.is_from_user,
                CandidateParty::Recipient => !message.is_from_user,
            };
            let direction = if promiser_is_user {
                CommitmentDirection::Outbound
            } else {
                CommitmentDirection::Inbound
            };

            let due_date = candidate.due_date.as_deref().and_then(parse_due_date);
            let status = match due_date {
                Some(due) if due < now => CommitmentStatus::Overdue,
                _ => CommitmentStatus::Pending,
            };

            let party_tag = match candidate.party {
                CandidateParty::Sender => "sender",
                CandidateParty::Recipient => "recipient",
            };

            Commitment {
                id: fingerprint(&[&message.id, &candidate.text, party_tag]),
                direction,
                text: candidate.text.clone(),
                context: candidate.context.clone(),
                source_message_id: message.id.clone(),
                source_subject: message.subject.clone(),
                source_date: message.timestamp,
                detected_at: now,
                due_date,
                status,
                fulfilled_at: None,
                confidence: candidate.confidence,
            }
        })
        .collect()
}

/// Re-evaluate open commitments against the contact's message history.
///
/// Two passes per commitment, both monotonic:
/// 1. `pending → overdue` when the due date has passed.
/// 2. open → `fulfilled` when a later message references the commitment's
///    source and carries a fulfillment phrase.
///
/// `fulfilled` entries are never revisited.
pub fn refresh_statuses(commitments: &mut [Commitment], messages: &[Message], now: DateTime<Utc>) {
    let threads_by_id: HashMap<&str, &str> = messages
        .iter()
        .map(|m| (m.id.as_str(), m.thread_id.as_str()))
        .collect();

    for commitment in commitments.iter_mut() {
        if commitment.status == CommitmentStatus::Fulfilled {
            continue;
        }

        if commitment.status == CommitmentStatus::Pending {
            if let Some(due) = commitment.due_date {
                if due < now {
                    commitment.status = CommitmentStatus::Overdue;
                }
            }
        }

        let source_thread = threads_by_id.get(commitment.source_message_id.as_str()).copied();
        let fulfilled = messages.iter().any(|message| {
            message.timestamp > commitment.source_date
                && fulfillment::references_commitment(commitment, source_thread, message)
                && fulfillment::has_fulfillment_phrase(&message.body)
        });

        if fulfilled {
            commitment.status = CommitmentStatus::Fulfilled;
            commitment.fulfilled_at = Some(now);
        }
    }
}
