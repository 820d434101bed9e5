//! Fuzzy fulfillment-evidence matching.
//!
//! Pure predicates over (commitment, later message). These are heuristics
//! with known precision/recall tradeoffs: a short quoted text plus generic
//! phrases like "sent" will over-detect, and fulfillment phrased in novel
//! words will under-detect. The lifecycle updater consumes these as-is;
//! status transition rules live in `super`, not here.

use crate::types::{Commitment, Message};

/// Phrases that usually accompany delivery of a promised item.
const FULFILLMENT_PHRASES: &[&str] = &[
    "attached",
    "as promised",
    "sent",
    "completed",
    "following up",
    "here is the",
    "here's the",
];

/// How much of the commitment text participates in the prefix match.
const PREFIX_MATCH_CHARS: usize = 24;

/// Whether `message` plausibly refers back to the commitment's source:
/// same thread, overlapping subject, or a case-insensitive prefix overlap
/// on the commitment text itself.
pub fn references_commitment(
    commitment: &Commitment,
    source_thread_id: Option<&str>,
    message: &Message,
) -> bool {
    if let Some(thread_id) = source_thread_id {
        if message.thread_id == thread_id {
            return true;
        }
    }

    if subjects_overlap(&commitment.source_subject, &message.subject) {
        return true;
    }

    let prefix: String = commitment
        .text
        .to_lowercase()
        .chars()
        .take(PREFIX_MATCH_CHARS)
        .collect();
    !prefix.trim().is_empty() && message.body.to_lowercase().contains(prefix.trim())
}

/// Whether a message body contains a fulfillment-indicating phrase.
pub fn has_fulfillment_phrase(body: &str) -> bool {
    let lowered = body.to_lowercase();
    FULFILLMENT_PHRASES.iter().any(|p| lowered.contains(p))
}

/// Case-insensitive subject overlap, ignoring reply/forward prefixes.
fn subjects_overlap(a: &str, b: &str) -> bool {
    let a = normalize_subject(a);
    let b = normalize_subject(b);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a == b || a.contains(&b) || b.contains(&a)
}

fn normalize_subject(subject: &str) -> String {
    let mut s = subject.trim().to_lowercase();
    loop {
        let stripped = s
            .strip_prefix("re:")
            .or_else(|| s.strip_prefix("fwd:"))
            .or_else(|| s.strip_prefix("fw:"));
        match stripped {
            Some(rest) => s = rest.trim_start().to_string(),
            None => return s,
        }
    }
}
