//! Shared data model for the relationship engine.
//!
//! Everything here is a plain serde payload: the engine rebuilds the full
//! `RelationshipMap` from scratch on every run, so none of these types carry
//! mutable identity beyond the contact email.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────
// People and messages
// ─────────────────────────────────────────────────────────────────────

/// A canonical external contact, derived per run from message headers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    /// Canonical lower-cased email address.
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub domain: String,
    /// Inferred organization (domain with `www` and TLD stripped).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

/// A normalized message record supplied by the email source.
///
/// Read-only input. The engine tolerates duplicate ids and unsorted
/// arrival; both are handled during grouping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub thread_id: String,
    pub from: String,
    pub to: Vec<String>,
    #[serde(default)]
    pub cc: Vec<String>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
    pub timestamp: DateTime<Utc>,
    pub is_from_user: bool,
    #[serde(default)]
    pub labels: Vec<String>,
}

// ─────────────────────────────────────────────────────────────────────
// Time series
// ─────────────────────────────────────────────────────────────────────

/// One fixed-width activity window for a contact.
///
/// The builder emits one point for every window between first and last
/// observed activity — zero-filled when the window had no messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesPoint {
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub messages_sent: u32,
    pub messages_received: u32,
    pub total_messages: u32,
    /// Mean reply latency observed in this window, in minutes. `None` when
    /// no reply pair landed in the window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_response_minutes: Option<f64>,
    pub initiated_by_user: u32,
    pub initiated_by_contact: u32,
    /// Placeholder — populated only when a sentiment source exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<f64>,
}

impl TimeSeriesPoint {
    /// A zero-activity point covering `[start, end)`.
    pub fn empty(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            period_start: start,
            period_end: end,
            messages_sent: 0,
            messages_received: 0,
            total_messages: 0,
            avg_response_minutes: None,
            initiated_by_user: 0,
            initiated_by_contact: 0,
            sentiment: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.total_messages > 0
    }
}

// ─────────────────────────────────────────────────────────────────────
// Commitments
// ─────────────────────────────────────────────────────────────────────

/// Who made the promise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitmentDirection {
    /// Promise made by the user to the contact.
    Outbound,
    /// Promise made by the contact to the user.
    Inbound,
}

/// Lifecycle status. Transitions are append-only and monotonic:
/// `pending → overdue` when the due date passes, `pending → fulfilled` and
/// `overdue → fulfilled` on fulfillment evidence. `fulfilled` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitmentStatus {
    Pending,
    Overdue,
    Fulfilled,
}

/// A detected promise, created once during extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commitment {
    /// Stable fingerprint of (source message, quoted text, party) so reruns
    /// over the same messages produce the same id.
    pub id: String,
    pub direction: CommitmentDirection,
    /// Exact quoted commitment text.
    pub text: String,
    /// Short surrounding context from the source message.
    pub context: String,
    pub source_message_id: String,
    pub source_subject: String,
    pub source_date: DateTime<Utc>,
    pub detected_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    pub status: CommitmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fulfilled_at: Option<DateTime<Utc>>,
    /// Oracle confidence in [0, 1].
    pub confidence: f64,
}

impl Commitment {
    pub fn is_open(&self) -> bool {
        matches!(
            self.status,
            CommitmentStatus::Pending | CommitmentStatus::Overdue
        )
    }

    pub fn is_overdue(&self) -> bool {
        self.status == CommitmentStatus::Overdue
    }
}

// ─────────────────────────────────────────────────────────────────────
// Trajectory
// ─────────────────────────────────────────────────────────────────────

/// Derived activity metrics for one contact's time series.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trajectory {
    /// Regression slope of messages/window over the recent windows.
    pub velocity: f64,
    /// Second-half velocity minus first-half velocity.
    pub acceleration: f64,
    pub avg_messages_per_week: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_response_minutes: Option<f64>,
    /// Median days between consecutive active windows, clamped to [1, 180].
    pub normal_contact_interval_days: f64,
    /// Computed against the raw message list, not window boundaries.
    pub days_since_last_contact: i64,
    /// User-initiated threads / all initiated threads.
    pub initiation_ratio: f64,
}

// ─────────────────────────────────────────────────────────────────────
// Health + prediction
// ─────────────────────────────────────────────────────────────────────

/// Categorical relationship state. Variant order matters for bucket
/// ordering in the map (worst-first).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Dormant,
    AtRisk,
    Decaying,
    Cooling,
    Stable,
    Strong,
    Thriving,
    New,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dormant => "dormant",
            Self::AtRisk => "at_risk",
            Self::Decaying => "decaying",
            Self::Cooling => "cooling",
            Self::Stable => "stable",
            Self::Strong => "strong",
            Self::Thriving => "thriving",
            Self::New => "new",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Critical,
    High,
    Medium,
    Low,
    None,
}

/// Forward projection of a relationship's health.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub horizon_days: i64,
    pub predicted_status: HealthStatus,
    /// Days until the dormancy threshold is crossed at the current decay.
    /// `None` when velocity is non-negative.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_until_dormant: Option<i64>,
    /// First day-offset in [1, horizon] at which classification deviates
    /// from the current status. `None` when no deviation within horizon.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_until_status_change: Option<i64>,
    pub confidence: f64,
    pub urgency: Urgency,
    pub recommendation: String,
}

// ─────────────────────────────────────────────────────────────────────
// Relationship aggregate
// ─────────────────────────────────────────────────────────────────────

/// Aggregate root: one per (user, contact), rebuilt wholesale each run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub person: Person,
    pub trajectory: Trajectory,
    pub commitments: Vec<Commitment>,
    /// Pending/overdue subset of `commitments`.
    pub open_commitments: Vec<Commitment>,
    pub status: HealthStatus,
    /// Integer health score clamped to [0, 100].
    pub score: u8,
    pub prediction: Prediction,
    pub first_interaction: DateTime<Utc>,
    pub last_interaction: DateTime<Utc>,
    pub total_messages: usize,
}

/// Map-level statistics across all relationships.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipStats {
    pub total_relationships: usize,
    pub open_commitments: usize,
    pub overdue_commitments: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_response_minutes: Option<f64>,
    pub avg_messages_per_week: f64,
    /// Relationships with velocity > 0.2.
    pub growing: usize,
    /// Relationships with velocity < -0.2.
    pub declining: usize,
}

/// All relationships for a user: a sorted list (ascending health score, so
/// at-risk contacts surface first), status buckets, and summary stats.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipMap {
    pub relationships: Vec<Relationship>,
    /// Contact emails per status, in sorted-list order.
    pub buckets: BTreeMap<HealthStatus, Vec<String>>,
    pub stats: RelationshipStats,
    pub computed_at: DateTime<Utc>,
}

impl RelationshipMap {
    /// An empty snapshot — produced when there are no messages at all.
    pub fn empty(computed_at: DateTime<Utc>) -> Self {
        Self {
            relationships: Vec::new(),
            buckets: BTreeMap::new(),
            stats: RelationshipStats::default(),
            computed_at,
        }
    }
}
