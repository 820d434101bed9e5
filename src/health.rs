//! Health classification for one relationship.
//!
//! A deterministic state machine over (trajectory, open commitments) plus
//! an additive 0-100 score. Rules are evaluated strictly in priority order;
//! the first match wins.

use crate::types::{Commitment, CommitmentDirection, HealthStatus, Trajectory};

/// Minimum series length before any classification beyond `new`.
const MIN_SERIES_POINTS: usize = 3;

/// Velocity below which an overdue outbound commitment flags risk.
const AT_RISK_VELOCITY: f64 = -0.3;

const THRIVING_VELOCITY: f64 = 0.5;
const THRIVING_MIN_WEEKLY: f64 = 2.0;
const STRONG_VELOCITY: f64 = 0.2;
const STRONG_MIN_WEEKLY: f64 = 1.0;
const STABLE_VELOCITY_BAND: f64 = 0.2;
const DECAYING_VELOCITY: f64 = -0.5;

/// Days of silence after which a contact is dormant, as a function of its
/// normal cadence. Capped so even slow-cadence contacts dormant out at 90.
pub fn dormancy_threshold_days(normal_contact_interval_days: f64) -> f64 {
    (3.0 * normal_contact_interval_days).min(90.0)
}

/// Classify one relationship.
///
/// `data_points` is the window-series length; `open_commitments` is the
/// pending/overdue subset.
pub fn classify(
    trajectory: &Trajectory,
    open_commitments: &[Commitment],
    data_points: usize,
) -> HealthStatus {
    if data_points < MIN_SERIES_POINTS {
        return HealthStatus::New;
    }

    let days_since = trajectory.days_since_last_contact as f64;
    if days_since > dormancy_threshold_days(trajectory.normal_contact_interval_days) {
        return HealthStatus::Dormant;
    }

    let overdue_outbound = open_commitments
        .iter()
        .any(|c| c.is_overdue() && c.direction == CommitmentDirection::Outbound);
    let v = trajectory.velocity;

    if overdue_outbound && v < AT_RISK_VELOCITY {
        return HealthStatus::AtRisk;
    }

    if v > THRIVING_VELOCITY && trajectory.avg_messages_per_week > THRIVING_MIN_WEEKLY {
        return HealthStatus::Thriving;
    }

    if v > STRONG_VELOCITY || (v >= 0.0 && trajectory.avg_messages_per_week > STRONG_MIN_WEEKLY) {
        return HealthStatus::Strong;
    }

    if (-STABLE_VELOCITY_BAND..=STABLE_VELOCITY_BAND).contains(&v) {
        return HealthStatus::Stable;
    }

    if v < DECAYING_VELOCITY {
        return HealthStatus::Decaying;
    }

    HealthStatus::Cooling
}

/// Additive health score, clamped to [0, 100].
///
/// Starts at 50; velocity, recency, activity level and overdue commitments
/// adjust it; status ceilings/floors are applied last.
pub fn score(
    trajectory: &Trajectory,
    status: HealthStatus,
    open_commitments: &[Commitment],
) -> u8 {
    let mut score = 50.0;

    // Velocity: ±20, proportional.
    score += (trajectory.velocity * 20.0).clamp(-20.0, 20.0);

    // Recency vs. normal cadence.
    let normal = trajectory.normal_contact_interval_days;
    let days_since = trajectory.days_since_last_contact as f64;
    if days_since < normal {
        score += 10.0;
    } else if days_since > 2.0 * normal {
        score -= 20.0;
    } else if days_since >= 1.5 * normal {
        score -= 10.0;
    }

    // Activity level.
    if trajectory.avg_messages_per_week >= 3.0 {
        score += 10.0;
    } else if trajectory.avg_messages_per_week < 0.5 {
        score -= 10.0;
    }

    // Each overdue commitment drags the score down.
    let overdue = open_commitments.iter().filter(|c| c.is_overdue()).count();
    score -= 10.0 * overdue as f64;

    // Status ceilings/floors.
    match status {
        HealthStatus::Dormant => score = score.min(20.0),
        HealthStatus::AtRisk => score = score.min(30.0),
        HealthStatus::Thriving => score = score.max(80.0),
        _ => {}
    }

    score.round().clamp(0.0, 100.0) as u8
}
