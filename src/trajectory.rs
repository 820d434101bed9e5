//! Trajectory metrics derived from a contact's window series.
//!
//! Pure computation — no clock access. "Now" is an explicit argument so a
//! rerun over the same input is bit-identical.

use chrono::{DateTime, Utc};

use crate::types::{Message, TimeSeriesPoint, Trajectory};

/// Velocity regression looks at this many most-recent windows.
const VELOCITY_WINDOWS: usize = 8;

/// Acceleration needs at least this many windows to split meaningfully.
const MIN_ACCELERATION_WINDOWS: usize = 6;

/// Bounds for the normal-contact-interval estimate, in days.
const MIN_CONTACT_INTERVAL_DAYS: f64 = 1.0;
const MAX_CONTACT_INTERVAL_DAYS: f64 = 180.0;

/// Fallback interval when fewer than 2 active windows exist.
const DEFAULT_CONTACT_INTERVAL_DAYS: f64 = 30.0;

/// Ordinary least squares slope of `values` against their indices.
/// Returns 0 for fewer than 2 points.
fn slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let n_f = n as f64;
    let mean_x = (n_f - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n_f;

    let mut num = 0.0;
    let mut den = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        num += dx * (y - mean_y);
        den += dx * dx;
    }
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

/// Messages-per-window slope over the last [`VELOCITY_WINDOWS`] windows.
pub fn velocity(series: &[TimeSeriesPoint]) -> f64 {
    let counts: Vec<f64> = series
        .iter()
        .rev()
        .take(VELOCITY_WINDOWS)
        .rev()
        .map(|p| p.total_messages as f64)
        .collect();
    slope(&counts)
}

/// Change in velocity between the two halves of the series.
/// Returns 0 when the series is too short to split.
pub fn acceleration(series: &[TimeSeriesPoint]) -> f64 {
    if series.len() < MIN_ACCELERATION_WINDOWS {
        return 0.0;
    }
    let mid = series.len() / 2;
    velocity(&series[mid..]) - velocity(&series[..mid])
}

/// Median days between consecutive active windows, clamped to
/// [1, 180]. Defaults to 30 with fewer than 2 active windows.
pub fn normal_contact_interval_days(series: &[TimeSeriesPoint]) -> f64 {
    let active_starts: Vec<DateTime<Utc>> = series
        .iter()
        .filter(|p| p.is_active())
        .map(|p| p.period_start)
        .collect();

    if active_starts.len() < 2 {
        return DEFAULT_CONTACT_INTERVAL_DAYS;
    }

    let mut gaps: Vec<f64> = active_starts
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).num_days() as f64)
        .collect();
    gaps.sort_by(|a, b| a.partial_cmp(b).expect("gap days are finite"));

    let mid = gaps.len() / 2;
    let median = if gaps.len() % 2 == 1 {
        gaps[mid]
    } else {
        (gaps[mid - 1] + gaps[mid]) / 2.0
    };

    median.clamp(MIN_CONTACT_INTERVAL_DAYS, MAX_CONTACT_INTERVAL_DAYS)
}

/// Days between `now` and the most recent message.
///
/// Uses the raw message list rather than the windowed series so recency is
/// not rounded to a window boundary.
pub fn days_since_last_contact(messages: &[Message], now: DateTime<Utc>) -> i64 {
    messages
        .iter()
        .map(|m| m.timestamp)
        .max()
        .map(|last| (now - last).num_days().max(0))
        .unwrap_or(0)
}

/// Compute the full trajectory for one contact.
pub fn compute(series: &[TimeSeriesPoint], messages: &[Message], now: DateTime<Utc>) -> Trajectory {
    let avg_messages_per_week = if series.is_empty() {
        0.0
    } else {
        series.iter().map(|p| p.total_messages as f64).sum::<f64>() / series.len() as f64
    };

    let latencies: Vec<f64> = series
        .iter()
        .filter_map(|p| p.avg_response_minutes)
        .collect();
    let avg_response_minutes = if latencies.is_empty() {
        None
    } else {
        Some(latencies.iter().sum::<f64>() / latencies.len() as f64)
    };

    let user_initiated: u32 = series.iter().map(|p| p.initiated_by_user).sum();
    let total_initiated: u32 = series
        .iter()
        .map(|p| p.initiated_by_user + p.initiated_by_contact)
        .sum();
    let initiation_ratio = if total_initiated == 0 {
        0.0
    } else {
        f64::from(user_initiated) / f64::from(total_initiated)
    };

    Trajectory {
        velocity: velocity(series),
        acceleration: acceleration(series),
        avg_messages_per_week,
        avg_response_minutes,
        normal_contact_interval_days: normal_contact_interval_days(series),
        days_since_last_contact: days_since_last_contact(messages, now),
        initiation_ratio,
    }
}
