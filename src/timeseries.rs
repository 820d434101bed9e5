//! Weekly activity time series for one contact.
//!
//! Buckets a contact's messages into fixed-width Monday-anchored windows
//! and zero-fills every window between first and last activity, so the
//! series never has calendar gaps. The full series is rebuilt from scratch
//! each run.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, Duration, Utc};

use crate::types::{Message, TimeSeriesPoint};

/// Default window width in days.
pub const WINDOW_DAYS: i64 = 7;

/// A reply more than this far after the previous message is not treated as
/// a response (thread necromancy, not a real reply).
const MAX_REPLY_GAP_DAYS: i64 = 7;

/// Midnight UTC on the Monday of the week containing `ts`.
pub fn week_start(ts: DateTime<Utc>) -> DateTime<Utc> {
    let date = ts.date_naive();
    let monday = date - Duration::days(date.weekday().num_days_from_monday() as i64);
    monday
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always valid")
        .and_utc()
}

/// Build the gap-free window series for one contact's messages.
///
/// `messages` must all belong to the same contact; order does not matter.
/// Returns an empty series for an empty message set.
pub fn build_series(messages: &[Message]) -> Vec<TimeSeriesPoint> {
    build_series_with_window(messages, WINDOW_DAYS)
}

/// Same as [`build_series`] with an explicit window width in days.
///
/// Windows step from the Monday of the earliest message's week, so the
/// default width yields calendar weeks.
pub fn build_series_with_window(messages: &[Message], window_days: i64) -> Vec<TimeSeriesPoint> {
    if messages.is_empty() || window_days <= 0 {
        return Vec::new();
    }

    let (Some(first), Some(last)) = (
        messages.iter().map(|m| m.timestamp).min(),
        messages.iter().map(|m| m.timestamp).max(),
    ) else {
        return Vec::new();
    };
    let anchor = week_start(first);

    let window_of = |ts: DateTime<Utc>| -> i64 { (ts - anchor).num_days() / window_days };
    let last_window = window_of(last);

    // Accumulators per window index.
    #[derive(Default)]
    struct Accum {
        sent: u32,
        received: u32,
        latency_samples: Vec<f64>,
        initiated_by_user: u32,
        initiated_by_contact: u32,
    }
    let mut windows: BTreeMap<i64, Accum> = BTreeMap::new();

    for message in messages {
        let accum = windows.entry(window_of(message.timestamp)).or_default();
        if message.is_from_user {
            accum.sent += 1;
        } else {
            accum.received += 1;
        }
    }

    // Group per thread for latency pairs and initiation attribution.
    let mut threads: HashMap<&str, Vec<&Message>> = HashMap::new();
    for message in messages {
        threads.entry(message.thread_id.as_str()).or_default().push(message);
    }

    for thread in threads.values_mut() {
        thread.sort_by_key(|m| m.timestamp);

        // A latency sample is one user/contact alternation within the
        // thread, attributed to the window of the reply.
        for pair in thread.windows(2) {
            let (prev, cur) = (pair[0], pair[1]);
            if prev.is_from_user == cur.is_from_user {
                continue;
            }
            let gap = cur.timestamp - prev.timestamp;
            if gap > Duration::days(MAX_REPLY_GAP_DAYS) {
                continue;
            }
            let minutes = gap.num_seconds() as f64 / 60.0;
            windows
                .entry(window_of(cur.timestamp))
                .or_default()
                .latency_samples
                .push(minutes);
        }

        // Initiation: the earliest message per thread per window decides
        // who drove the conversation in that window.
        let mut earliest_in_window: BTreeMap<i64, &Message> = BTreeMap::new();
        for message in thread.iter() {
            earliest_in_window
                .entry(window_of(message.timestamp))
                .or_insert(message);
        }
        for (idx, message) in earliest_in_window {
            let accum = windows.entry(idx).or_default();
            if message.is_from_user {
                accum.initiated_by_user += 1;
            } else {
                accum.initiated_by_contact += 1;
            }
        }
    }

    // Emit every window from 0..=last_window, zero-filled where inactive.
    (0..=last_window)
        .map(|idx| {
            let start = anchor + Duration::days(idx * window_days);
            let end = start + Duration::days(window_days);
            match windows.get(&idx) {
                Some(accum) => {
                    let avg_latency = if accum.latency_samples.is_empty() {
                        None
                    } else {
                        Some(
                            accum.latency_samples.iter().sum::<f64>()
                                / accum.latency_samples.len() as f64,
                        )
                    };
                    TimeSeriesPoint {
                        period_start: start,
                        period_end: end,
                        messages_sent: accum.sent,
                        messages_received: accum.received,
                        total_messages: accum.sent + accum.received,
                        avg_response_minutes: avg_latency,
                        initiated_by_user: accum.initiated_by_user,
                        initiated_by_contact: accum.initiated_by_contact,
                        sentiment: None,
                    }
                }
                None => TimeSeriesPoint::empty(start, end),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn msg(id: &str, thread: &str, from_user: bool, day: u32, hour: u32) -> Message {
        Message {
            id: id.to_string(),
            thread_id: thread.to_string(),
            from: if from_user {
                "me@corp.com".to_string()
            } else {
                "sarah@acme.com".to_string()
            },
            to: vec![if from_user {
                "sarah@acme.com".to_string()
            } else {
                "me@corp.com".to_string()
            }],
            cc: Vec::new(),
            subject: "Project".to_string(),
            body: String::new(),
            // March 2026: the 2nd is a Monday.
            timestamp: Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap(),
            is_from_user: from_user,
            labels: Vec::new(),
        }
    }

    #[test]
    fn test_week_start_is_monday() {
        let wednesday = Utc.with_ymd_and_hms(2026, 3, 4, 15, 30, 0).unwrap();
        let monday = week_start(wednesday);
        assert_eq!(monday, Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap());
        // A Monday maps to itself.
        assert_eq!(week_start(monday), monday);
    }

    #[test]
    fn test_empty_messages_empty_series() {
        assert!(build_series(&[]).is_empty());
    }

    #[test]
    fn test_no_calendar_gaps() {
        // Messages in week 0 and week 3; weeks 1-2 must be zero-filled.
        let messages = vec![msg("m1", "t1", false, 2, 9), msg("m2", "t2", true, 24, 9)];
        let series = build_series(&messages);
        assert_eq!(series.len(), 4);
        for pair in series.windows(2) {
            assert_eq!(pair[1].period_start, pair[0].period_start + Duration::days(7));
            assert_eq!(pair[0].period_end, pair[1].period_start);
        }
        assert_eq!(series[1].total_messages, 0);
        assert_eq!(series[2].total_messages, 0);
        assert!(series[1].avg_response_minutes.is_none());
    }

    #[test]
    fn test_sent_received_counts() {
        let messages = vec![
            msg("m1", "t1", false, 2, 9),
            msg("m2", "t1", true, 2, 10),
            msg("m3", "t2", true, 3, 9),
        ];
        let series = build_series(&messages);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].messages_received, 1);
        assert_eq!(series[0].messages_sent, 2);
        assert_eq!(series[0].total_messages, 3);
    }

    #[test]
    fn test_latency_from_alternating_reply() {
        // Contact writes at 09:00, user replies at 10:30 → 90 minutes.
        let mut messages = vec![msg("m1", "t1", false, 2, 9), msg("m2", "t1", true, 2, 10)];
        messages[1].timestamp = Utc.with_ymd_and_hms(2026, 3, 2, 10, 30, 0).unwrap();

        let series = build_series(&messages);
        let latency = series[0].avg_response_minutes.unwrap();
        assert!((latency - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_latency_ignores_same_sender_runs() {
        let messages = vec![msg("m1", "t1", true, 2, 9), msg("m2", "t1", true, 2, 10)];
        let series = build_series(&messages);
        assert!(series[0].avg_response_minutes.is_none());
    }

    #[test]
    fn test_latency_ignores_stale_reply() {
        // Reply 9 days later is not a real response.
        let messages = vec![msg("m1", "t1", false, 2, 9), msg("m2", "t1", true, 11, 9)];
        let series = build_series(&messages);
        for point in &series {
            assert!(point.avg_response_minutes.is_none());
        }
    }

    #[test]
    fn test_initiation_earliest_per_thread_per_window() {
        let messages = vec![
            // Thread t1: contact speaks first this week.
            msg("m1", "t1", false, 2, 9),
            msg("m2", "t1", true, 2, 10),
            // Thread t2: user opens it the same week.
            msg("m3", "t2", true, 4, 9),
            // Thread t1 again next week: user speaks first in that window.
            msg("m4", "t1", true, 9, 9),
        ];
        let series = build_series(&messages);
        assert_eq!(series[0].initiated_by_contact, 1);
        assert_eq!(series[0].initiated_by_user, 1);
        assert_eq!(series[1].initiated_by_user, 1);
        assert_eq!(series[1].initiated_by_contact, 0);
    }
}
