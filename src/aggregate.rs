//! RelationshipMap assembly.
//!
//! Sorts relationships worst-first (ascending health score) so at-risk
//! contacts surface at the top, partitions them into status buckets, and
//! computes map-level statistics.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::types::{HealthStatus, Relationship, RelationshipMap, RelationshipStats};

/// |velocity| beyond this counts as growing/declining in map stats.
const TREND_VELOCITY: f64 = 0.2;

/// Assemble the final map from per-contact relationships.
pub fn build_map(mut relationships: Vec<Relationship>, computed_at: DateTime<Utc>) -> RelationshipMap {
    // Ascending score; ties broken by email so output order is stable.
    relationships.sort_by(|a, b| {
        a.score
            .cmp(&b.score)
            .then_with(|| a.person.email.cmp(&b.person.email))
    });

    let mut buckets: BTreeMap<HealthStatus, Vec<String>> = BTreeMap::new();
    for relationship in &relationships {
        buckets
            .entry(relationship.status)
            .or_default()
            .push(relationship.person.email.clone());
    }

    let stats = compute_stats(&relationships);

    RelationshipMap {
        relationships,
        buckets,
        stats,
        computed_at,
    }
}

fn compute_stats(relationships: &[Relationship]) -> RelationshipStats {
    let open_commitments: usize = relationships.iter().map(|r| r.open_commitments.len()).sum();
    let overdue_commitments: usize = relationships
        .iter()
        .flat_map(|r| r.open_commitments.iter())
        .filter(|c| c.is_overdue())
        .count();

    let latencies: Vec<f64> = relationships
        .iter()
        .filter_map(|r| r.trajectory.avg_response_minutes)
        .collect();
    let avg_response_minutes = if latencies.is_empty() {
        None
    } else {
        Some(latencies.iter().sum::<f64>() / latencies.len() as f64)
    };

    let avg_messages_per_week = if relationships.is_empty() {
        0.0
    } else {
        relationships
            .iter()
            .map(|r| r.trajectory.avg_messages_per_week)
            .sum::<f64>()
            / relationships.len() as f64
    };

    RelationshipStats {
        total_relationships: relationships.len(),
        open_commitments,
        overdue_commitments,
        avg_response_minutes,
        avg_messages_per_week,
        growing: relationships
            .iter()
            .filter(|r| r.trajectory.velocity > TREND_VELOCITY)
            .count(),
        declining: relationships
            .iter()
            .filter(|r| r.trajectory.velocity < -TREND_VELOCITY)
            .count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Person, Prediction, Trajectory, Urgency};
    use chrono::TimeZone;

    fn relationship(email: &str, score: u8, status: HealthStatus, velocity: f64) -> Relationship {
        let ts = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
        Relationship {
            person: Person {
                email: email.to_string(),
                name: None,
                domain: email.split('@').nth(1).unwrap_or("").to_string(),
                company: None,
            },
            trajectory: Trajectory {
                velocity,
                acceleration: 0.0,
                avg_messages_per_week: 2.0,
                avg_response_minutes: Some(60.0),
                normal_contact_interval_days: 7.0,
                days_since_last_contact: 3,
                initiation_ratio: 0.5,
            },
            commitments: Vec::new(),
            open_commitments: Vec::new(),
            status,
            score,
            prediction: Prediction {
                horizon_days: 30,
                predicted_status: status,
                days_until_dormant: None,
                days_until_status_change: None,
                confidence: 0.5,
                urgency: Urgency::None,
                recommendation: String::new(),
            },
            first_interaction: ts,
            last_interaction: ts,
            total_messages: 10,
        }
    }

    #[test]
    fn test_sorted_ascending_by_score() {
        let map = build_map(
            vec![
                relationship("healthy@acme.com", 85, HealthStatus::Thriving, 0.8),
                relationship("risky@bigcorp.io", 25, HealthStatus::AtRisk, -0.5),
                relationship("fine@acme.com", 55, HealthStatus::Stable, 0.0),
            ],
            Utc::now(),
        );
        let scores: Vec<u8> = map.relationships.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![25, 55, 85]);
        assert_eq!(map.relationships[0].person.email, "risky@bigcorp.io");
    }

    #[test]
    fn test_ties_broken_by_email() {
        let map = build_map(
            vec![
                relationship("b@acme.com", 50, HealthStatus::Stable, 0.0),
                relationship("a@acme.com", 50, HealthStatus::Stable, 0.0),
            ],
            Utc::now(),
        );
        assert_eq!(map.relationships[0].person.email, "a@acme.com");
    }

    #[test]
    fn test_buckets_by_status() {
        let map = build_map(
            vec![
                relationship("a@acme.com", 85, HealthStatus::Thriving, 0.8),
                relationship("b@acme.com", 25, HealthStatus::AtRisk, -0.5),
                relationship("c@acme.com", 30, HealthStatus::AtRisk, -0.4),
            ],
            Utc::now(),
        );
        assert_eq!(map.buckets[&HealthStatus::AtRisk].len(), 2);
        assert_eq!(map.buckets[&HealthStatus::Thriving], vec!["a@acme.com"]);
        assert!(!map.buckets.contains_key(&HealthStatus::Dormant));
    }

    #[test]
    fn test_stats_trends_and_averages() {
        let map = build_map(
            vec![
                relationship("a@acme.com", 85, HealthStatus::Thriving, 0.8),
                relationship("b@acme.com", 25, HealthStatus::AtRisk, -0.5),
                relationship("c@acme.com", 55, HealthStatus::Stable, 0.1),
            ],
            Utc::now(),
        );
        assert_eq!(map.stats.total_relationships, 3);
        assert_eq!(map.stats.growing, 1);
        assert_eq!(map.stats.declining, 1);
        assert_eq!(map.stats.avg_response_minutes, Some(60.0));
        assert!((map.stats.avg_messages_per_week - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_map() {
        let now = Utc::now();
        let map = build_map(Vec::new(), now);
        assert!(map.relationships.is_empty());
        assert!(map.buckets.is_empty());
        assert_eq!(map.stats.total_relationships, 0);
        assert_eq!(map.computed_at, now);
    }
}
