//! Tideline: relationship trajectory and commitment tracking.
//!
//! Turns a user's normalized message history into, per external contact, a
//! gap-free weekly activity series, trajectory metrics, a deterministic
//! health classification with score, a forward health prediction, and a
//! commitment ledger — assembled into one immutable `RelationshipMap`
//! snapshot per run.
//!
//! The text-classification oracle used for commitment extraction is an
//! external service behind the [`oracle::CommitmentOracle`] trait; the
//! engine validates its output and degrades gracefully when it fails.

pub mod aggregate;
pub mod commitments;
pub mod config;
pub mod contacts;
pub mod engine;
pub mod error;
pub mod health;
pub mod json_loader;
pub mod oracle;
pub mod predictor;
pub mod timeseries;
pub mod trajectory;
pub mod types;

pub use config::EngineConfig;
pub use engine::RelationshipEngine;
pub use error::EngineError;
pub use types::{
    Commitment, CommitmentDirection, CommitmentStatus, HealthStatus, Message, Person, Prediction,
    Relationship, RelationshipMap, TimeSeriesPoint, Trajectory, Urgency,
};
