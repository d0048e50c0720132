//! Orchestration for shuffle-verified private aggregation.
//!
//! The server collects commitments, issues a challenge, receives fingerprints, sampled
//! proofs and the shuffled batch, checks the batch against the fingerprints and
//! aggregates. Client work runs on blocking threads, one task per client.

pub mod clients;
pub mod config;
pub mod errors;
pub mod keys;
pub mod report;
pub mod round;
pub mod server;
pub mod tally;
pub mod telemetry;

pub use config::{ProtocolConfig, Variant};
pub use errors::{AggregatorError, ProtocolViolation};
pub use report::{RoundOutcome, RoundReport};
pub use server::AggregationServer;
