//! Proof layer for shuffle-verified private aggregation.
//!
//! This crate contains:
//! - Field helpers and the polynomial fingerprint used for multiset equality.
//! - The Poseidon commitment binding a client's hidden values, natively and in-circuit.
//! - Client-side preparation: secret splitting, rank encoding, dummy padding.
//! - R1CS circuits for threshold-sum aggregation and ranked voting.
//! - A proof-system capability trait with a Groth16 implementation.
//! - The shuffler relay and the server-side consistency check.

pub mod circuit;
pub mod client;
pub mod commitment;
pub mod constants;
pub mod error;
pub mod field;
pub mod fingerprint;
pub mod groth16;
pub mod messages;
pub mod padding;
pub mod proof_system;
pub mod rank;
pub mod shuffler;
pub mod split;
pub mod verifier;

pub use ark_bn254::Fr;
pub use error::ZkError;
