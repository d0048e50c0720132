//! Per-round outcome, communication cost and timing.

use crate::tally::TallyMatrix;
use chrono::{DateTime, Utc};
use serde::Serialize;
use shuffle_proofs::constants::{CHALLENGE_SIZE, COMMITMENT_SIZE, FIELD_ELEMENT_SIZE};
use shuffle_proofs::field::serde_fr;
use shuffle_proofs::messages::ClientId;
use shuffle_proofs::rank::CandidateId;
use shuffle_proofs::Fr;
use std::time::Duration;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoundOutcome {
    Sum {
        #[serde(with = "serde_fr")]
        total: Fr,
        /// `total` as an integer, when it fits.
        total_u64: Option<u64>,
    },
    Vote {
        tally: TallyMatrix,
        winner: Option<CandidateId>,
    },
}

impl RoundOutcome {
    pub fn sum(&self) -> Option<u64> {
        match self {
            RoundOutcome::Sum { total_u64, .. } => *total_u64,
            RoundOutcome::Vote { .. } => None,
        }
    }

    pub fn winner(&self) -> Option<CandidateId> {
        match self {
            RoundOutcome::Vote { winner, .. } => *winner,
            RoundOutcome::Sum { .. } => None,
        }
    }

    pub fn tally(&self) -> Option<&TallyMatrix> {
        match self {
            RoundOutcome::Vote { tally, .. } => Some(tally),
            RoundOutcome::Sum { .. } => None,
        }
    }
}

/// A sampled client whose proof could not be produced or evaluated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProofFailure {
    pub client: ClientId,
    pub reason: String,
}

/// Bytes, per client unless noted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CostReport {
    /// Storage, once per round.
    pub proving_key: usize,
    pub proof: usize,
    pub public_witness: usize,
    pub commitment: usize,
    pub challenge: usize,
    pub dummies: usize,
}

impl CostReport {
    pub fn new(proving_key: usize, proof: usize, public_witness: usize, dummies_per_client: usize) -> Self {
        Self {
            proving_key,
            proof,
            public_witness,
            commitment: COMMITMENT_SIZE,
            challenge: CHALLENGE_SIZE,
            dummies: dummies_per_client * FIELD_ELEMENT_SIZE,
        }
    }

    pub fn proof_related(&self) -> usize {
        self.proof
    }

    pub fn total(&self) -> usize {
        self.proof + self.public_witness + self.commitment + self.challenge + self.dummies
    }

    pub fn other(&self) -> usize {
        self.total() - self.proof_related()
    }
}

/// Amortised timings in milliseconds.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TimingReport {
    /// Client preparation, per client.
    pub client_preparation_ms: f64,
    /// Proof generation, per sampled proof.
    pub client_proving_ms: f64,
    /// Server work other than proof verification, per client.
    pub server_other_ms: f64,
    /// Proof verification, per sampled proof.
    pub server_verification_ms: f64,
}

impl TimingReport {
    pub fn client_total_ms(&self) -> f64 {
        self.client_preparation_ms + self.client_proving_ms
    }

    pub fn server_total_ms(&self) -> f64 {
        self.server_other_ms + self.server_verification_ms
    }
}

/// Amortise `total` over `count` items, in milliseconds.
pub fn per_item_ms(total: Duration, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    total.as_secs_f64() * 1000.0 / count as f64
}

/// Only produced for rounds whose shuffled batch matched the published fingerprints.
#[derive(Clone, Debug, Serialize)]
pub struct RoundReport {
    pub round_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub backend: &'static str,
    pub clients: usize,
    pub corrupted: usize,
    pub dummies_per_client: usize,
    pub sampled: Vec<ClientId>,
    pub verified: Vec<ClientId>,
    pub proof_failures: Vec<ProofFailure>,
    pub outcome: RoundOutcome,
    pub costs: CostReport,
    pub timings: TimingReport,
}

impl RoundReport {
    pub fn log(&self) {
        let round_id = self.round_id;
        tracing::info!(
            %round_id,
            backend = self.backend,
            honest = self.clients - self.corrupted,
            sampled = self.sampled.len(),
            verified = self.verified.len(),
            failures = self.proof_failures.len(),
            "round finished"
        );
        tracing::info!(
            %round_id,
            proof = self.costs.proof,
            public_witness = self.costs.public_witness,
            commitment = self.costs.commitment,
            challenge = self.costs.challenge,
            dummies = self.costs.dummies,
            proof_related = self.costs.proof_related(),
            other = self.costs.other(),
            total = self.costs.total(),
            proving_key = self.costs.proving_key,
            "communication cost (bytes)"
        );
        tracing::info!(
            %round_id,
            preparation = self.timings.client_preparation_ms,
            proving = self.timings.client_proving_ms,
            client_total = self.timings.client_total_ms(),
            server_other = self.timings.server_other_ms,
            verification = self.timings.server_verification_ms,
            server_total = self.timings.server_total_ms(),
            "amortised time (ms)"
        );
    }
}
