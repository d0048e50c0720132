//! Server-side round state machine.
//!
//! ```text
//! Committing --issue_challenge--> Challenged --receive_batch--> Verifying --finalize--> Finalized
//! ```
//!
//! Every message is only accepted in its own phase. The challenge is drawn only once all
//! commitments are in, and the verification sample is fixed together with it.

use crate::errors::AggregatorError;
use chrono::{DateTime, Utc};
use rand::seq::index::sample;
use rand::{CryptoRng, RngCore};
use serde::Serialize;
use shuffle_proofs::field::random_element;
use shuffle_proofs::messages::{
    ClientCommitMessage, ClientId, ClientSubmitMessage, ServerChallengeMessage, ShufflerOutputMessage,
};
use shuffle_proofs::Fr;
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Committing,
    Challenged,
    Verifying,
    Finalized,
}

pub struct Round {
    id: Uuid,
    started_at: DateTime<Utc>,
    clients: usize,
    phase: Phase,
    commitments: BTreeMap<ClientId, Fr>,
    challenge: Option<Fr>,
    sampled: BTreeSet<ClientId>,
    submissions: BTreeMap<ClientId, ClientSubmitMessage>,
    batch: Option<ShufflerOutputMessage>,
}

impl Round {
    pub fn new(clients: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            clients,
            phase: Phase::Committing,
            commitments: BTreeMap::new(),
            challenge: None,
            sampled: BTreeSet::new(),
            submissions: BTreeMap::new(),
            batch: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn clients(&self) -> usize {
        self.clients
    }

    fn require(&self, phase: Phase, operation: &'static str) -> Result<(), AggregatorError> {
        if self.phase != phase {
            return Err(AggregatorError::OutOfPhase { operation, phase: self.phase });
        }
        Ok(())
    }

    fn require_known(&self, client: ClientId) -> Result<(), AggregatorError> {
        if client >= self.clients {
            return Err(AggregatorError::UnknownClient(client));
        }
        Ok(())
    }

    pub fn receive_commitment(&mut self, msg: ClientCommitMessage) -> Result<(), AggregatorError> {
        self.require(Phase::Committing, "commitment")?;
        self.require_known(msg.client)?;
        if self.commitments.contains_key(&msg.client) {
            return Err(AggregatorError::DuplicateCommitment(msg.client));
        }
        self.commitments.insert(msg.client, msg.commitment);
        Ok(())
    }

    /// Draw the challenge and the verification sample.
    ///
    /// Returns one challenge message per client, indexed by client id.
    pub fn issue_challenge<R: RngCore + CryptoRng>(
        &mut self,
        sample_size: usize,
        rng: &mut R,
    ) -> Result<Vec<ServerChallengeMessage>, AggregatorError> {
        self.require(Phase::Committing, "challenge")?;
        if self.commitments.len() != self.clients {
            return Err(AggregatorError::OutOfPhase { operation: "challenge", phase: self.phase });
        }

        let challenge = random_element(rng);
        let amount = sample_size.min(self.clients);
        self.sampled = sample(rng, self.clients, amount).into_iter().collect();
        self.challenge = Some(challenge);
        self.phase = Phase::Challenged;

        Ok((0..self.clients)
            .map(|client| ServerChallengeMessage {
                round_id: self.id,
                challenge,
                proof_requested: self.sampled.contains(&client),
            })
            .collect())
    }

    pub fn receive_submission(&mut self, msg: ClientSubmitMessage) -> Result<(), AggregatorError> {
        self.require(Phase::Challenged, "submission")?;
        self.require_known(msg.client)?;
        if self.submissions.contains_key(&msg.client) {
            return Err(AggregatorError::DuplicateSubmission(msg.client));
        }
        self.submissions.insert(msg.client, msg);
        Ok(())
    }

    /// Accept the shuffler's output. Every client must have submitted first.
    pub fn receive_batch(&mut self, batch: ShufflerOutputMessage) -> Result<(), AggregatorError> {
        self.require(Phase::Challenged, "shuffled batch")?;
        if self.submissions.len() != self.clients {
            return Err(AggregatorError::OutOfPhase { operation: "shuffled batch", phase: self.phase });
        }
        self.batch = Some(batch);
        self.phase = Phase::Verifying;
        Ok(())
    }

    pub fn finalize(&mut self) -> Result<(), AggregatorError> {
        self.require(Phase::Verifying, "finalize")?;
        self.phase = Phase::Finalized;
        Ok(())
    }

    pub fn challenge(&self) -> Option<Fr> {
        self.challenge
    }

    pub fn sampled(&self) -> &BTreeSet<ClientId> {
        &self.sampled
    }

    pub fn commitment(&self, client: ClientId) -> Option<Fr> {
        self.commitments.get(&client).copied()
    }

    pub fn submission(&self, client: ClientId) -> Option<&ClientSubmitMessage> {
        self.submissions.get(&client)
    }

    pub fn public_fingerprints(&self) -> Vec<Fr> {
        self.submissions.values().map(|s| s.public_fingerprint).collect()
    }

    pub fn batch(&self) -> Option<&ShufflerOutputMessage> {
        self.batch.as_ref()
    }
}
