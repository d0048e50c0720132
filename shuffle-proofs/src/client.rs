//! Client-side round state.
//!
//! A client prepares its contribution offline (shares or pair list, dummies, salt,
//! commitment), publishes the commitment, and after the challenge publishes its blinded
//! fingerprint, optionally a proof, and hands its plaintext values and dummies to the
//! shuffler.

use crate::circuit::{AggregationCircuit, RankedVoteCircuit, ThresholdSumCircuit};
use crate::commitment::commit;
use crate::error::ZkError;
use crate::field::random_element;
use crate::fingerprint::fingerprint;
use crate::messages::{ClientCommitMessage, ClientId, ClientSubmitMessage, ProofEnvelope};
use crate::padding::generate_mask;
use crate::proof_system::ProofSystem;
use crate::rank::{encode, process_pairs, CandidatePair, Ranking};
use crate::shuffler::ClientBundle;
use crate::split::{split, ShareVector};
use ark_bn254::Fr;
use rand::{CryptoRng, RngCore};
use std::fmt::Debug;

/// A client's hidden input for one aggregation variant.
pub trait Contribution: Send + Sync + 'static {
    /// Unit moved through the shuffler.
    type Item: Clone + Debug + Send + Sync + 'static;
    type Circuit: AggregationCircuit;

    /// Field encoding of the items, as committed and fingerprinted.
    fn committed_values(&self) -> Vec<Fr>;

    fn items(&self) -> Vec<Self::Item>;

    fn circuit(&self, blinding: &Blinding, commitment: Fr, challenge: Fr, public_fingerprint: Fr) -> Self::Circuit;
}

/// Threshold-sum input: additive shares of a scalar secret.
#[derive(Clone, Debug)]
pub struct SumContribution {
    shares: ShareVector,
    threshold: u64,
}

impl SumContribution {
    pub fn new<R: RngCore + CryptoRng + ?Sized>(
        secret: u64,
        shares: usize,
        threshold: u64,
        rng: &mut R,
    ) -> Result<Self, ZkError> {
        Ok(Self { shares: split(Fr::from(secret), shares, rng)?, threshold })
    }

    pub fn shares(&self) -> &ShareVector {
        &self.shares
    }
}

impl Contribution for SumContribution {
    type Item = Fr;
    type Circuit = ThresholdSumCircuit;

    fn committed_values(&self) -> Vec<Fr> {
        self.shares.shares().to_vec()
    }

    fn items(&self) -> Vec<Fr> {
        self.committed_values()
    }

    fn circuit(&self, blinding: &Blinding, commitment: Fr, challenge: Fr, public_fingerprint: Fr) -> ThresholdSumCircuit {
        ThresholdSumCircuit {
            threshold: Fr::from(self.threshold),
            challenge,
            public_fingerprint,
            commitment,
            shares: self.committed_values(),
            mask: blinding.mask,
            salt: blinding.salt,
        }
    }
}

/// Ranked-vote input: a ranking and the pair list derived from it.
#[derive(Clone, Debug)]
pub struct VoteContribution {
    ranking: Ranking,
    pairs: Vec<CandidatePair>,
}

impl VoteContribution {
    pub fn new(ranking: Ranking) -> Self {
        let pairs = encode(&ranking);
        Self { ranking, pairs }
    }

    pub fn ranking(&self) -> &Ranking {
        &self.ranking
    }

    pub fn pairs(&self) -> &[CandidatePair] {
        &self.pairs
    }
}

impl Contribution for VoteContribution {
    type Item = CandidatePair;
    type Circuit = RankedVoteCircuit;

    fn committed_values(&self) -> Vec<Fr> {
        process_pairs(&self.pairs, self.ranking.candidates())
    }

    fn items(&self) -> Vec<CandidatePair> {
        self.pairs.clone()
    }

    fn circuit(&self, blinding: &Blinding, commitment: Fr, challenge: Fr, public_fingerprint: Fr) -> RankedVoteCircuit {
        RankedVoteCircuit {
            candidates: self.ranking.candidates(),
            challenge,
            public_fingerprint,
            commitment,
            ranking: self.ranking.as_field_elements(),
            pairs: self
                .pairs
                .iter()
                .map(|p| (Fr::from(p.winner as u64), Fr::from(p.loser as u64)))
                .collect(),
            mask: blinding.mask,
            salt: blinding.salt,
        }
    }
}

/// Per-round blinding material. Never leaves the client except through the shuffler
/// (dummies) or inside a proof (mask, salt).
#[derive(Clone, Debug)]
pub struct Blinding {
    pub dummies: Vec<Fr>,
    pub mask: Fr,
    pub salt: Fr,
}

impl Blinding {
    pub fn generate<R: RngCore + CryptoRng + ?Sized>(dummies: usize, rng: &mut R) -> Self {
        let (dummies, mask) = generate_mask(dummies, rng);
        Self { dummies, mask, salt: random_element(rng) }
    }
}

pub struct ClientState<C: Contribution> {
    id: ClientId,
    contribution: C,
    blinding: Blinding,
    commitment: Fr,
}

impl<C: Contribution> ClientState<C> {
    /// Offline preparation: draw dummies and salt and commit.
    pub fn new<R: RngCore + CryptoRng + ?Sized>(
        id: ClientId,
        contribution: C,
        dummies: usize,
        rng: &mut R,
    ) -> Self {
        let blinding = Blinding::generate(dummies, rng);
        let commitment = commit(&contribution.committed_values(), &blinding.mask, &blinding.salt);
        Self { id, contribution, blinding, commitment }
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn contribution(&self) -> &C {
        &self.contribution
    }

    pub fn commitment(&self) -> Fr {
        self.commitment
    }

    pub fn dummy_count(&self) -> usize {
        self.blinding.dummies.len()
    }

    pub fn commit_message(&self) -> ClientCommitMessage {
        ClientCommitMessage { client: self.id, commitment: self.commitment }
    }

    /// `fingerprint(values, r) * mask`.
    pub fn public_fingerprint(&self, challenge: Fr) -> Fr {
        fingerprint(&self.contribution.committed_values(), challenge) * self.blinding.mask
    }

    /// Full circuit assignment (public inputs and witness) for `challenge`.
    pub fn build_assignment(&self, challenge: Fr) -> C::Circuit {
        self.contribution.circuit(
            &self.blinding,
            self.commitment,
            challenge,
            self.public_fingerprint(challenge),
        )
    }

    pub fn submit_message(&self, challenge: Fr) -> ClientSubmitMessage {
        ClientSubmitMessage::new(self.id, self.public_fingerprint(challenge))
    }

    pub fn prove<P: ProofSystem, R: RngCore + CryptoRng>(
        &self,
        pk: &P::ProvingKey,
        challenge: Fr,
        rng: &mut R,
    ) -> Result<ProofEnvelope, ZkError> {
        let (proof, public_inputs) = P::prove(pk, self.build_assignment(challenge), rng)?;
        tracing::debug!(client = self.id, backend = P::NAME, "proof generated");
        ProofEnvelope::new::<P>(&proof, public_inputs)
    }

    /// Plaintext values and dummies for the shuffler.
    pub fn bundle(&self) -> ClientBundle<C::Item> {
        ClientBundle { values: self.contribution.items(), dummies: self.blinding.dummies.clone() }
    }
}
