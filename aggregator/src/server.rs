//! The aggregation server: drives a round end to end and reports the aggregate.
//!
//! Steps per round:
//! 1) collect every commitment,
//! 2) broadcast the challenge and fix the verification sample,
//! 3) collect public fingerprints, sampled proofs and the shuffled batch,
//! 4) check the batch against the fingerprints,
//! 5) verify the sampled proofs in parallel,
//! 6) aggregate the shuffled plaintext values.
//!
//! A fingerprint mismatch or a rejected proof fails the whole round. A sampled client
//! whose proof cannot be produced or evaluated is only dropped from the sample.

use crate::clients::{self, ClientInput, Direct, Uplink};
use crate::config::{ProtocolConfig, Variant};
use crate::errors::{AggregatorError, ProtocolViolation};
use crate::keys::{CircuitShape, KeyStore, Keys};
use crate::report::{per_item_ms, CostReport, ProofFailure, RoundOutcome, RoundReport, TimingReport};
use crate::round::Round;
use crate::tally::TallyMatrix;
use rand::rngs::OsRng;
use shuffle_proofs::client::Contribution;
use shuffle_proofs::field::{sum, to_u64};
use shuffle_proofs::messages::{ClientId, ShuffledValues, ShufflerOutputMessage};
use shuffle_proofs::proof_system::ProofSystem;
use shuffle_proofs::rank::{process_pairs, Ranking};
use shuffle_proofs::shuffler::{Relay, ShuffledBatch, Shuffler};
use shuffle_proofs::verifier;
use shuffle_proofs::Fr;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

type ItemOf<I> = <<I as ClientInput>::Contribution as Contribution>::Item;

pub struct AggregationServer<P: ProofSystem> {
    config: ProtocolConfig,
    dummies: usize,
    keys: KeyStore<P>,
}

impl<P: ProofSystem> AggregationServer<P> {
    pub fn new(config: ProtocolConfig) -> Result<Self, AggregatorError> {
        config.validate()?;
        let dummies = config.dummies_per_client()?;
        let keys = KeyStore::new(CircuitShape::from(&config.variant), config.key_dir.clone());
        Ok(Self { config, dummies, keys })
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn dummies_per_client(&self) -> usize {
        self.dummies
    }

    /// Run key setup ahead of the first round.
    pub async fn ensure_keys(&self) -> Result<Keys<P>, AggregatorError> {
        self.keys.ensure_keys().await
    }

    /// Threshold-sum round through an honest shuffler.
    pub async fn run_sum_round(&self, secrets: Vec<u64>) -> Result<RoundReport, AggregatorError> {
        self.run_round(secrets, &mut Shuffler::from_entropy()).await
    }

    /// Ranked-vote round through an honest shuffler.
    pub async fn run_vote_round(&self, rankings: Vec<Ranking>) -> Result<RoundReport, AggregatorError> {
        self.run_round(rankings, &mut Shuffler::from_entropy()).await
    }

    /// Run one round with one input per configured client, relayed through `relay`.
    pub async fn run_round<I, R>(&self, inputs: Vec<I>, relay: &mut R) -> Result<RoundReport, AggregatorError>
    where
        I: ClientInput,
        R: Relay<ItemOf<I>>,
        ShufflerOutputMessage: From<ShuffledBatch<ItemOf<I>>>,
    {
        self.run_round_with(inputs, relay, &mut Direct).await
    }

    /// As [`Self::run_round`], with client submissions delivered through `uplink`.
    pub async fn run_round_with<I, R, U>(
        &self,
        inputs: Vec<I>,
        relay: &mut R,
        uplink: &mut U,
    ) -> Result<RoundReport, AggregatorError>
    where
        I: ClientInput,
        R: Relay<ItemOf<I>>,
        U: Uplink,
        ShufflerOutputMessage: From<ShuffledBatch<ItemOf<I>>>,
    {
        let n = self.config.clients;
        if inputs.len() != n {
            return Err(AggregatorError::MalformedInput(format!(
                "expected {n} client inputs, got {}",
                inputs.len()
            )));
        }

        let keys = self.keys.ensure_keys().await?;

        let mut round = Round::new(n);
        let round_id = round.id();
        info!(%round_id, clients = n, dummies = self.dummies, variant = ?self.config.variant, "round started");

        let prepared = clients::prepare(inputs, &self.config.variant, self.dummies).await?;

        // --- Commit / challenge ---
        let mut server_time = Duration::ZERO;
        let t = Instant::now();
        for client in &prepared.clients {
            round.receive_commitment(client.commit_message())?;
        }
        let challenges = round.issue_challenge(self.config.sample_size(), &mut OsRng)?;
        let challenge = round
            .challenge()
            .ok_or_else(|| AggregatorError::Internal("challenge missing after issue".into()))?;
        server_time += t.elapsed();
        debug!(%round_id, sampled = ?round.sampled(), "challenge issued");

        // --- Submit ---
        let responses = clients::respond::<_, P>(&prepared.clients, &challenges, keys.pk.clone()).await?;

        let mut client_time = prepared.elapsed;
        let mut proving_time = Duration::ZERO;
        let mut proof_bytes = 0;
        let mut failures = Vec::new();
        for response in responses {
            client_time += response.preparation_time;
            proving_time += response.proving_time;
            let message = uplink.deliver(response.message);
            if let Some(envelope) = &message.proof {
                proof_bytes = envelope.proof_bytes();
            }
            if let Some(reason) = response.proof_failure {
                failures.push(ProofFailure { client: message.client, reason });
            }
            round.receive_submission(message)?;
        }

        let bundles = prepared.clients.iter().map(|c| c.bundle()).collect();
        let batch = ShufflerOutputMessage::from(relay.relay(bundles));

        // --- Consistency ---
        let t = Instant::now();
        round.receive_batch(batch)?;
        let batch = round
            .batch()
            .ok_or_else(|| AggregatorError::Internal("batch missing after receipt".into()))?;
        let values = self.decode_values(&batch.values)?;
        if !verifier::check(&values, &batch.dummies, challenge, &round.public_fingerprints()) {
            warn!(%round_id, "shuffled batch does not match public fingerprints");
            return Err(ProtocolViolation::FingerprintMismatch.into());
        }
        server_time += t.elapsed();
        debug!(%round_id, values = values.len(), dummies = batch.dummies.len(), "batch consistent");

        // --- Verify ---
        let t = Instant::now();
        let verified = self.verify_sampled(&round, challenge, &keys, &mut failures).await?;
        let verification_time = t.elapsed();

        // --- Aggregate ---
        let t = Instant::now();
        let outcome = self.aggregate(&batch.values, n)?;
        round.finalize()?;
        server_time += t.elapsed();

        let sampled: Vec<ClientId> = round.sampled().iter().copied().collect();
        let report = RoundReport {
            round_id,
            started_at: round.started_at(),
            backend: P::NAME,
            clients: n,
            corrupted: self.config.corrupted,
            dummies_per_client: self.dummies,
            costs: CostReport::new(
                P::proving_key_size(&keys.pk),
                proof_bytes,
                P::public_witness_size(&self.public_inputs(challenge, Fr::from(0u64), Fr::from(0u64))),
                self.dummies,
            ),
            timings: TimingReport {
                client_preparation_ms: per_item_ms(client_time, n),
                client_proving_ms: per_item_ms(proving_time, sampled.len()),
                server_other_ms: per_item_ms(server_time, n),
                server_verification_ms: per_item_ms(verification_time, sampled.len()),
            },
            sampled,
            verified,
            proof_failures: failures,
            outcome,
        };
        report.log();
        Ok(report)
    }

    /// Public inputs the server expects, in circuit allocation order.
    fn public_inputs(&self, challenge: Fr, public_fingerprint: Fr, commitment: Fr) -> Vec<Fr> {
        match self.config.variant {
            Variant::Sum { threshold, .. } => {
                vec![Fr::from(threshold), challenge, public_fingerprint, commitment]
            }
            Variant::Vote { .. } => vec![challenge, public_fingerprint, commitment],
        }
    }

    /// Field encoding of the shuffled values, as fingerprinted by the clients.
    fn decode_values(&self, values: &ShuffledValues) -> Result<Vec<Fr>, AggregatorError> {
        match (&self.config.variant, values) {
            (Variant::Sum { .. }, ShuffledValues::Shares(shares)) => Ok(shares.0.clone()),
            (Variant::Vote { candidates }, ShuffledValues::Pairs(pairs)) => {
                // Out-of-range pairs could alias a valid encoding.
                if let Some(p) = pairs.iter().find(|p| p.winner >= *candidates || p.loser >= *candidates) {
                    return Err(ProtocolViolation::MalformedBatch(format!(
                        "pair ({}, {}) is out of range for {candidates} candidates",
                        p.winner, p.loser
                    ))
                    .into());
                }
                Ok(process_pairs(pairs, *candidates))
            }
            _ => Err(ProtocolViolation::MalformedBatch("values do not match the round variant".into()).into()),
        }
    }

    async fn verify_sampled(
        &self,
        round: &Round,
        challenge: Fr,
        keys: &Keys<P>,
        failures: &mut Vec<ProofFailure>,
    ) -> Result<Vec<ClientId>, AggregatorError> {
        let mut handles = Vec::new();
        for &client in round.sampled() {
            if failures.iter().any(|f| f.client == client) {
                continue;
            }
            let submission = round.submission(client).ok_or(AggregatorError::UnknownClient(client))?;
            let commitment = round.commitment(client).ok_or(AggregatorError::UnknownClient(client))?;

            let Some(envelope) = &submission.proof else {
                failures.push(ProofFailure { client, reason: "no proof submitted".into() });
                continue;
            };

            let expected = self.public_inputs(challenge, submission.public_fingerprint, commitment);
            if envelope.public_inputs != expected {
                return Err(ProtocolViolation::PublicInputMismatch { client }.into());
            }

            let proof = match envelope.decode::<P>() {
                Ok(proof) => proof,
                Err(e) => {
                    failures.push(ProofFailure { client, reason: e.to_string() });
                    continue;
                }
            };

            let vk = keys.vk.clone();
            handles.push((client, tokio::task::spawn_blocking(move || P::verify(&vk, &proof, &expected))));
        }

        let mut verified = Vec::with_capacity(handles.len());
        for (client, handle) in handles {
            match handle.await? {
                Ok(true) => verified.push(client),
                Ok(false) => {
                    warn!(client, "sampled proof rejected");
                    return Err(ProtocolViolation::ProofRejected { client }.into());
                }
                Err(e) => {
                    warn!(client, error = %e, "sampled proof could not be verified");
                    failures.push(ProofFailure { client, reason: e.to_string() });
                }
            }
        }
        Ok(verified)
    }

    fn aggregate(&self, values: &ShuffledValues, voters: usize) -> Result<RoundOutcome, AggregatorError> {
        match (&self.config.variant, values) {
            (Variant::Sum { .. }, ShuffledValues::Shares(shares)) => {
                let total = sum(&shares.0);
                Ok(RoundOutcome::Sum { total, total_u64: to_u64(&total) })
            }
            (Variant::Vote { candidates }, ShuffledValues::Pairs(pairs)) => {
                let tally = TallyMatrix::from_pairs(pairs, *candidates)?;
                let inconsistent = tally.inconsistent_pairs(voters as u64);
                if !inconsistent.is_empty() {
                    warn!(?inconsistent, voters, "pairwise comparison counts do not add up to the voter count");
                }
                let winner = tally.sole_winner(voters as u64);
                Ok(RoundOutcome::Vote { tally, winner })
            }
            _ => Err(ProtocolViolation::MalformedBatch("values do not match the round variant".into()).into()),
        }
    }
}
