//! Concurrent client driver.
//!
//! Each client runs on its own blocking thread with its own RNG; nothing mutable is
//! shared between them. Proving keys are shared read-only.

use crate::config::Variant;
use crate::errors::AggregatorError;
use rand::rngs::OsRng;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use shuffle_proofs::client::{ClientState, Contribution, SumContribution, VoteContribution};
use shuffle_proofs::messages::{ClientSubmitMessage, ServerChallengeMessage};
use shuffle_proofs::proof_system::ProofSystem;
use shuffle_proofs::rank::Ranking;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A client's raw input for one variant.
pub trait ClientInput: Send + 'static {
    type Contribution: Contribution;

    fn into_contribution(
        self,
        variant: &Variant,
        rng: &mut ChaCha20Rng,
    ) -> Result<Self::Contribution, AggregatorError>;
}

/// A scalar secret for the threshold-sum variant.
impl ClientInput for u64 {
    type Contribution = SumContribution;

    fn into_contribution(
        self,
        variant: &Variant,
        rng: &mut ChaCha20Rng,
    ) -> Result<SumContribution, AggregatorError> {
        match variant {
            Variant::Sum { threshold, shares_per_client } => {
                Ok(SumContribution::new(self, *shares_per_client, *threshold, rng)?)
            }
            Variant::Vote { .. } => {
                Err(AggregatorError::MalformedInput("scalar secret submitted to a vote".into()))
            }
        }
    }
}

impl ClientInput for Ranking {
    type Contribution = VoteContribution;

    fn into_contribution(
        self,
        variant: &Variant,
        _rng: &mut ChaCha20Rng,
    ) -> Result<VoteContribution, AggregatorError> {
        match variant {
            Variant::Vote { candidates } if *candidates == self.candidates() => {
                Ok(VoteContribution::new(self))
            }
            Variant::Vote { candidates } => Err(AggregatorError::MalformedInput(format!(
                "ranking covers {} candidates, expected {candidates}",
                self.candidates()
            ))),
            Variant::Sum { .. } => {
                Err(AggregatorError::MalformedInput("ranking submitted to a sum".into()))
            }
        }
    }
}

pub struct PreparedClients<C: Contribution> {
    pub clients: Vec<Arc<ClientState<C>>>,
    /// Preparation time summed over all clients.
    pub elapsed: Duration,
}

/// Offline phase: contribution, dummies, salt and commitment for every client.
pub async fn prepare<I: ClientInput>(
    inputs: Vec<I>,
    variant: &Variant,
    dummies: usize,
) -> Result<PreparedClients<I::Contribution>, AggregatorError> {
    let mut handles = Vec::with_capacity(inputs.len());
    for (id, input) in inputs.into_iter().enumerate() {
        let variant = variant.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let start = Instant::now();
            let mut rng = ChaCha20Rng::from_entropy();
            let contribution = input.into_contribution(&variant, &mut rng)?;
            let state = ClientState::new(id, contribution, dummies, &mut rng);
            Ok::<_, AggregatorError>((state, start.elapsed()))
        }));
    }

    let mut clients = Vec::with_capacity(handles.len());
    let mut elapsed = Duration::ZERO;
    for handle in handles {
        let (state, took) = handle.await??;
        clients.push(Arc::new(state));
        elapsed += took;
    }

    Ok(PreparedClients { clients, elapsed })
}

/// What a client sends back after the challenge.
#[derive(Debug)]
pub struct ClientResponse {
    pub message: ClientSubmitMessage,
    /// Present when a proof was requested but could not be produced.
    pub proof_failure: Option<String>,
    pub proving_time: Duration,
    pub preparation_time: Duration,
}

/// Channel carrying submissions from the clients to the server.
pub trait Uplink: Send {
    fn deliver(&mut self, message: ClientSubmitMessage) -> ClientSubmitMessage;
}

/// Hands every submission over unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct Direct;

impl Uplink for Direct {
    fn deliver(&mut self, message: ClientSubmitMessage) -> ClientSubmitMessage {
        message
    }
}

/// Online phase: every client publishes its fingerprint; sampled clients also prove.
pub async fn respond<C, P>(
    clients: &[Arc<ClientState<C>>],
    challenges: &[ServerChallengeMessage],
    pk: Arc<P::ProvingKey>,
) -> Result<Vec<ClientResponse>, AggregatorError>
where
    C: Contribution,
    P: ProofSystem,
{
    if clients.len() != challenges.len() {
        return Err(AggregatorError::Internal(format!(
            "{} challenges for {} clients",
            challenges.len(),
            clients.len()
        )));
    }

    let mut handles = Vec::with_capacity(clients.len());
    for (client, challenge) in clients.iter().zip(challenges) {
        let client = client.clone();
        let challenge = challenge.clone();
        let pk = pk.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let start = Instant::now();
            let message = client.submit_message(challenge.challenge);
            let preparation_time = start.elapsed();

            if !challenge.proof_requested {
                return ClientResponse {
                    message,
                    proof_failure: None,
                    proving_time: Duration::ZERO,
                    preparation_time,
                };
            }

            // OS randomness so proofs are never deterministic.
            let start = Instant::now();
            let proved = client.prove::<P, _>(pk.as_ref(), challenge.challenge, &mut OsRng);
            let proving_time = start.elapsed();

            match proved {
                Ok(envelope) => ClientResponse {
                    message: message.with_proof(envelope),
                    proof_failure: None,
                    proving_time,
                    preparation_time,
                },
                Err(e) => {
                    tracing::warn!(client = client.id(), error = %e, "proof generation failed");
                    ClientResponse {
                        message,
                        proof_failure: Some(e.to_string()),
                        proving_time,
                        preparation_time,
                    }
                }
            }
        }));
    }

    let mut responses = Vec::with_capacity(handles.len());
    for handle in handles {
        responses.push(handle.await?);
    }
    Ok(responses)
}
