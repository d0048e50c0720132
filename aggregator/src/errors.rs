use crate::round::Phase;
use shuffle_proofs::messages::ClientId;
use shuffle_proofs::ZkError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AggregatorError {
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("protocol violation: {0}")]
    ProtocolViolation(#[from] ProtocolViolation),

    #[error("{operation} is not allowed while the round is {phase:?}")]
    OutOfPhase { operation: &'static str, phase: Phase },

    #[error("unknown client {0}")]
    UnknownClient(ClientId),

    #[error("client {0} already committed")]
    DuplicateCommitment(ClientId),

    #[error("client {0} already submitted")]
    DuplicateSubmission(ClientId),

    #[error("proof system error: {0}")]
    Zk(ZkError),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Evidence that a party deviated from the protocol. The round fails with it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    #[error("shuffled batch does not match the published fingerprints")]
    FingerprintMismatch,

    #[error("proof from client {client} was rejected")]
    ProofRejected { client: ClientId },

    #[error("client {client} proved against public inputs the server did not issue")]
    PublicInputMismatch { client: ClientId },

    #[error("shuffled batch is malformed: {0}")]
    MalformedBatch(String),
}

impl From<ZkError> for AggregatorError {
    fn from(e: ZkError) -> Self {
        match e {
            ZkError::MalformedInput(m) => AggregatorError::MalformedInput(m),
            other => AggregatorError::Zk(other),
        }
    }
}

impl From<tokio::task::JoinError> for AggregatorError {
    fn from(e: tokio::task::JoinError) -> Self {
        AggregatorError::Internal(format!("blocking task failed: {e}"))
    }
}

impl From<std::io::Error> for AggregatorError {
    fn from(e: std::io::Error) -> Self {
        AggregatorError::Internal(format!("io: {e}"))
    }
}
