use thiserror::Error;

#[derive(Debug, Error)]
pub enum ZkError {
    /// Caller or configuration error, detected before any proving work.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// The assignment does not satisfy the circuit; no proof can exist for it.
    #[error("unsatisfiable assignment: {0}")]
    Unsatisfiable(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("proof verification failed")]
    VerificationFailed,

    #[error("arkworks error: {0}")]
    Ark(String),
}

impl ZkError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        ZkError::MalformedInput(msg.into())
    }
}
