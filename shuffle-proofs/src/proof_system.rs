//! Capability contract for the zero-knowledge backend.
//!
//! The protocol code only ever talks to a `ProofSystem`; Groth16 over BN254 is the one
//! implementation shipped here (see [`crate::groth16`]).

use crate::circuit::AggregationCircuit;
use crate::constants::FIELD_ELEMENT_SIZE;
use crate::error::ZkError;
use ark_bn254::Fr;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rand::{CryptoRng, RngCore};
use std::fmt::Debug;

/// Bound shared by every key and proof type a backend exposes.
pub trait Artifact:
    CanonicalSerialize + CanonicalDeserialize + Clone + Debug + Send + Sync + 'static
{
}

impl<T> Artifact for T where
    T: CanonicalSerialize + CanonicalDeserialize + Clone + Debug + Send + Sync + 'static
{
}

pub trait ProofSystem: Send + Sync + 'static {
    type ProvingKey: Artifact;
    type VerifyingKey: Artifact;
    type Proof: Artifact;

    /// Human-readable backend name, used in logs and reports.
    const NAME: &'static str;

    /// Generate keys for the shape of `circuit`. Witness values are ignored.
    fn setup<C, R>(circuit: C, rng: &mut R) -> Result<(Self::ProvingKey, Self::VerifyingKey), ZkError>
    where
        C: AggregationCircuit,
        R: RngCore + CryptoRng;

    /// Prove `circuit`, returning the proof and its public witness.
    ///
    /// Fails with [`ZkError::Unsatisfiable`] if the assignment violates any clause.
    fn prove<C, R>(
        pk: &Self::ProvingKey,
        circuit: C,
        rng: &mut R,
    ) -> Result<(Self::Proof, Vec<Fr>), ZkError>
    where
        C: AggregationCircuit,
        R: RngCore + CryptoRng;

    /// `Ok(false)` means a well-formed proof that does not verify; `Err` means the backend
    /// could not evaluate it at all.
    fn verify(vk: &Self::VerifyingKey, proof: &Self::Proof, public_inputs: &[Fr]) -> Result<bool, ZkError>;

    fn proving_key_size(pk: &Self::ProvingKey) -> usize {
        pk.compressed_size()
    }

    fn proof_size(proof: &Self::Proof) -> usize {
        proof.compressed_size()
    }

    fn public_witness_size(public_inputs: &[Fr]) -> usize {
        public_inputs.len() * FIELD_ELEMENT_SIZE
    }
}

/// Compressed arkworks encoding of any key or proof.
pub fn to_bytes<T: CanonicalSerialize>(value: &T) -> Result<Vec<u8>, ZkError> {
    let mut out = Vec::with_capacity(value.compressed_size());
    value
        .serialize_compressed(&mut out)
        .map_err(|e| ZkError::Serialization(format!("{e}")))?;
    Ok(out)
}

pub fn from_bytes<T: CanonicalDeserialize>(bytes: &[u8]) -> Result<T, ZkError> {
    T::deserialize_compressed(bytes).map_err(|e| ZkError::Serialization(format!("{e}")))
}

/// Base64 of the compressed encoding, as carried in JSON messages.
pub fn to_base64<T: CanonicalSerialize>(value: &T) -> Result<String, ZkError> {
    Ok(STANDARD.encode(to_bytes(value)?))
}

pub fn from_base64<T: CanonicalDeserialize>(encoded: &str) -> Result<T, ZkError> {
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| ZkError::Serialization(format!("invalid base64: {e}")))?;
    from_bytes(&bytes)
}
