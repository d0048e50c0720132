//! Crate-wide constants used by the circuits and host-side orchestration.

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::poseidon::{find_poseidon_ark_and_mds, PoseidonConfig};
use ark_ff::PrimeField;

/// Security bit length of the BN254 scalar field, used by the padding bound.
pub const FIELD_SECURITY_BITS: u64 = 254;

/// Size in bytes of one canonically encoded field element.
pub const FIELD_ELEMENT_SIZE: usize = 32;

/// A commitment is a single field element.
pub const COMMITMENT_SIZE: usize = FIELD_ELEMENT_SIZE;

/// The challenge broadcast by the server is a single field element.
pub const CHALLENGE_SIZE: usize = FIELD_ELEMENT_SIZE;

/// Statistical security parameter used when none is configured.
pub const DEFAULT_SECURITY_PARAMETER: u64 = 80;

/// Number of proofs the server verifies per round when none is configured.
pub const DEFAULT_MAX_SAMPLED_PROOFS: usize = 10;

// Poseidon sponge configuration.
//
// Width-3 sponge (rate=2, capacity=1). Commitments absorb one element at a time, so the
// native hasher and the gadget buffer identically.
pub const POSEIDON_RATE: usize = 2;
pub const POSEIDON_CAPACITY: usize = 1;

pub const POSEIDON_FULL_ROUNDS: usize = 8;
pub const POSEIDON_PARTIAL_ROUNDS: usize = 57;

/// Poseidon S-box exponent (alpha).
pub const POSEIDON_ALPHA: u64 = 5;

/// Deterministically derive Poseidon parameters for BN254::Fr.
///
/// Both the native commitment and the in-circuit gadget call this, so they always agree
/// on round constants and the MDS matrix.
pub fn poseidon_config() -> PoseidonConfig<Fr> {
    let prime_bits = Fr::MODULUS_BIT_SIZE as u64;

    let (ark, mds) = find_poseidon_ark_and_mds::<Fr>(
        prime_bits,
        POSEIDON_RATE,
        POSEIDON_FULL_ROUNDS as u64,
        POSEIDON_PARTIAL_ROUNDS as u64,
        0,
    );

    PoseidonConfig::new(
        POSEIDON_FULL_ROUNDS,
        POSEIDON_PARTIAL_ROUNDS,
        POSEIDON_ALPHA,
        mds,
        ark,
        POSEIDON_RATE,
        POSEIDON_CAPACITY,
    )
}
