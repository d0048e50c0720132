//! Poseidon commitment binding a client's hidden values to a public digest.
//!
//! `commit(values, mask, salt)` absorbs every value, then the mask, then the salt, and
//! squeezes one element. [`commit_var`] replays the same absorption order in-circuit;
//! the proof's commitment clause is exactly the equality of the two.

use crate::constants::poseidon_config;
use ark_bn254::Fr;
use ark_crypto_primitives::sponge::constraints::CryptographicSpongeVar;
use ark_crypto_primitives::sponge::poseidon::constraints::PoseidonSpongeVar;
use ark_crypto_primitives::sponge::poseidon::PoseidonSponge;
use ark_crypto_primitives::sponge::CryptographicSponge;
use ark_r1cs_std::fields::fp::FpVar;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

/// Native commitment.
pub fn commit(values: &[Fr], mask: &Fr, salt: &Fr) -> Fr {
    let cfg = poseidon_config();
    let mut sponge = PoseidonSponge::<Fr>::new(&cfg);

    for v in values {
        sponge.absorb(v);
    }
    sponge.absorb(mask);
    sponge.absorb(salt);

    sponge.squeeze_field_elements::<Fr>(1)[0]
}

/// In-circuit commitment. Must stay in lock-step with [`commit`].
pub fn commit_var(
    cs: ConstraintSystemRef<Fr>,
    values: &[FpVar<Fr>],
    mask: &FpVar<Fr>,
    salt: &FpVar<Fr>,
) -> Result<FpVar<Fr>, SynthesisError> {
    let cfg = poseidon_config();
    let mut sponge = PoseidonSpongeVar::<Fr>::new(cs, &cfg);

    for v in values {
        sponge.absorb(v)?;
    }
    sponge.absorb(mask)?;
    sponge.absorb(salt)?;

    let mut out = sponge.squeeze_field_elements(1)?;
    Ok(out.remove(0))
}
