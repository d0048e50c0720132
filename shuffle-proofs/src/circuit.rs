//! R1CS circuits for the two aggregation variants.
//!
//! Both circuits prove the same shape of statement: the prover knows hidden values, a
//! mask and a salt such that the values are well formed for the variant, the public
//! fingerprint is `fingerprint(values, r) * mask`, and the public commitment opens to
//! `(values, mask, salt)`. The server can then check the shuffled multiset against the
//! public fingerprints without ever seeing which values belong to whom.
//!
//! Public input ordering:
//! - threshold sum: `[threshold, r, public_fingerprint, commitment]`
//! - ranked vote:   `[r, public_fingerprint, commitment]`

use crate::commitment::commit_var;
use crate::error::ZkError;
use crate::fingerprint::fingerprint_var;
use crate::rank::pair_count;
use ark_bn254::Fr;
use ark_ff::{AdditiveGroup, Field};
use ark_r1cs_std::alloc::AllocVar;
use ark_r1cs_std::eq::EqGadget;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::fields::FieldVar;
use ark_relations::r1cs::{
    ConstraintSynthesizer, ConstraintSystem, ConstraintSystemRef, SynthesisError,
};
use std::cmp::Ordering;

/// A circuit that can be proven by a [`crate::proof_system::ProofSystem`].
///
/// `public_inputs` must list the values in the same order as the circuit allocates them
/// with `new_input`.
pub trait AggregationCircuit: ConstraintSynthesizer<Fr> + Clone + Send + 'static {
    fn public_inputs(&self) -> Vec<Fr>;
}

/// Sum of `k` additive shares is at most a public threshold.
#[derive(Clone, Debug)]
pub struct ThresholdSumCircuit {
    // Public.
    pub threshold: Fr,
    pub challenge: Fr,
    pub public_fingerprint: Fr,
    pub commitment: Fr,

    // Private.
    pub shares: Vec<Fr>,
    pub mask: Fr,
    pub salt: Fr,
}

impl ThresholdSumCircuit {
    /// Shape-only instance for key generation. Constraints depend on `shares` alone.
    pub fn blank(shares: usize) -> Self {
        Self {
            threshold: Fr::ZERO,
            challenge: Fr::ZERO,
            public_fingerprint: Fr::ONE,
            commitment: Fr::ZERO,
            shares: vec![Fr::ZERO; shares],
            mask: Fr::ONE,
            salt: Fr::ZERO,
        }
    }
}

impl AggregationCircuit for ThresholdSumCircuit {
    fn public_inputs(&self) -> Vec<Fr> {
        vec![self.threshold, self.challenge, self.public_fingerprint, self.commitment]
    }
}

impl ConstraintSynthesizer<Fr> for ThresholdSumCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        // --- Public inputs ---
        let threshold = FpVar::<Fr>::new_input(cs.clone(), || Ok(self.threshold))?;
        let r = FpVar::<Fr>::new_input(cs.clone(), || Ok(self.challenge))?;
        let public_fp =
            FpVar::<Fr>::new_input(cs.clone(), || Ok(self.public_fingerprint))?;
        let public_commitment =
            FpVar::<Fr>::new_input(cs.clone(), || Ok(self.commitment))?;

        // --- Witness ---
        let shares = Vec::<FpVar<Fr>>::new_witness(cs.clone(), || Ok(self.shares))?;
        let mask = FpVar::<Fr>::new_witness(cs.clone(), || Ok(self.mask))?;
        let salt = FpVar::<Fr>::new_witness(cs.clone(), || Ok(self.salt))?;

        // (a) sum <= threshold. Both sides are range-checked to the lower half of the
        // field, so a share vector wrapping around the modulus cannot pass.
        let total = shares.iter().fold(FpVar::<Fr>::zero(), |acc, s| acc + s);
        total.enforce_cmp(&threshold, Ordering::Less, true)?;

        // (b) blinded fingerprint.
        let fp = fingerprint_var(&shares, &r);
        (fp * &mask).enforce_equal(&public_fp)?;

        // (c) commitment opening.
        let digest = commit_var(cs.clone(), &shares, &mask, &salt)?;
        digest.enforce_equal(&public_commitment)?;

        Ok(())
    }
}

/// A ranking over `candidates` is a permutation and the pair list is derived from it.
#[derive(Clone, Debug)]
pub struct RankedVoteCircuit {
    pub candidates: usize,

    // Public.
    pub challenge: Fr,
    pub public_fingerprint: Fr,
    pub commitment: Fr,

    // Private.
    pub ranking: Vec<Fr>,
    pub pairs: Vec<(Fr, Fr)>,
    pub mask: Fr,
    pub salt: Fr,
}

impl RankedVoteCircuit {
    /// Shape-only instance for key generation.
    pub fn blank(candidates: usize) -> Self {
        Self {
            candidates,
            challenge: Fr::ZERO,
            public_fingerprint: Fr::ONE,
            commitment: Fr::ZERO,
            ranking: vec![Fr::ZERO; candidates],
            pairs: vec![(Fr::ZERO, Fr::ZERO); pair_count(candidates)],
            mask: Fr::ONE,
            salt: Fr::ZERO,
        }
    }
}

impl AggregationCircuit for RankedVoteCircuit {
    fn public_inputs(&self) -> Vec<Fr> {
        vec![self.challenge, self.public_fingerprint, self.commitment]
    }
}

impl ConstraintSynthesizer<Fr> for RankedVoteCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        let c = self.candidates;
        if self.ranking.len() != c || self.pairs.len() != pair_count(c) {
            return Err(SynthesisError::Unsatisfiable);
        }

        // --- Public inputs ---
        let r = FpVar::<Fr>::new_input(cs.clone(), || Ok(self.challenge))?;
        let public_fp =
            FpVar::<Fr>::new_input(cs.clone(), || Ok(self.public_fingerprint))?;
        let public_commitment =
            FpVar::<Fr>::new_input(cs.clone(), || Ok(self.commitment))?;

        // --- Witness ---
        let ranking = Vec::<FpVar<Fr>>::new_witness(cs.clone(), || Ok(self.ranking))?;
        let mut pairs = Vec::with_capacity(self.pairs.len());
        for (w, l) in self.pairs {
            let winner = FpVar::<Fr>::new_witness(cs.clone(), || Ok(w))?;
            let loser = FpVar::<Fr>::new_witness(cs.clone(), || Ok(l))?;
            pairs.push((winner, loser));
        }
        let mask = FpVar::<Fr>::new_witness(cs.clone(), || Ok(self.mask))?;
        let salt = FpVar::<Fr>::new_witness(cs.clone(), || Ok(self.salt))?;

        // (a) the ranking is a permutation of 0..C: same fingerprint as the canonical
        // sequence under the server's challenge.
        let canonical: Vec<FpVar<Fr>> =
            (0..c as u64).map(|i| FpVar::constant(Fr::from(i))).collect();
        fingerprint_var(&ranking, &r).enforce_equal(&fingerprint_var(&canonical, &r))?;

        // (b) pairs follow the deterministic derivation from the ranking.
        let mut idx = 0;
        for i in 0..c {
            for j in 0..c - i - 1 {
                let (winner, loser) = &pairs[idx];
                winner.enforce_equal(&ranking[i])?;
                loser.enforce_equal(&ranking[i + j + 1])?;
                idx += 1;
            }
        }

        // (c) blinded fingerprint over processed pairs `winner * C + loser`.
        let width = FpVar::constant(Fr::from(c as u64));
        let processed: Vec<FpVar<Fr>> =
            pairs.iter().map(|(w, l)| w * &width + l).collect();
        (fingerprint_var(&processed, &r) * &mask).enforce_equal(&public_fp)?;

        // (d) commitment opening.
        let digest = commit_var(cs.clone(), &processed, &mask, &salt)?;
        digest.enforce_equal(&public_commitment)?;

        Ok(())
    }
}

/// Synthesize `circuit` against a fresh constraint system and report the first failing
/// constraint, if any.
pub fn check_satisfied<C: ConstraintSynthesizer<Fr>>(circuit: C) -> Result<(), ZkError> {
    let cs = ConstraintSystem::<Fr>::new_ref();
    circuit
        .generate_constraints(cs.clone())
        .map_err(|e| match e {
            SynthesisError::Unsatisfiable => ZkError::Unsatisfiable("circuit shape".into()),
            other => ZkError::Ark(format!("{other}")),
        })?;

    if cs.is_satisfied().map_err(|e| ZkError::Ark(format!("{e}")))? {
        return Ok(());
    }
    let failing = cs
        .which_is_unsatisfied()
        .map_err(|e| ZkError::Ark(format!("{e}")))?
        .unwrap_or_else(|| "unknown constraint".into());
    Err(ZkError::Unsatisfiable(failing))
}
