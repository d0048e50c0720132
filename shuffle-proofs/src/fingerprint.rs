//! Polynomial fingerprint for multiset equality.
//!
//! `fingerprint(A, r) = Π (a + r)` is the evaluation at `-r` of the polynomial whose roots
//! are the elements of `A`. Two multisets of equal size have equal fingerprints for a
//! uniformly random `r` only if they are equal, except with probability `|A| / |Fr|`.
//! The challenge `r` must therefore be fixed after every multiset it is applied to.

use ark_bn254::Fr;
use ark_ff::Field;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::fields::FieldVar;

/// Native fingerprint. The empty sequence fingerprints to one.
pub fn fingerprint(values: &[Fr], r: Fr) -> Fr {
    values.iter().fold(Fr::ONE, |acc, v| acc * (*v + r))
}

/// Fingerprint of the canonical candidate sequence `0..candidates`.
pub fn canonical_fingerprint(candidates: usize, r: Fr) -> Fr {
    (0..candidates as u64).fold(Fr::ONE, |acc, c| acc * (Fr::from(c) + r))
}

/// In-circuit fingerprint. Computes exactly the same product as [`fingerprint`].
pub fn fingerprint_var(values: &[FpVar<Fr>], r: &FpVar<Fr>) -> FpVar<Fr> {
    values.iter().fold(FpVar::<Fr>::one(), |acc, v| acc * (v + r))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_r1cs_std::alloc::AllocVar;
    use ark_r1cs_std::R1CSVar;
    use ark_relations::r1cs::ConstraintSystem;
    use ark_std::rand::seq::SliceRandom;
    use ark_std::UniformRand;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn order_does_not_matter() {
        let rng = &mut ChaCha20Rng::seed_from_u64(1);
        for len in [1usize, 2, 7, 64] {
            let mut values: Vec<Fr> = (0..len).map(|_| Fr::rand(rng)).collect();
            let r = Fr::rand(rng);
            let before = fingerprint(&values, r);
            values.shuffle(rng);
            assert_eq!(fingerprint(&values, r), before);
        }
    }

    #[test]
    fn empty_sequence_is_one() {
        assert_eq!(fingerprint(&[], Fr::from(17u64)), Fr::ONE);
        assert_eq!(canonical_fingerprint(0, Fr::from(17u64)), Fr::ONE);
    }

    #[test]
    fn different_multisets_differ() {
        let rng = &mut ChaCha20Rng::seed_from_u64(2);
        let a: Vec<Fr> = (0..10u64).map(Fr::from).collect();
        let mut b = a.clone();
        b[3] = Fr::from(3u64 + 100);
        // Same length, one element replaced.
        let r = Fr::rand(rng);
        assert_ne!(fingerprint(&a, r), fingerprint(&b, r));

        // Multiplicity matters: {1,1,2} vs {1,2,2}.
        let c = [Fr::from(1u64), Fr::from(1u64), Fr::from(2u64)];
        let d = [Fr::from(1u64), Fr::from(2u64), Fr::from(2u64)];
        assert_ne!(fingerprint(&c, r), fingerprint(&d, r));
    }

    #[test]
    fn canonical_matches_explicit_sequence() {
        let r = Fr::from(5u64);
        let seq: Vec<Fr> = (0..6u64).map(Fr::from).collect();
        assert_eq!(canonical_fingerprint(6, r), fingerprint(&seq, r));
    }

    #[test]
    fn gadget_agrees_with_native() {
        let rng = &mut ChaCha20Rng::seed_from_u64(3);
        let cs = ConstraintSystem::<Fr>::new_ref();
        let values: Vec<Fr> = (0..5).map(|_| Fr::rand(rng)).collect();
        let r = Fr::rand(rng);

        let value_vars: Vec<FpVar<Fr>> = values
            .iter()
            .map(|v| FpVar::new_witness(cs.clone(), || Ok(*v)).unwrap())
            .collect();
        let r_var = FpVar::new_input(cs.clone(), || Ok(r)).unwrap();

        let fp = fingerprint_var(&value_vars, &r_var);
        assert_eq!(fp.value().unwrap(), fingerprint(&values, r));
        assert!(cs.is_satisfied().unwrap());
    }
}
