//! Dummy padding.
//!
//! Each client blinds its public fingerprint with the product of `d` uniformly random
//! dummies and hands the dummies themselves to the shuffler. Once shuffled, the dummies
//! of the honest clients are statistically hidden among each other, which is what keeps
//! the per-client fingerprints unlinkable from the shuffled values.

use crate::constants::FIELD_SECURITY_BITS;
use crate::error::ZkError;
use crate::field::{product, random_elements};
use ark_bn254::Fr;
use rand::{CryptoRng, RngCore};
use std::f64::consts::LOG2_E;

/// Dummies per client for statistical security `lambda`, with `n` clients of which at
/// most `t` are corrupted:
///
/// ```text
/// d = ceil((2 * lambda + 254) / (log2(n - t) - log2(e)) + 2)
/// ```
///
/// The bound only exists when at least three clients are honest.
pub fn dummy_count(lambda: u64, n: usize, t: usize) -> Result<usize, ZkError> {
    if n <= t {
        return Err(ZkError::malformed(format!(
            "corrupted clients ({t}) must be fewer than clients ({n})"
        )));
    }

    let honest = (n - t) as f64;
    let denominator = honest.log2() - LOG2_E;
    if denominator <= 0.0 {
        return Err(ZkError::malformed(format!(
            "dummy bound undefined for {} honest clients; set an explicit dummy count",
            n - t
        )));
    }

    let numerator = (2 * lambda + FIELD_SECURITY_BITS) as f64;
    Ok((numerator / denominator + 2.0).ceil() as usize)
}

/// Draw `d` dummies and their product.
pub fn generate_mask<R: RngCore + CryptoRng + ?Sized>(d: usize, rng: &mut R) -> (Vec<Fr>, Fr) {
    let dummies = random_elements(rng, d);
    let mask = product(&dummies);
    (dummies, mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::Field;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn reference_dummy_counts() {
        assert_eq!(dummy_count(80, 1000, 500).unwrap(), 58);
        assert_eq!(dummy_count(80, 80, 0).unwrap(), 87);
    }

    #[test]
    fn more_honest_clients_need_fewer_dummies() {
        let small = dummy_count(80, 10, 0).unwrap();
        let large = dummy_count(80, 10_000, 0).unwrap();
        assert!(large < small);
        assert!(dummy_count(128, 100, 0).unwrap() > dummy_count(80, 100, 0).unwrap());
    }

    #[test]
    fn undefined_bounds_are_rejected() {
        assert!(matches!(dummy_count(80, 5, 5), Err(ZkError::MalformedInput(_))));
        assert!(matches!(dummy_count(80, 5, 7), Err(ZkError::MalformedInput(_))));
        assert!(matches!(dummy_count(80, 1, 0), Err(ZkError::MalformedInput(_))));
        assert!(matches!(dummy_count(80, 4, 2), Err(ZkError::MalformedInput(_))));
        assert!(dummy_count(80, 3, 0).is_ok());
    }

    #[test]
    fn mask_is_product_of_dummies() {
        let rng = &mut ChaCha20Rng::seed_from_u64(1);
        let (dummies, mask) = generate_mask(58, rng);
        assert_eq!(dummies.len(), 58);
        assert_eq!(mask, dummies.iter().fold(Fr::ONE, |acc, d| acc * d));

        let (none, one) = generate_mask(0, rng);
        assert!(none.is_empty());
        assert_eq!(one, Fr::ONE);
    }
}
