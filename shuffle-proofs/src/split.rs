//! Additive splitting of a scalar secret into field shares.

use crate::error::ZkError;
use crate::field::random_element;
use ark_bn254::Fr;
use rand::{CryptoRng, RngCore};

/// `k` field elements summing to the client's secret.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShareVector(Vec<Fr>);

impl ShareVector {
    pub fn shares(&self) -> &[Fr] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Recombine the shares.
    pub fn secret(&self) -> Fr {
        crate::field::sum(&self.0)
    }

    pub fn into_inner(self) -> Vec<Fr> {
        self.0
    }
}

/// Split `secret` into `k >= 2` additive shares.
///
/// Shares `1..k` are uniform and independent of the secret; share 0 absorbs the
/// difference. Only the sum and the fingerprint of the shares are ever made public.
pub fn split<R: RngCore + CryptoRng + ?Sized>(
    secret: Fr,
    k: usize,
    rng: &mut R,
) -> Result<ShareVector, ZkError> {
    if k < 2 {
        return Err(ZkError::malformed(format!("share count must be at least 2, got {k}")));
    }

    let mut shares = Vec::with_capacity(k);
    shares.push(secret);
    for _ in 1..k {
        let s = random_element(rng);
        shares[0] -= s;
        shares.push(s);
    }

    Ok(ShareVector(shares))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_std::UniformRand;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use std::collections::HashSet;

    #[test]
    fn shares_sum_to_secret() {
        let rng = &mut ChaCha20Rng::seed_from_u64(1);
        for k in 2..12 {
            let secret = Fr::rand(rng);
            let shares = split(secret, k, rng).unwrap();
            assert_eq!(shares.len(), k);
            assert_eq!(shares.secret(), secret);
        }

        let shares = split(Fr::from(999u64), 5, rng).unwrap();
        assert_eq!(shares.secret(), Fr::from(999u64));
    }

    #[test]
    fn random_shares_are_distinct() {
        let rng = &mut ChaCha20Rng::seed_from_u64(2);
        for _ in 0..20 {
            let shares = split(Fr::from(7u64), 16, rng).unwrap();
            let tail: HashSet<Fr> = shares.shares()[1..].iter().copied().collect();
            assert_eq!(tail.len(), 15);
        }
    }

    #[test]
    fn splitting_the_same_secret_twice_differs() {
        let rng = &mut ChaCha20Rng::seed_from_u64(3);
        let a = split(Fr::from(999u64), 3, rng).unwrap();
        let b = split(Fr::from(999u64), 3, rng).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn fewer_than_two_shares_is_rejected() {
        let rng = &mut ChaCha20Rng::seed_from_u64(4);
        assert!(matches!(split(Fr::from(1u64), 0, rng), Err(ZkError::MalformedInput(_))));
        assert!(matches!(split(Fr::from(1u64), 1, rng), Err(ZkError::MalformedInput(_))));
    }
}
