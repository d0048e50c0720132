//! The anonymizing relay between clients and server.
//!
//! The shuffler sees every plaintext value and dummy but no commitment or fingerprint.
//! It is not trusted: anything it does to the multiset is caught by
//! [`crate::verifier::check`].

use ark_bn254::Fr;
use rand::seq::SliceRandom;
use rand::{CryptoRng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// What one client hands to the shuffler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientBundle<T> {
    pub values: Vec<T>,
    pub dummies: Vec<Fr>,
}

/// Everything the shuffler forwards to the server, with provenance erased.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShuffledBatch<T> {
    pub values: Vec<T>,
    pub dummies: Vec<Fr>,
}

impl<T> ShuffledBatch<T> {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Anything that stands between the clients and the server.
pub trait Relay<T>: Send {
    fn relay(&mut self, bundles: Vec<ClientBundle<T>>) -> ShuffledBatch<T>;
}

/// Honest relay: concatenates all bundles and applies independent uniform permutations
/// to the values and to the dummies.
pub fn shuffle<T, R: RngCore + CryptoRng + ?Sized>(
    bundles: Vec<ClientBundle<T>>,
    rng: &mut R,
) -> ShuffledBatch<T> {
    let value_count = bundles.iter().map(|b| b.values.len()).sum();
    let dummy_count = bundles.iter().map(|b| b.dummies.len()).sum();
    let mut values = Vec::with_capacity(value_count);
    let mut dummies = Vec::with_capacity(dummy_count);

    for bundle in bundles {
        values.extend(bundle.values);
        dummies.extend(bundle.dummies);
    }

    values.shuffle(rng);
    dummies.shuffle(rng);

    tracing::debug!(values = values.len(), dummies = dummies.len(), "batch shuffled");
    ShuffledBatch { values, dummies }
}

pub struct Shuffler<R> {
    rng: R,
}

impl<R: RngCore + CryptoRng> Shuffler<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl Shuffler<ChaCha20Rng> {
    pub fn from_entropy() -> Self {
        Self::new(ChaCha20Rng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(ChaCha20Rng::seed_from_u64(seed))
    }
}

impl<T, R: RngCore + CryptoRng + Send> Relay<T> for Shuffler<R> {
    fn relay(&mut self, bundles: Vec<ClientBundle<T>>) -> ShuffledBatch<T> {
        shuffle(bundles, &mut self.rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rank::CandidatePair;

    fn sorted<T: Ord + Clone>(xs: &[T]) -> Vec<T> {
        let mut v = xs.to_vec();
        v.sort();
        v
    }

    #[test]
    fn shuffle_preserves_multisets() {
        let bundles: Vec<ClientBundle<u64>> = (0..5u64)
            .map(|c| ClientBundle {
                values: vec![c, c * 10, 7],
                dummies: vec![Fr::from(c + 100), Fr::from(c + 200)],
            })
            .collect();
        let mut expected_values: Vec<u64> = bundles.iter().flat_map(|b| b.values.clone()).collect();
        expected_values.sort();
        let expected_dummies: Vec<Fr> = bundles.iter().flat_map(|b| b.dummies.clone()).collect();

        let batch = Shuffler::seeded(1).relay(bundles);
        assert_eq!(sorted(&batch.values), expected_values);
        assert_eq!(batch.dummies.len(), expected_dummies.len());
        for d in &expected_dummies {
            assert!(batch.dummies.contains(d));
        }
    }

    #[test]
    fn pairs_move_as_units() {
        let bundles = vec![
            ClientBundle {
                values: vec![CandidatePair::new(2, 0), CandidatePair::new(2, 1)],
                dummies: vec![],
            },
            ClientBundle { values: vec![CandidatePair::new(0, 1)], dummies: vec![] },
        ];
        let batch = Shuffler::seeded(3).relay(bundles);
        assert_eq!(batch.len(), 3);
        for expected in [(2, 0), (2, 1), (0, 1)] {
            assert!(batch.values.contains(&CandidatePair::from(expected)));
        }
    }

    #[test]
    fn output_order_depends_on_the_rng() {
        let bundle = || vec![ClientBundle { values: (0..64u64).collect(), dummies: vec![] }];
        let a = Shuffler::seeded(1).relay(bundle());
        let b = Shuffler::seeded(2).relay(bundle());
        assert_ne!(a.values, b.values);
        assert_ne!(a.values, (0..64u64).collect::<Vec<_>>());
    }
}
