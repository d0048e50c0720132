//! Server-side check that the shuffled batch is the multiset the clients vouched for.
//!
//! Each client publishes `fingerprint(values_i, r) * Π dummies_i`. Because the
//! fingerprint is multiplicative over multiset union, the product of all public
//! fingerprints must equal `fingerprint(shuffled_values, r) * Π shuffled_dummies`.

use crate::field::product;
use crate::fingerprint::fingerprint;
use ark_bn254::Fr;

/// `true` iff the shuffled batch is consistent with the published fingerprints.
pub fn check(values: &[Fr], dummies: &[Fr], r: Fr, public_fingerprints: &[Fr]) -> bool {
    let received = fingerprint(values, r) * product(dummies);
    let expected = product(public_fingerprints);
    received == expected
}
