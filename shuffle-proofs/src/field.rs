//! Field helpers over the BN254 scalar field.
//!
//! The protocol treats `Fr` as an immutable value type. Everything that crosses a trust
//! boundary (commitments, fingerprints, shuffled values) is one of these elements.

use crate::error::ZkError;
use ark_bn254::Fr;
use ark_ff::{AdditiveGroup, BigInteger, Field, PrimeField, UniformRand};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

pub type FieldElement = Fr;

/// Sample a uniformly random field element.
pub fn random_element<R: RngCore + CryptoRng + ?Sized>(rng: &mut R) -> Fr {
    Fr::rand(rng)
}

/// Sample `n` independent uniformly random field elements.
pub fn random_elements<R: RngCore + CryptoRng + ?Sized>(rng: &mut R, n: usize) -> Vec<Fr> {
    (0..n).map(|_| Fr::rand(rng)).collect()
}

/// Interpret `x` as an integer, if it fits in a `u64`.
pub fn to_u64(x: &Fr) -> Option<u64> {
    let limbs = x.into_bigint().0;
    if limbs[1..].iter().all(|l| *l == 0) {
        Some(limbs[0])
    } else {
        None
    }
}

/// Canonical little-endian encoding (32 bytes). Matches arkworks' compressed serialization.
pub fn to_bytes(x: &Fr) -> Vec<u8> {
    x.into_bigint().to_bytes_le()
}

/// Decode a canonical encoding. Non-canonical (>= modulus) inputs are rejected.
pub fn from_bytes(bytes: &[u8]) -> Result<Fr, ZkError> {
    Fr::deserialize_compressed(bytes).map_err(|e| ZkError::Serialization(format!("{e}")))
}

/// Product of all elements; the empty product is one.
pub fn product<'a>(values: impl IntoIterator<Item = &'a Fr>) -> Fr {
    values.into_iter().fold(Fr::ONE, |acc, v| acc * v)
}

/// Sum of all elements; the empty sum is zero.
pub fn sum<'a>(values: impl IntoIterator<Item = &'a Fr>) -> Fr {
    values.into_iter().fold(Fr::ZERO, |acc, v| acc + v)
}

/// JSON-friendly representation of a field element.
///
/// Hex of the canonical compressed encoding, so every component agrees on the bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrHex {
    pub hex: String,
}

impl FrHex {
    pub fn from_fr(x: &Fr) -> Self {
        Self { hex: hex::encode(to_bytes(x)) }
    }

    pub fn to_fr(&self) -> Result<Fr, ZkError> {
        let bytes =
            hex::decode(&self.hex).map_err(|e| ZkError::Serialization(format!("invalid hex: {e}")))?;
        from_bytes(&bytes)
    }
}

/// `#[serde(with = "serde_fr")]` for `Fr` fields, encoded as canonical hex strings.
pub mod serde_fr {
    use super::*;
    use serde::{de::Error as _, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(x: &Fr, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(to_bytes(x)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Fr, D::Error> {
        let hex_str = String::deserialize(d)?;
        FrHex { hex: hex_str }.to_fr().map_err(D::Error::custom)
    }
}

/// `#[serde(with = "serde_fr_vec")]` for `Vec<Fr>` fields.
pub mod serde_fr_vec {
    use super::*;
    use serde::{de::Error as _, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(xs: &[Fr], s: S) -> Result<S::Ok, S::Error> {
        let encoded: Vec<String> = xs.iter().map(|x| hex::encode(to_bytes(x))).collect();
        encoded.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Fr>, D::Error> {
        let encoded = Vec::<String>::deserialize(d)?;
        encoded
            .into_iter()
            .map(|hex| FrHex { hex }.to_fr().map_err(D::Error::custom))
            .collect()
    }
}

/// A list of field elements that serializes as a list of canonical hex strings.
///
/// Usable where `#[serde(with)]` is not, such as inside an adjacently tagged enum.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrVec(#[serde(with = "serde_fr_vec")] pub Vec<Fr>);

impl From<Vec<Fr>> for FrVec {
    fn from(values: Vec<Fr>) -> Self {
        Self(values)
    }
}

/// Size in bytes of the compressed encoding of any arkworks value.
pub fn compressed_size<T: CanonicalSerialize>(value: &T) -> usize {
    value.compressed_size()
}
