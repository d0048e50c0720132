//! Wire messages exchanged during a round.
//!
//! Field elements travel as hex of their canonical encoding and proofs as base64, so
//! every message is plain JSON.

use crate::error::ZkError;
use crate::field::{serde_fr, serde_fr_vec, FrVec};
use crate::proof_system::{from_base64, to_base64, ProofSystem};
use crate::rank::CandidatePair;
use crate::shuffler::ShuffledBatch;
use ark_bn254::Fr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ClientId = usize;

/// Client → server, before the challenge exists.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCommitMessage {
    pub client: ClientId,
    #[serde(with = "serde_fr")]
    pub commitment: Fr,
}

/// Server → client, once every commitment is in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerChallengeMessage {
    pub round_id: Uuid,
    #[serde(with = "serde_fr")]
    pub challenge: Fr,
    /// Whether this client is in the verification sample.
    pub proof_requested: bool,
}

/// A serialized proof together with the public witness it was produced for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofEnvelope {
    pub proof: String,
    #[serde(with = "serde_fr_vec")]
    pub public_inputs: Vec<Fr>,
}

impl ProofEnvelope {
    pub fn new<P: ProofSystem>(proof: &P::Proof, public_inputs: Vec<Fr>) -> Result<Self, ZkError> {
        Ok(Self { proof: to_base64(proof)?, public_inputs })
    }

    pub fn decode<P: ProofSystem>(&self) -> Result<P::Proof, ZkError> {
        from_base64(&self.proof)
    }

    /// Decoded size of the proof in bytes, derived from the base64 length.
    pub fn proof_bytes(&self) -> usize {
        let padding = self.proof.bytes().rev().take_while(|c| *c == b'=').count();
        (self.proof.len() / 4 * 3).saturating_sub(padding)
    }
}

/// Client → server, after the challenge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSubmitMessage {
    pub client: ClientId,
    #[serde(with = "serde_fr")]
    pub public_fingerprint: Fr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<ProofEnvelope>,
}

impl ClientSubmitMessage {
    pub fn new(client: ClientId, public_fingerprint: Fr) -> Self {
        Self { client, public_fingerprint, proof: None }
    }

    pub fn with_proof(mut self, proof: ProofEnvelope) -> Self {
        self.proof = Some(proof);
        self
    }
}

/// Plaintext values as relayed by the shuffler.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "items", rename_all = "snake_case")]
pub enum ShuffledValues {
    Shares(FrVec),
    Pairs(Vec<CandidatePair>),
}

impl ShuffledValues {
    pub fn len(&self) -> usize {
        match self {
            ShuffledValues::Shares(v) => v.0.len(),
            ShuffledValues::Pairs(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shuffler → server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShufflerOutputMessage {
    pub values: ShuffledValues,
    #[serde(with = "serde_fr_vec")]
    pub dummies: Vec<Fr>,
}

impl From<ShuffledBatch<Fr>> for ShufflerOutputMessage {
    fn from(batch: ShuffledBatch<Fr>) -> Self {
        Self { values: ShuffledValues::Shares(FrVec(batch.values)), dummies: batch.dummies }
    }
}

impl From<ShuffledBatch<CandidatePair>> for ShufflerOutputMessage {
    fn from(batch: ShuffledBatch<CandidatePair>) -> Self {
        Self { values: ShuffledValues::Pairs(batch.values), dummies: batch.dummies }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_message_json_shape() {
        let msg = ClientSubmitMessage::new(3, Fr::from(5u64)).with_proof(ProofEnvelope {
            proof: "AAAA".into(),
            public_inputs: vec![Fr::from(1u64), Fr::from(2u64)],
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["client"], 3);
        assert_eq!(
            json["public_fingerprint"],
            "0500000000000000000000000000000000000000000000000000000000000000"
        );
        assert_eq!(json["proof"]["public_inputs"].as_array().unwrap().len(), 2);

        let back: ClientSubmitMessage = serde_json::from_value(json).unwrap();
        assert_eq!(back, msg);

        let bare = serde_json::to_value(ClientSubmitMessage::new(1, Fr::from(1u64))).unwrap();
        assert!(bare.get("proof").is_none());
    }

    #[test]
    fn shuffled_values_are_tagged() {
        let msg = ShufflerOutputMessage {
            values: ShuffledValues::Pairs(vec![CandidatePair::new(2, 0)]),
            dummies: vec![],
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"kind\":\"pairs\""));
        let back: ShufflerOutputMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.values.len(), 1);
    }

    #[test]
    fn shuffled_shares_decode_from_hex() {
        let msg = ShufflerOutputMessage {
            values: ShuffledValues::Shares(FrVec(vec![Fr::from(7u64), Fr::from(9u64)])),
            dummies: vec![Fr::from(3u64)],
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["values"]["kind"], "shares");
        assert_eq!(
            json["values"]["items"][0],
            "0700000000000000000000000000000000000000000000000000000000000000"
        );

        let back: ShufflerOutputMessage = serde_json::from_value(json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn non_canonical_field_element_is_rejected() {
        let json = format!(r#"{{"client":0,"commitment":"{}"}}"#, "ff".repeat(32));
        assert!(serde_json::from_str::<ClientCommitMessage>(&json).is_err());
    }

    #[test]
    fn base64_length_gives_proof_bytes() {
        let env = ProofEnvelope { proof: "AAAA".into(), public_inputs: vec![] };
        assert_eq!(env.proof_bytes(), 3);
        let env = ProofEnvelope { proof: "AA==".into(), public_inputs: vec![] };
        assert_eq!(env.proof_bytes(), 1);
    }
}
