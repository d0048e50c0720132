//! Groth16 prover/verifier over BN254.
//!
//! SECURITY NOTE: Groth16 needs a trusted setup producing the proving and verifying keys.
//! Keys are generated locally here; a deployment would run an MPC ceremony instead.

use crate::circuit::{check_satisfied, AggregationCircuit};
use crate::error::ZkError;
use crate::proof_system::ProofSystem;
use ark_bn254::{Bn254, Fr};
use ark_groth16::{prepare_verifying_key, Groth16, Proof, ProvingKey, VerifyingKey};
use rand::{CryptoRng, RngCore};

#[derive(Clone, Copy, Debug, Default)]
pub struct Groth16Backend;

impl ProofSystem for Groth16Backend {
    type ProvingKey = ProvingKey<Bn254>;
    type VerifyingKey = VerifyingKey<Bn254>;
    type Proof = Proof<Bn254>;

    const NAME: &'static str = "groth16-bn254";

    fn setup<C, R>(circuit: C, rng: &mut R) -> Result<(Self::ProvingKey, Self::VerifyingKey), ZkError>
    where
        C: AggregationCircuit,
        R: RngCore + CryptoRng,
    {
        let pk = Groth16::<Bn254>::generate_random_parameters_with_reduction(circuit, rng)
            .map_err(|e| ZkError::Ark(format!("{e}")))?;
        let vk = pk.vk.clone();
        Ok((pk, vk))
    }

    fn prove<C, R>(
        pk: &Self::ProvingKey,
        circuit: C,
        rng: &mut R,
    ) -> Result<(Self::Proof, Vec<Fr>), ZkError>
    where
        C: AggregationCircuit,
        R: RngCore + CryptoRng,
    {
        // The prover happily emits a proof for a false statement; it just won't verify.
        check_satisfied(circuit.clone())?;

        let public_inputs = circuit.public_inputs();
        let proof = Groth16::<Bn254>::create_random_proof_with_reduction(circuit, pk, rng)
            .map_err(|e| ZkError::Ark(format!("{e}")))?;
        Ok((proof, public_inputs))
    }

    fn verify(vk: &Self::VerifyingKey, proof: &Self::Proof, public_inputs: &[Fr]) -> Result<bool, ZkError> {
        if public_inputs.len() + 1 != vk.gamma_abc_g1.len() {
            return Err(ZkError::malformed(format!(
                "expected {} public inputs, got {}",
                vk.gamma_abc_g1.len().saturating_sub(1),
                public_inputs.len()
            )));
        }
        let pvk = prepare_verifying_key(vk);
        Groth16::<Bn254>::verify_proof(&pvk, proof, public_inputs)
            .map_err(|e| ZkError::Ark(format!("{e}")))
    }
}
