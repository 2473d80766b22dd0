//! Groth16 over BN254, for verifying keys produced by an external circuit toolchain

use crate::*;
use ark_bn254::Bn254;
use ark_groth16::{Groth16, PreparedVerifyingKey, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::SNARK;
use log::debug;

type Groth16Proof = ark_groth16::Proof<Bn254>;

pub struct Groth16Verifier {
    pvk: PreparedVerifyingKey<Bn254>,
    input_count: usize,
}

impl Groth16Verifier {
    pub fn new(vk: &VerifyingKey<Bn254>) -> Self {
        Groth16Verifier {
            input_count: vk.gamma_abc_g1.len().saturating_sub(1),
            pvk: ark_groth16::prepare_verifying_key(vk),
        }
    }

    /// Load a compressed, canonically serialized verifying key
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let vk = VerifyingKey::<Bn254>::deserialize_compressed(bytes)
            .map_err(|e| Error::Groth16(e.to_string()))?;
        Ok(Groth16Verifier::new(&vk))
    }
}

impl ProofVerifier for Groth16Verifier {
    fn verify(&self, proof: &Proof, public_inputs: &[Fr]) -> bool {
        if public_inputs.len() != self.input_count {
            return false;
        }
        let proof = match Groth16Proof::deserialize_compressed(proof.as_bytes()) {
            Ok(proof) => proof,
            Err(e) => {
                debug!("groth16: undecodable proof: {}", e);
                return false;
            }
        };
        match Groth16::<Bn254>::verify_with_processed_vk(&self.pvk, public_inputs, &proof) {
            Ok(valid) => valid,
            Err(e) => {
                debug!("groth16: verification error: {}", e);
                false
            }
        }
    }

    fn public_input_count(&self) -> Option<usize> {
        Some(self.input_count)
    }
}

/// Compressed canonical encoding of a Groth16 proof, as carried in a `Proof`
pub fn encode_groth16_proof(proof: &Groth16Proof) -> Result<Proof, Error> {
    let mut bytes = Vec::new();
    proof
        .serialize_compressed(&mut bytes)
        .map_err(|e| Error::Groth16(e.to_string()))?;
    Ok(Proof(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_relations::lc;
    use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};
    use ark_snark::CircuitSpecificSetupSNARK;
    use ark_std::rand::{rngs::StdRng, SeedableRng};

    // x * x == y, with y public
    struct Square {
        x: Option<Fr>,
        y: Option<Fr>,
    }

    impl ConstraintSynthesizer<Fr> for Square {
        fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
            let y = cs.new_input_variable(|| self.y.ok_or(SynthesisError::AssignmentMissing))?;
            let x = cs.new_witness_variable(|| self.x.ok_or(SynthesisError::AssignmentMissing))?;
            cs.enforce_constraint(lc!() + x, lc!() + x, lc!() + y)?;
            Ok(())
        }
    }

    #[test]
    fn verifies_real_proofs() {
        let mut rng = StdRng::seed_from_u64(0);
        let (pk, vk) =
            Groth16::<Bn254>::circuit_specific_setup(Square { x: None, y: None }, &mut rng)
                .unwrap();

        let mut vk_bytes = Vec::new();
        vk.serialize_compressed(&mut vk_bytes).unwrap();
        let verifier = Groth16Verifier::from_bytes(&vk_bytes).unwrap();
        assert_eq!(verifier.public_input_count(), Some(1));

        let circuit = Square {
            x: Some(fr_from_u64(7)),
            y: Some(fr_from_u64(49)),
        };
        let proof = Groth16::<Bn254>::prove(&pk, circuit, &mut rng).unwrap();
        let proof = encode_groth16_proof(&proof).unwrap();

        assert!(verifier.verify(&proof, &[fr_from_u64(49)]));
        assert!(!verifier.verify(&proof, &[fr_from_u64(50)]));
        assert!(!verifier.verify(&proof, &[fr_from_u64(49), fr_from_u64(1)]));
        assert!(!verifier.verify(&Proof(vec![0u8; 10]), &[fr_from_u64(49)]));
    }
}
