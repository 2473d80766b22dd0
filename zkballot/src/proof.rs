use crate::*;
use digest::Digest;
use ed25519_dalek::PublicKey;
use ed25519_dalek::Signature;
use log::debug;
use sha3::Keccak256;
use std::convert::TryFrom;

/// Statement tag of vote-update attestations
pub const VOTE_STATEMENT: &[u8] = b"zkballot/vote-update/v1";

/// Statement tag of result-publication attestations
pub const RESULT_STATEMENT: &[u8] = b"zkballot/tally-result/v1";

/// An opaque proof, interpreted only by the verifier it was made for
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Proof(#[serde(with = "BytesHex")] pub Vec<u8>);

impl Proof {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Proof {
    fn from(item: Vec<u8>) -> Self {
        Proof(item)
    }
}

/// A proof-system verifying key
///
/// Verification must be pure: it is run outside any election lock and may run in
/// parallel for unrelated submissions.
pub trait ProofVerifier: Send + Sync {
    /// Whether `proof` is valid for the ordered `public_inputs`
    fn verify(&self, proof: &Proof, public_inputs: &[Fr]) -> bool;

    /// Number of public inputs the key was generated for, when known
    fn public_input_count(&self) -> Option<usize> {
        None
    }
}

/// keccak256(statement || len || inputs as 32-byte big-endian words)
pub fn attestation_digest(statement: &[u8], public_inputs: &[Fr]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(statement);
    hasher.update(&(public_inputs.len() as u64).to_be_bytes());
    for input in public_inputs {
        hasher.update(&fr_to_be_bytes(input));
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Verifier for a designated proving service.
///
/// The prover evaluates the full constraint system and signs the public inputs with its
/// proving key; a proof is that ed25519 signature. Soundness rests on the prover key,
/// so this backend suits deployments that already trust their proving service.
#[derive(Clone, Debug)]
pub struct AttestationVerifier {
    key: PublicKey,
    statement: &'static [u8],
    input_count: usize,
}

impl AttestationVerifier {
    pub fn new(key: PublicKey, statement: &'static [u8], input_count: usize) -> Self {
        AttestationVerifier {
            key,
            statement,
            input_count,
        }
    }

    pub fn key(&self) -> &PublicKey {
        &self.key
    }
}

impl ProofVerifier for AttestationVerifier {
    fn verify(&self, proof: &Proof, public_inputs: &[Fr]) -> bool {
        if public_inputs.len() != self.input_count {
            debug!(
                "attestation: expected {} public inputs, got {}",
                self.input_count,
                public_inputs.len()
            );
            return false;
        }
        let signature = match Signature::try_from(proof.as_bytes()) {
            Ok(signature) => signature,
            Err(_) => return false,
        };
        let digest = attestation_digest(self.statement, public_inputs);
        self.key.verify_strict(&digest, &signature).is_ok()
    }

    fn public_input_count(&self) -> Option<usize> {
        Some(self.input_count)
    }
}
