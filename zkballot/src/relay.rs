//! Meta-transaction relay: voter-signed authorizations a third party can submit.
//!
//! The signed payload is an EIP-712 style typed structure
//! `Vote(uint256 electionId,bytes32 signalsHash,uint256 nonce)` under the domain
//! `{name: "zkballot", version: "1", electionId}`, hashed with keccak256. The relayer
//! only ever sees public signals, never the voter's secret or candidate.

use crate::*;
use digest::Digest;
use ed25519_dalek::ExpandedSecretKey;
use ed25519_dalek::PublicKey;
use ed25519_dalek::SecretKey;
use ed25519_dalek::Signature;
use sha3::Keccak256;

pub const DOMAIN_NAME: &str = "zkballot";
pub const DOMAIN_VERSION: &str = "1";
pub const DOMAIN_TYPE: &[u8] = b"EIP712Domain(string name,string version,uint256 electionId)";
pub const VOTE_TYPE: &[u8] = b"Vote(uint256 electionId,bytes32 signalsHash,uint256 nonce)";

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    keccak256_concat(&[data])
}

fn keccak256_concat(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

fn u256(value: u64) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[24..].copy_from_slice(&value.to_be_bytes());
    out
}

pub fn domain_separator(election_id: ElectionId) -> [u8; 32] {
    keccak256_concat(&[
        &keccak256(DOMAIN_TYPE),
        &keccak256(DOMAIN_NAME.as_bytes()),
        &keccak256(DOMAIN_VERSION.as_bytes()),
        &election_id.to_array(),
    ])
}

pub fn vote_struct_hash(election_id: ElectionId, signals_hash: &[u8; 32], nonce: u64) -> [u8; 32] {
    keccak256_concat(&[
        &keccak256(VOTE_TYPE),
        &election_id.to_array(),
        signals_hash,
        &u256(nonce),
    ])
}

/// The digest a voter signs: `keccak256(0x19 0x01 || domainSeparator || structHash)`
pub fn relay_digest(election_id: ElectionId, signals_hash: &[u8; 32], nonce: u64) -> [u8; 32] {
    keccak256_concat(&[
        &[0x19u8, 0x01],
        &domain_separator(election_id),
        &vote_struct_hash(election_id, signals_hash, nonce),
    ])
}

/// Check `signature` authorizes exactly these signals at this nonce for this election
pub fn verify_relay_signature(
    voter: &PublicKey,
    election_id: ElectionId,
    signals: &PublicSignals,
    nonce: u64,
    signature: &Signature,
) -> bool {
    let digest = relay_digest(election_id, &signals.hash(), nonce);
    voter.verify_strict(&digest, signature).is_ok()
}

/// A voter's consent to have one specific set of public signals relayed at one nonce
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RelayAuthorization {
    pub election_id: ElectionId,

    #[serde(with = "Bytes32Hex")]
    pub signals_hash: [u8; 32],

    pub nonce: u64,

    #[serde(with = "EdPublicKeyHex")]
    pub voter: PublicKey,

    #[serde(with = "EdSignatureHex")]
    pub signature: Signature,
}

impl RelayAuthorization {
    pub fn sign(
        secret: &SecretKey,
        election_id: ElectionId,
        signals: &PublicSignals,
        nonce: u64,
    ) -> Self {
        let voter = PublicKey::from(secret);
        let signals_hash = signals.hash();
        let digest = relay_digest(election_id, &signals_hash, nonce);
        let expanded: ExpandedSecretKey = secret.into();
        RelayAuthorization {
            election_id,
            signals_hash,
            nonce,
            voter,
            signature: expanded.sign(&digest, &voter),
        }
    }

    pub fn digest(&self) -> [u8; 32] {
        relay_digest(self.election_id, &self.signals_hash, self.nonce)
    }

    /// Verify the signature and that it covers `signals`
    pub fn verify(&self, signals: &PublicSignals) -> Result<(), ValidationError> {
        if self.signals_hash != signals.hash() {
            return Err(ValidationError::InvalidSignature);
        }
        self.voter
            .verify_strict(&self.digest(), &self.signature)
            .map_err(|_| ValidationError::InvalidSignature)
    }
}

/// Everything a relayer needs to submit a vote on a voter's behalf
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RelayRequest {
    pub proof: Proof,
    pub signals: PublicSignals,
    pub authorization: RelayAuthorization,
}

impl RelayRequest {
    /// Sign `signals` for relaying at `nonce`
    pub fn new(secret: &SecretKey, proof: Proof, signals: PublicSignals, nonce: u64) -> Self {
        let authorization = RelayAuthorization::sign(secret, signals.election_id, &signals, nonce);
        RelayRequest {
            proof,
            signals,
            authorization,
        }
    }

    /// Pack into CBOR
    pub fn as_bytes(&self) -> Result<Vec<u8>, Error> {
        Ok(serde_cbor::to_vec(self)?)
    }

    /// Unpack from JSON or CBOR
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        match bytes.first() {
            None => Err(Error::DeserializationUnknownFormat),
            // If it starts with `{` then it's JSON
            Some(b'{') => Ok(serde_json::from_slice(bytes)?),
            Some(_) => Ok(serde_cbor::from_slice(bytes)?),
        }
    }
}
