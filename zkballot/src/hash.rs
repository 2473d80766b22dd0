//! Poseidon hashing (circom-compatible parameters over BN254).

use crate::*;
use light_poseidon::{Poseidon, PoseidonError, PoseidonHasher};

/// Reusable Poseidon instances for the one- and two-input hashes.
///
/// Building the round constants is the expensive part of a hash, so tree and circuit
/// code builds one `FieldHasher` and reuses it for every node.
pub struct FieldHasher {
    one: Poseidon<Fr>,
    two: Poseidon<Fr>,
}

impl FieldHasher {
    pub fn new() -> Result<Self, PoseidonError> {
        Ok(FieldHasher {
            one: Poseidon::<Fr>::new_circom(1)?,
            two: Poseidon::<Fr>::new_circom(2)?,
        })
    }

    pub fn hash1(&mut self, a: Fr) -> Result<Fr, PoseidonError> {
        self.one.hash(&[a])
    }

    pub fn compress2to1(&mut self, a: Fr, b: Fr) -> Result<Fr, PoseidonError> {
        self.two.hash(&[a, b])
    }
}

/// Two-to-one compression used for Merkle nodes and nullifiers
pub fn compress2to1(a: Fr, b: Fr) -> Result<Fr, PoseidonError> {
    FieldHasher::new()?.compress2to1(a, b)
}

pub fn hash1(a: Fr) -> Result<Fr, PoseidonError> {
    FieldHasher::new()?.hash1(a)
}

/// Eligibility leaf committed to by a voter secret: `Hash(secret)`
pub fn leaf_commitment(secret: Fr) -> Result<Fr, PoseidonError> {
    hash1(secret)
}

/// Per-election nullifier: `Hash(secret, electionId)`.
///
/// Independent of the chosen candidate, so a voter has exactly one per election.
pub fn nullifier_hash(secret: Fr, election_id: ElectionId) -> Result<Fr, PoseidonError> {
    compress2to1(secret, election_id.as_fr())
}
