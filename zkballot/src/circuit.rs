//! Constraint model of the vote-update circuit.
//!
//! Public inputs: `electionId, voterRoot, nullifierHash, oldC[M_MAX], newC[M_MAX], mActual`.
//! Private witness: `secret, candidateIndex, pathElements[D], pathDirections[D], inv[M_MAX]`.
//!
//! `VoteCircuit::check` evaluates every constraint over a concrete assignment, in the
//! same arithmetic a prover's circuit uses. Nothing here branches on the candidate: the
//! slot that moves is picked out by the inverse-based equality selector.

use crate::*;
use ark_ff::{Field, One, Zero};

/// Private inputs of the vote-update circuit
#[derive(Clone)]
pub struct VoteWitness {
    pub secret: Fr,
    pub candidate_index: Fr,
    pub path_elements: Vec<Fr>,

    /// One field element per level, constrained to be 0 or 1
    pub path_directions: Vec<Fr>,

    /// `inv[i]` is the inverse of `candidate_index - i`, or zero where that difference is zero
    pub inv: Vec<Fr>,
}

impl VoteWitness {
    /// Honest witness for voting `candidate_index` with the leaf at `path`
    pub fn new(secret: Fr, candidate_index: u64, path: &MerklePath, max_candidates: usize) -> Self {
        let candidate_index = fr_from_u64(candidate_index);
        VoteWitness {
            secret,
            candidate_index,
            path_elements: path.elements.clone(),
            path_directions: path
                .directions
                .iter()
                .map(|is_right| if *is_right { Fr::one() } else { Fr::zero() })
                .collect(),
            inv: inverse_witness(candidate_index, max_candidates),
        }
    }
}

/// `inv[i] = inverse(candidate_index - i)` for every slot, with `inverse(0) = 0`
pub fn inverse_witness(candidate_index: Fr, slots: usize) -> Vec<Fr> {
    (0..slots)
        .map(|i| inverse(candidate_index - fr_from_u64(i as u64)))
        .collect()
}

/// Equality selector over all slots, checked against the `inv` witness.
///
/// For each slot `diff = candidate_index - i` and `selector = 1 - diff * inv[i]`, subject to
/// - `diff * inv[i] * diff == diff`: `inv[i]` is a true inverse unless `diff` is zero
/// - `selector * diff == 0`: the selector is exactly the indicator of `i == candidate_index`
pub fn selector_vector(candidate_index: Fr, inv: &[Fr]) -> Result<Vec<Fr>, ConstraintError> {
    let mut selector = Vec::with_capacity(inv.len());
    for (i, inv_i) in inv.iter().enumerate() {
        let diff = candidate_index - fr_from_u64(i as u64);
        if diff * inv_i * diff != diff {
            return Err(ConstraintError::InverseWitness(i));
        }
        let indicator = Fr::one() - diff * inv_i;
        if indicator * diff != Fr::zero() {
            return Err(ConstraintError::Selector(i));
        }
        selector.push(indicator);
    }
    Ok(selector)
}

/// `new[i] = old[i] + selector[i]`
pub fn apply_selector(old: &[Fr], selector: &[Fr]) -> Vec<Fr> {
    old.iter().zip(selector.iter()).map(|(o, s)| *o + s).collect()
}

/// `LessThan(n)` comparator: whether `a < b`, for `a` and `b` below `2^n`.
///
/// Decomposes `a + 2^n - b` into `n + 1` bits; the top bit is set exactly when `a >= b`.
/// `None` means the decomposition is unsatisfiable (an operand was out of range).
pub fn less_than(a: Fr, b: Fr, n: usize) -> Option<bool> {
    let offset = Fr::from(2u64).pow([n as u64]);
    let bits = fr_to_bits_le(&(a + offset - b), n + 1)?;
    Some(!bits[n])
}

/// A vote-update statement together with a candidate assignment
pub struct VoteCircuit<'a> {
    pub params: &'a ProtocolParams,
    pub signals: &'a PublicSignals,
    pub witness: &'a VoteWitness,
}

impl<'a> VoteCircuit<'a> {
    pub fn new(
        params: &'a ProtocolParams,
        signals: &'a PublicSignals,
        witness: &'a VoteWitness,
    ) -> Self {
        VoteCircuit {
            params,
            signals,
            witness,
        }
    }

    /// Evaluate every constraint, failing on the first unsatisfied one
    pub fn check(&self) -> Result<(), ConstraintError> {
        let depth = self.params.tree_depth;
        let m_max = self.params.max_candidates;
        let signals = self.signals;
        let witness = self.witness;

        if witness.path_elements.len() != depth || witness.path_directions.len() != depth {
            return Err(ConstraintError::WitnessShape("merkle path length"));
        }
        if witness.inv.len() != m_max {
            return Err(ConstraintError::WitnessShape("inverse witness length"));
        }
        if signals.old_tally.len() != m_max || signals.new_tally.len() != m_max {
            return Err(ConstraintError::WitnessShape("tally vector length"));
        }

        let mut hasher = FieldHasher::new()?;

        // Membership
        let mut node = hasher.hash1(witness.secret)?;
        let levels = witness
            .path_elements
            .iter()
            .zip(witness.path_directions.iter());
        for (level, (sibling, direction)) in levels.enumerate() {
            let d = *direction;
            if d * (d - Fr::one()) != Fr::zero() {
                return Err(ConstraintError::NonBooleanDirection(level));
            }
            let left = node + d * (*sibling - node);
            let right = *sibling + d * (node - *sibling);
            node = hasher.compress2to1(left, right)?;
        }
        if node != signals.voter_root {
            return Err(ConstraintError::Membership);
        }

        // Nullifier
        let nullifier = hasher.compress2to1(witness.secret, signals.election_id.as_fr())?;
        if nullifier != signals.nullifier_hash {
            return Err(ConstraintError::Nullifier);
        }

        // Range: 0 <= candidateIndex < mActual <= M_MAX
        let bits = CANDIDATE_INDEX_BITS;
        if fr_to_bits_le(&witness.candidate_index, bits).is_none() {
            return Err(ConstraintError::CandidateRange);
        }
        if fr_to_bits_le(&signals.m_actual, bits).is_none() {
            return Err(ConstraintError::CandidateCountRange);
        }
        if less_than(witness.candidate_index, signals.m_actual, bits + 1) != Some(true) {
            return Err(ConstraintError::CandidateRange);
        }
        let bound = fr_from_u64(m_max as u64 + 1);
        if less_than(signals.m_actual, bound, bits + 1) != Some(true) {
            return Err(ConstraintError::CandidateCountRange);
        }

        // Single-slot increment
        let selector = selector_vector(witness.candidate_index, &witness.inv)?;
        for slot in 0..m_max {
            if signals.new_tally[slot] != signals.old_tally[slot] + selector[slot] {
                return Err(ConstraintError::TallyTransition(slot));
            }
        }

        Ok(())
    }
}
