use crate::*;

/// Default eligibility tree depth (2^20 voters)
pub const DEFAULT_TREE_DEPTH: usize = 20;

/// Default protocol-wide upper bound on candidates (M_MAX)
pub const DEFAULT_MAX_CANDIDATES: usize = 8;

/// Deepest supported eligibility tree
pub const MAX_TREE_DEPTH: usize = 32;

/// Bit width of the candidate range gadget. Candidate indices and counts must fit.
pub const CANDIDATE_INDEX_BITS: usize = 8;

/// Protocol-wide circuit shape.
///
/// Both values are fixed by the circuit and its verifying key: every election verified
/// with the same key shares them, whatever its actual candidate count.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProtocolParams {
    /// Depth D of the eligibility tree
    pub tree_depth: usize,

    /// Length M_MAX of every tally vector
    pub max_candidates: usize,
}

impl Default for ProtocolParams {
    fn default() -> Self {
        ProtocolParams {
            tree_depth: DEFAULT_TREE_DEPTH,
            max_candidates: DEFAULT_MAX_CANDIDATES,
        }
    }
}

impl ProtocolParams {
    pub fn new(tree_depth: usize, max_candidates: usize) -> Self {
        ProtocolParams {
            tree_depth,
            max_candidates,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.tree_depth == 0 || self.tree_depth > MAX_TREE_DEPTH {
            return Err(Error::InvalidParams(format!(
                "tree depth must be between 1 and {}, got {}",
                MAX_TREE_DEPTH, self.tree_depth
            )));
        }
        if self.max_candidates == 0 || self.max_candidates >= 1 << CANDIDATE_INDEX_BITS {
            return Err(Error::InvalidParams(format!(
                "max candidates must be between 1 and {}, got {}",
                (1 << CANDIDATE_INDEX_BITS) - 1,
                self.max_candidates
            )));
        }
        Ok(())
    }

    /// Number of leaves the eligibility tree can hold
    pub fn capacity(&self) -> u64 {
        1u64 << self.tree_depth
    }

    /// Length of the vote public-signal vector: 4 + 2 * M_MAX
    pub fn public_signal_count(&self) -> usize {
        4 + 2 * self.max_candidates
    }

    /// Length of the result-publication statement: election id, tally and counts
    pub fn result_input_count(&self) -> usize {
        1 + 2 * self.max_candidates
    }
}
