use crate::*;

use light_poseidon::PoseidonError;
use thiserror::Error;

/// Error types
#[derive(Debug, Error)]
pub enum Error {
    #[error("zkballot: poseidon error: {0}")]
    Poseidon(#[from] PoseidonError),

    #[error("zkballot: signature error: {0}")]
    SignatureError(#[from] ed25519_dalek::SignatureError),

    #[error("zkballot: invalid field element - {0}")]
    FieldBadFormat(String),

    #[error("zkballot: invalid protocol parameters: {0}")]
    InvalidParams(String),

    #[error("zkballot: leaf index {index} out of range for a tree of depth {depth}")]
    LeafIndexOutOfRange { index: u64, depth: usize },

    #[error("zkballot: a different leaf is already placed at index {0}")]
    LeafConflict(u64),

    #[error("zkballot: inconsistent tree - root {found} computed for index {index} does not match {expected}")]
    InconsistentTree {
        index: u64,
        expected: String,
        found: String,
    },

    #[error("zkballot: malformed public signals - expected {expected} values, found {found}")]
    MalformedSignals { expected: usize, found: usize },

    #[error("zkballot: circuit not satisfied: {0}")]
    Unsatisfied(#[from] ConstraintError),

    #[error("zkballot: CBOR error: {0}")]
    CBOR(#[from] serde_cbor::Error),

    #[error("zkballot: JSON error: {0}")]
    JSON(#[from] serde_json::Error),

    #[error("zkballot: error deserializing: unknown format")]
    DeserializationUnknownFormat,

    #[error("zkballot: groth16 error: {0}")]
    Groth16(String),
}

/// Vote-update constraint violations.
///
/// Each variant names the constraint group of the vote circuit that the witness fails.
#[derive(Debug, Error)]
pub enum ConstraintError {
    #[error("constraint: witness shape mismatch: {0}")]
    WitnessShape(&'static str),

    #[error("constraint: path direction at level {0} is not boolean")]
    NonBooleanDirection(usize),

    #[error("constraint: recomputed merkle root does not match voter root")]
    Membership,

    #[error("constraint: nullifier hash does not match secret and election")]
    Nullifier,

    #[error("constraint: candidate index is not below the candidate count")]
    CandidateRange,

    #[error("constraint: candidate count exceeds the protocol maximum")]
    CandidateCountRange,

    #[error("constraint: inverse witness at slot {0} is neither an inverse nor zero")]
    InverseWitness(usize),

    #[error("constraint: selector at slot {0} is not an indicator")]
    Selector(usize),

    #[error("constraint: tally slot {0} does not equal old tally plus selector")]
    TallyTransition(usize),

    #[error("constraint: published count for slot {0} does not match the tally")]
    ResultCount(usize),

    #[error("constraint: hash failure: {0}")]
    Hash(#[from] PoseidonError),
}

/// Vote and lifecycle validation errors
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("zkballot validation: proof failed to verify")]
    InvalidProof,

    #[error("zkballot validation: nullifier already consumed - voter already participated")]
    DoubleVote,

    #[error("zkballot validation: stale relay nonce - expected {expected}, found {found}")]
    StaleNonce { expected: u64, found: u64 },

    #[error("zkballot validation: stale tally - proof must be regenerated against tally version {version}")]
    StaleTally { version: u64 },

    #[error("zkballot validation: out of range: {0}")]
    OutOfRange(String),

    #[error("zkballot validation: published count for candidate {0} does not match the tally")]
    ResultMismatch(usize),

    #[error("zkballot validation: expected {expected} published counts, found {found}")]
    ResultLengthMismatch { expected: usize, found: usize },

    #[error("zkballot validation: relay signature verification failed")]
    InvalidSignature,

    #[error("zkballot validation: election is {actual:?}, operation requires {expected:?}")]
    WrongState {
        expected: ElectionStatus,
        actual: ElectionStatus,
    },

    #[error("zkballot validation: election mismatch")]
    ElectionMismatch,

    #[error("zkballot validation: voter root does not match the eligibility root")]
    RootMismatch,

    #[error("zkballot validation: candidate count does not match the election")]
    CandidateCountMismatch,

    #[error("zkballot validation: malformed public signals - expected {expected} values, found {found}")]
    MalformedSignals { expected: usize, found: usize },

    #[error("zkballot validation: caller is not the election authority")]
    Unauthorized,

    #[error("zkballot validation: results already published")]
    ResultsAlreadyPublished,

    #[error("zkballot validation: results not yet published")]
    ResultsNotPublished,

    #[error("zkballot validation: election {0} not found")]
    ElectionNotFound(ElectionId),

    #[error("zkballot validation: election {0} already initialized")]
    ElectionExists(ElectionId),

    #[error("zkballot validation: invalid election configuration: {0}")]
    InvalidConfig(String),

    #[error("zkballot validation: {0}")]
    Crypto(#[from] Error),
}

impl ValidationError {
    /// Whether the caller may retry after refreshing its inputs.
    ///
    /// A stale nonce is fixed by re-signing with the current nonce, a stale tally by
    /// regenerating the proof against the latest tally. Everything else is fatal.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ValidationError::StaleNonce { .. } | ValidationError::StaleTally { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_classes() {
        assert!(ValidationError::StaleTally { version: 3 }.is_retryable());
        assert!(ValidationError::StaleNonce {
            expected: 1,
            found: 0
        }
        .is_retryable());

        assert!(!ValidationError::DoubleVote.is_retryable());
        assert!(!ValidationError::InvalidProof.is_retryable());
        assert!(!ValidationError::ResultMismatch(0).is_retryable());
        assert!(!ValidationError::OutOfRange("slot".to_owned()).is_retryable());
    }
}
