use crate::*;
use ark_ff::Zero;
use digest::Digest;
use sha3::Keccak256;
use std::ops::Deref;

/// Fixed-length vector of opaque per-candidate accumulators
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TallyVector(#[serde(with = "FrVecHex")] pub Vec<Fr>);

impl TallyVector {
    /// All-zero tally of `len` slots
    pub fn zero(len: usize) -> Self {
        TallyVector(vec![Fr::zero(); len])
    }

    pub fn as_slice(&self) -> &[Fr] {
        &self.0
    }

    /// Slots whose value differs from `other`
    pub fn changed_slots(&self, other: &TallyVector) -> Vec<usize> {
        self.0
            .iter()
            .zip(other.0.iter())
            .enumerate()
            .filter(|(_, (a, b))| a != b)
            .map(|(i, _)| i)
            .collect()
    }

    /// The first `m_actual` slots as integers, if every one fits in a u64
    pub fn counts(&self, m_actual: usize) -> Option<Vec<u64>> {
        self.0.iter().take(m_actual).map(fr_to_u64).collect()
    }
}

impl Deref for TallyVector {
    type Target = [Fr];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<Fr>> for TallyVector {
    fn from(item: Vec<Fr>) -> Self {
        TallyVector(item)
    }
}

/// Public inputs of a vote-update proof
///
/// Flattened order: `electionId, voterRoot, nullifierHash, oldC[M_MAX], newC[M_MAX], mActual`.
/// Neither the candidate nor the voter secret appears here.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PublicSignals {
    pub election_id: ElectionId,

    #[serde(with = "FrHex")]
    pub voter_root: Fr,

    #[serde(with = "FrHex")]
    pub nullifier_hash: Fr,

    pub old_tally: TallyVector,
    pub new_tally: TallyVector,

    #[serde(with = "FrHex")]
    pub m_actual: Fr,
}

impl PublicSignals {
    /// Flatten into the ordered public-input vector
    pub fn to_field_vec(&self) -> Vec<Fr> {
        let mut values = Vec::with_capacity(4 + self.old_tally.len() + self.new_tally.len());
        values.push(self.election_id.as_fr());
        values.push(self.voter_root);
        values.push(self.nullifier_hash);
        values.extend_from_slice(&self.old_tally);
        values.extend_from_slice(&self.new_tally);
        values.push(self.m_actual);
        values
    }

    /// Rebuild from a flat public-input vector of exactly `4 + 2 * max_candidates` values
    pub fn from_field_vec(values: &[Fr], max_candidates: usize) -> Result<Self, Error> {
        let expected = 4 + 2 * max_candidates;
        if values.len() != expected {
            return Err(Error::MalformedSignals {
                expected,
                found: values.len(),
            });
        }
        let m = max_candidates;
        Ok(PublicSignals {
            election_id: ElectionId::new(values[0]),
            voter_root: values[1],
            nullifier_hash: values[2],
            old_tally: TallyVector(values[3..3 + m].to_vec()),
            new_tally: TallyVector(values[3 + m..3 + 2 * m].to_vec()),
            m_actual: values[3 + 2 * m],
        })
    }

    /// Number of scalar values these signals flatten to
    pub fn signal_count(&self) -> usize {
        4 + self.old_tally.len() + self.new_tally.len()
    }

    /// keccak256 over the packed 32-byte big-endian encoding of every signal
    pub fn hash(&self) -> [u8; 32] {
        let mut hasher = Keccak256::new();
        for value in self.to_field_vec() {
            hasher.update(&fr_to_be_bytes(&value));
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(&hasher.finalize());
        out
    }
}
