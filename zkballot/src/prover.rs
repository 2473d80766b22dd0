use crate::*;
use ed25519_dalek::ExpandedSecretKey;
use ed25519_dalek::PublicKey;
use ed25519_dalek::SecretKey;
use log::debug;

/// Everything a voter supplies to build a vote
pub struct VoteRequest<'a> {
    pub election_id: ElectionId,
    pub secret: Fr,
    pub candidate_index: u64,
    pub path: &'a MerklePath,

    /// The latest committed tally; the proof is only valid against exactly this state
    pub current_tally: &'a TallyVector,
    pub m_actual: usize,
}

/// Derive public signals and the private witness for a vote.
///
/// No constraint is checked here, so a bad request produces signals the circuit rejects.
pub fn build_vote(
    params: &ProtocolParams,
    request: &VoteRequest,
) -> Result<(PublicSignals, VoteWitness), Error> {
    params.validate()?;
    if request.current_tally.len() != params.max_candidates {
        return Err(Error::MalformedSignals {
            expected: params.public_signal_count(),
            found: 4 + 2 * request.current_tally.len(),
        });
    }
    if request.path.depth() != params.tree_depth {
        return Err(Error::InvalidParams(format!(
            "merkle path has depth {}, tree depth is {}",
            request.path.depth(),
            params.tree_depth
        )));
    }

    let witness = VoteWitness::new(
        request.secret,
        request.candidate_index,
        request.path,
        params.max_candidates,
    );
    let selector = selector_vector(witness.candidate_index, &witness.inv)?;
    let new_tally = apply_selector(request.current_tally, &selector);

    let signals = PublicSignals {
        election_id: request.election_id,
        voter_root: request.path.root,
        nullifier_hash: nullifier_hash(request.secret, request.election_id)?,
        old_tally: request.current_tally.clone(),
        new_tally: TallyVector(new_tally),
        m_actual: fr_from_u64(request.m_actual as u64),
    };
    Ok((signals, witness))
}

/// Flattened result-publication statement: `electionId, tally[M_MAX], counts padded to M_MAX`
pub fn result_public_inputs(
    election_id: ElectionId,
    tally: &[Fr],
    counts: &[u64],
    max_candidates: usize,
) -> Vec<Fr> {
    let mut inputs = Vec::with_capacity(1 + 2 * max_candidates);
    inputs.push(election_id.as_fr());
    inputs.extend(
        (0..max_candidates).map(|i| tally.get(i).copied().unwrap_or_else(|| fr_from_u64(0))),
    );
    inputs.extend((0..max_candidates).map(|i| fr_from_u64(counts.get(i).copied().unwrap_or(0))));
    inputs
}

/// Proving service for the attestation backend
pub struct AttestingProver {
    secret: SecretKey,
    public: PublicKey,
    params: ProtocolParams,
}

impl AttestingProver {
    pub fn new(secret: SecretKey, params: ProtocolParams) -> Self {
        let public = PublicKey::from(&secret);
        AttestingProver {
            secret,
            public,
            params,
        }
    }

    /// A prover with a fresh random proving key
    pub fn generate(params: ProtocolParams) -> Self {
        let (secret, _public) = generate_keypair();
        AttestingProver::new(secret, params)
    }

    pub fn params(&self) -> &ProtocolParams {
        &self.params
    }

    pub fn public_key(&self) -> PublicKey {
        self.public
    }

    /// Verifying key for vote-update proofs
    pub fn verifier(&self) -> AttestationVerifier {
        AttestationVerifier::new(
            self.public,
            VOTE_STATEMENT,
            self.params.public_signal_count(),
        )
    }

    /// Verifying key for result-publication proofs
    pub fn result_verifier(&self) -> AttestationVerifier {
        AttestationVerifier::new(
            self.public,
            RESULT_STATEMENT,
            self.params.result_input_count(),
        )
    }

    fn attest(&self, statement: &[u8], public_inputs: &[Fr]) -> Proof {
        let digest = attestation_digest(statement, public_inputs);
        let expanded: ExpandedSecretKey = (&self.secret).into();
        let signature = expanded.sign(&digest, &self.public);
        Proof(signature.to_bytes().to_vec())
    }

    /// Prove a vote-update statement. Fails if the witness does not satisfy the circuit.
    pub fn prove(&self, signals: &PublicSignals, witness: &VoteWitness) -> Result<Proof, Error> {
        VoteCircuit::new(&self.params, signals, witness).check()?;
        debug!(
            "attesting vote update for election {}",
            signals.election_id
        );
        Ok(self.attest(VOTE_STATEMENT, &signals.to_field_vec()))
    }

    /// Build and prove a vote in one step
    pub fn prove_vote(&self, request: &VoteRequest) -> Result<(Proof, PublicSignals), Error> {
        let (signals, witness) = build_vote(&self.params, request)?;
        let proof = self.prove(&signals, &witness)?;
        Ok((proof, signals))
    }

    /// Prove that `counts` are the first `counts.len()` tally slots and every later slot is zero
    pub fn prove_result(
        &self,
        election_id: ElectionId,
        tally: &TallyVector,
        counts: &[u64],
    ) -> Result<Proof, Error> {
        let m_max = self.params.max_candidates;
        if tally.len() != m_max || counts.len() > m_max {
            return Err(ConstraintError::WitnessShape("result statement length").into());
        }
        for (slot, value) in tally.iter().enumerate() {
            let count = counts.get(slot).copied().unwrap_or(0);
            if *value != fr_from_u64(count) {
                return Err(ConstraintError::ResultCount(slot).into());
            }
        }
        let inputs = result_public_inputs(election_id, tally, counts, m_max);
        Ok(self.attest(RESULT_STATEMENT, &inputs))
    }
}
