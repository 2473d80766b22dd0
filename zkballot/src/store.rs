use crate::*;
use ed25519_dalek::PublicKey;
use ed25519_dalek::Signature;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

/// A shareable election.
///
/// Proof and signature verification run without holding the election lock. Only the
/// check-then-commit sequence of a vote, and lifecycle transitions, are serialized.
pub struct ElectionHandle {
    id: ElectionId,
    verifier: Arc<dyn ProofVerifier>,
    state: Mutex<Election>,
}

impl ElectionHandle {
    pub fn new(election: Election) -> Self {
        ElectionHandle {
            id: election.id(),
            verifier: election.verifier().clone(),
            state: Mutex::new(election),
        }
    }

    pub fn id(&self) -> ElectionId {
        self.id
    }

    // Every mutation of an election either completes or returns before touching state,
    // so a panicking holder cannot leave it half-updated.
    fn lock(&self) -> MutexGuard<'_, Election> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against a consistent snapshot of the election
    pub fn with_election<T, F: FnOnce(&Election) -> T>(&self, f: F) -> T {
        f(&self.lock())
    }

    pub fn submit_vote(
        &self,
        proof: &Proof,
        signals: &PublicSignals,
    ) -> Result<VoteReceipt, ValidationError> {
        let proof_valid = self.verifier.verify(proof, &signals.to_field_vec());
        self.lock().commit_vote(signals, proof_valid, None)
    }

    pub fn vote_relayed(
        &self,
        proof: &Proof,
        signals: &PublicSignals,
        nonce: u64,
        voter: &PublicKey,
        signature: &Signature,
    ) -> Result<VoteReceipt, ValidationError> {
        let relay = RelayCheck {
            voter: *voter,
            nonce,
            signature_valid: verify_relay_signature(voter, self.id, signals, nonce, signature),
        };
        let proof_valid = self.verifier.verify(proof, &signals.to_field_vec());
        self.lock().commit_vote(signals, proof_valid, Some(relay))
    }

    pub fn relay(&self, request: &RelayRequest) -> Result<VoteReceipt, ValidationError> {
        let auth = &request.authorization;
        self.vote_relayed(
            &request.proof,
            &request.signals,
            auth.nonce,
            &auth.voter,
            &auth.signature,
        )
    }

    pub fn open_election(&self, caller: &PublicKey) -> Result<(), ValidationError> {
        self.lock().open_election(caller)
    }

    pub fn close_election(&self, caller: &PublicKey) -> Result<(), ValidationError> {
        self.lock().close_election(caller)
    }

    pub fn publish_results(
        &self,
        caller: &PublicKey,
        counts: &[u64],
        aux: &AuxData,
    ) -> Result<FinalResult, ValidationError> {
        self.lock().publish_results(caller, counts, aux)
    }

    pub fn get_tally_commitments(&self) -> TallyVector {
        self.lock().get_tally_commitments().clone()
    }

    pub fn get_results(&self) -> Result<FinalResult, ValidationError> {
        self.lock().get_results().map(Clone::clone)
    }

    pub fn status(&self) -> ElectionStatus {
        self.lock().status()
    }

    pub fn tally_version(&self) -> u64 {
        self.lock().tally_version()
    }

    pub fn nonce_of(&self, voter: &PublicKey) -> u64 {
        self.lock().nonce_of(voter)
    }

    pub fn is_nullifier_consumed(&self, nullifier_hash: &Fr) -> bool {
        self.lock().is_nullifier_consumed(nullifier_hash)
    }

    pub fn events(&self) -> Vec<ElectionEvent> {
        self.lock().events().to_vec()
    }
}

/// An election store
pub trait Store {
    /// Get an election by id
    fn get_election(&self, id: ElectionId) -> Option<Arc<ElectionHandle>>;

    /// Register an initialized election. Ids are never reused.
    fn insert_election(&self, election: Election) -> Result<Arc<ElectionHandle>, ValidationError>;

    fn election(&self, id: ElectionId) -> Result<Arc<ElectionHandle>, ValidationError> {
        self.get_election(id)
            .ok_or(ValidationError::ElectionNotFound(id))
    }

    fn initialize(
        &self,
        config: ElectionConfig,
        verifier: Arc<dyn ProofVerifier>,
        tally_verifier: Option<Arc<dyn ProofVerifier>>,
    ) -> Result<Arc<ElectionHandle>, ValidationError> {
        if self.get_election(config.election_id).is_some() {
            return Err(ValidationError::ElectionExists(config.election_id));
        }
        let election = Election::initialize(config, verifier, tally_verifier)?;
        self.insert_election(election)
    }

    fn submit_vote(
        &self,
        id: ElectionId,
        proof: &Proof,
        signals: &PublicSignals,
    ) -> Result<VoteReceipt, ValidationError> {
        self.election(id)?.submit_vote(proof, signals)
    }

    fn vote_relayed(
        &self,
        id: ElectionId,
        proof: &Proof,
        signals: &PublicSignals,
        nonce: u64,
        voter: &PublicKey,
        signature: &Signature,
    ) -> Result<VoteReceipt, ValidationError> {
        self.election(id)?
            .vote_relayed(proof, signals, nonce, voter, signature)
    }

    /// Submit a relay request to the election named in its authorization
    fn relay(&self, request: &RelayRequest) -> Result<VoteReceipt, ValidationError> {
        self.election(request.authorization.election_id)?
            .relay(request)
    }

    fn get_tally_commitments(&self, id: ElectionId) -> Result<TallyVector, ValidationError> {
        Ok(self.election(id)?.get_tally_commitments())
    }

    fn get_results(&self, id: ElectionId) -> Result<FinalResult, ValidationError> {
        self.election(id)?.get_results()
    }
}

/// A simple store that keeps elections in an in-memory BTreeMap
#[derive(Default)]
pub struct MemStore {
    inner: RwLock<BTreeMap<ElectionId, Arc<ElectionHandle>>>,
}

impl MemStore {
    pub fn election_ids(&self) -> Vec<ElectionId> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect()
    }
}

impl Store for MemStore {
    fn get_election(&self, id: ElectionId) -> Option<Arc<ElectionHandle>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    fn insert_election(&self, election: Election) -> Result<Arc<ElectionHandle>, ValidationError> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let id = election.id();
        if inner.contains_key(&id) {
            return Err(ValidationError::ElectionExists(id));
        }
        let handle = Arc::new(ElectionHandle::new(election));
        inner.insert(id, handle.clone());
        Ok(handle)
    }
}
