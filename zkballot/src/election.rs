use crate::*;
use ark_ff::Zero;
use ed25519_dalek::PublicKey;
use ed25519_dalek::Signature;
use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Election lifecycle. Transitions only move forward: Created -> Open -> Closed.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ElectionStatus {
    Created,
    Open,
    Closed,
}

/// Election setup supplied by whoever manages the roster and candidate list
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ElectionConfig {
    pub election_id: ElectionId,

    /// Number of real candidates. Slots from here up to `params.max_candidates` are padding.
    pub m_actual: usize,

    /// Root of the eligibility tree over `Hash(secret)` leaves
    #[serde(with = "FrHex")]
    pub eligibility_root: Fr,

    /// Key allowed to open, close and publish
    #[serde(with = "EdPublicKeyHex")]
    pub authority: PublicKey,

    #[serde(default)]
    pub params: ProtocolParams,
}

impl ElectionConfig {
    pub fn new(
        election_id: ElectionId,
        m_actual: usize,
        eligibility_root: Fr,
        authority: PublicKey,
    ) -> Self {
        ElectionConfig {
            election_id,
            m_actual,
            eligibility_root,
            authority,
            params: ProtocolParams::default(),
        }
    }

    pub fn with_params(mut self, params: ProtocolParams) -> Self {
        self.params = params;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.params
            .validate()
            .map_err(|e| ValidationError::InvalidConfig(e.to_string()))?;

        if self.m_actual == 0 {
            return Err(ValidationError::InvalidConfig(
                "an election needs at least one candidate".to_owned(),
            ));
        }
        if self.m_actual > self.params.max_candidates {
            return Err(ValidationError::OutOfRange(format!(
                "{} candidates exceed the maximum of {}",
                self.m_actual, self.params.max_candidates
            )));
        }
        if self.eligibility_root.is_zero()
            || self.eligibility_root == empty_root(self.params.tree_depth)?
        {
            return Err(ValidationError::InvalidConfig(
                "eligibility root does not commit to any voter".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Auxiliary data accompanying a result publication
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct AuxData {
    /// Proof over `(electionId, tally, counts)`, required when a tally verifier is registered
    #[serde(default)]
    pub proof: Option<Proof>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FinalResult {
    pub counts: Vec<u64>,
    pub tally_version: u64,

    /// Audit material supplied at publication
    #[serde(default)]
    pub aux: AuxData,
}

/// Confirmation returned for an accepted vote
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct VoteReceipt {
    pub election_id: ElectionId,

    #[serde(with = "FrHex")]
    pub nullifier_hash: Fr,

    /// Tally version after this vote
    pub tally_version: u64,

    /// Nonce consumed, for relayed votes
    pub nonce: Option<u64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum ElectionEvent {
    ElectionInitialized {
        election_id: ElectionId,
    },
    ElectionOpened {
        election_id: ElectionId,
    },
    VoteAccepted {
        election_id: ElectionId,
        #[serde(with = "FrHex")]
        nullifier_hash: Fr,
    },
    ElectionClosed {
        election_id: ElectionId,
        tally_version: u64,
    },
    ResultsPublished {
        election_id: ElectionId,
        counts: Vec<u64>,
    },
}

/// Outcome of relay signature verification, computed before entering the commit section
#[derive(Clone, Copy, Debug)]
pub struct RelayCheck {
    pub voter: PublicKey,
    pub nonce: u64,
    pub signature_valid: bool,
}

/// One election's verifier state and tally store
pub struct Election {
    config: ElectionConfig,
    verifier: Arc<dyn ProofVerifier>,
    tally_verifier: Option<Arc<dyn ProofVerifier>>,
    status: ElectionStatus,
    tally: TallyVector,
    tally_version: u64,
    nullifiers: BTreeSet<Fr>,
    nonces: BTreeMap<[u8; 32], u64>,
    result: Option<FinalResult>,
    events: Vec<ElectionEvent>,
}

impl Election {
    /// Create an election in the `Created` state with an all-zero tally.
    ///
    /// `tally_verifier`, when given, gates `publish_results` on a result proof.
    pub fn initialize(
        config: ElectionConfig,
        verifier: Arc<dyn ProofVerifier>,
        tally_verifier: Option<Arc<dyn ProofVerifier>>,
    ) -> Result<Self, ValidationError> {
        config.validate()?;

        let expected = config.params.public_signal_count();
        if let Some(count) = verifier.public_input_count() {
            if count != expected {
                return Err(ValidationError::InvalidConfig(format!(
                    "verifying key takes {} public inputs, the vote circuit has {}",
                    count, expected
                )));
            }
        }
        if let Some(tally_verifier) = &tally_verifier {
            let expected = config.params.result_input_count();
            if let Some(count) = tally_verifier.public_input_count() {
                if count != expected {
                    return Err(ValidationError::InvalidConfig(format!(
                        "result verifying key takes {} public inputs, expected {}",
                        count, expected
                    )));
                }
            }
        }

        let election_id = config.election_id;
        let tally = TallyVector::zero(config.params.max_candidates);
        info!(
            "election {}: initialized with {} candidates",
            election_id, config.m_actual
        );
        Ok(Election {
            config,
            verifier,
            tally_verifier,
            status: ElectionStatus::Created,
            tally,
            tally_version: 0,
            nullifiers: BTreeSet::new(),
            nonces: BTreeMap::new(),
            result: None,
            events: vec![ElectionEvent::ElectionInitialized { election_id }],
        })
    }

    pub fn id(&self) -> ElectionId {
        self.config.election_id
    }

    pub fn config(&self) -> &ElectionConfig {
        &self.config
    }

    pub fn status(&self) -> ElectionStatus {
        self.status
    }

    pub fn verifier(&self) -> &Arc<dyn ProofVerifier> {
        &self.verifier
    }

    /// Number of votes committed so far
    pub fn tally_version(&self) -> u64 {
        self.tally_version
    }

    pub fn events(&self) -> &[ElectionEvent] {
        &self.events
    }

    pub fn get_tally_commitments(&self) -> &TallyVector {
        &self.tally
    }

    pub fn get_results(&self) -> Result<&FinalResult, ValidationError> {
        self.result
            .as_ref()
            .ok_or(ValidationError::ResultsNotPublished)
    }

    /// The nonce the voter's next relayed vote must carry
    pub fn nonce_of(&self, voter: &PublicKey) -> u64 {
        self.nonces.get(voter.as_bytes()).copied().unwrap_or(0)
    }

    pub fn is_nullifier_consumed(&self, nullifier_hash: &Fr) -> bool {
        self.nullifiers.contains(nullifier_hash)
    }

    fn authorize(&self, caller: &PublicKey) -> Result<(), ValidationError> {
        if *caller != self.config.authority {
            return Err(ValidationError::Unauthorized);
        }
        Ok(())
    }

    fn require_status(&self, expected: ElectionStatus) -> Result<(), ValidationError> {
        if self.status != expected {
            return Err(ValidationError::WrongState {
                expected,
                actual: self.status,
            });
        }
        Ok(())
    }

    pub fn open_election(&mut self, caller: &PublicKey) -> Result<(), ValidationError> {
        self.authorize(caller)?;
        self.require_status(ElectionStatus::Created)?;
        self.status = ElectionStatus::Open;
        self.events.push(ElectionEvent::ElectionOpened {
            election_id: self.id(),
        });
        info!("election {}: open", self.id());
        Ok(())
    }

    /// Check that signals are about this election and shaped for it
    pub fn check_binding(&self, signals: &PublicSignals) -> Result<(), ValidationError> {
        let max_candidates = self.config.params.max_candidates;
        if signals.old_tally.len() != max_candidates || signals.new_tally.len() != max_candidates
        {
            return Err(ValidationError::MalformedSignals {
                expected: self.config.params.public_signal_count(),
                found: signals.signal_count(),
            });
        }
        if signals.election_id != self.config.election_id {
            return Err(ValidationError::ElectionMismatch);
        }
        if signals.voter_root != self.config.eligibility_root {
            return Err(ValidationError::RootMismatch);
        }
        if signals.m_actual != fr_from_u64(self.config.m_actual as u64) {
            return Err(ValidationError::CandidateCountMismatch);
        }
        for slot in self.config.m_actual..max_candidates {
            if !signals.new_tally[slot].is_zero() {
                return Err(ValidationError::OutOfRange(format!(
                    "tally slot {} is padding, the election has {} candidates",
                    slot, self.config.m_actual
                )));
            }
        }
        Ok(())
    }

    /// Verify and apply a direct vote
    pub fn submit_vote(
        &mut self,
        proof: &Proof,
        signals: &PublicSignals,
    ) -> Result<VoteReceipt, ValidationError> {
        if let Err(e) = self.require_status(ElectionStatus::Open) {
            warn!("election {}: rejected vote: {}", self.id(), e);
            return Err(e);
        }
        let proof_valid = self.verifier.verify(proof, &signals.to_field_vec());
        self.commit_vote(signals, proof_valid, None)
    }

    /// Verify and apply a vote submitted by a relayer on the voter's behalf.
    ///
    /// `signature` must be the voter's signature over `(electionId, hash(signals), nonce)`
    /// and `nonce` the voter's current nonce. The nonce only advances on success.
    pub fn vote_relayed(
        &mut self,
        proof: &Proof,
        signals: &PublicSignals,
        nonce: u64,
        voter: &PublicKey,
        signature: &Signature,
    ) -> Result<VoteReceipt, ValidationError> {
        if let Err(e) = self.require_status(ElectionStatus::Open) {
            warn!("election {}: rejected relayed vote: {}", self.id(), e);
            return Err(e);
        }
        let relay = RelayCheck {
            voter: *voter,
            nonce,
            signature_valid: verify_relay_signature(voter, self.id(), signals, nonce, signature),
        };
        let proof_valid = self.verifier.verify(proof, &signals.to_field_vec());
        self.commit_vote(signals, proof_valid, Some(relay))
    }

    pub fn relay(&mut self, request: &RelayRequest) -> Result<VoteReceipt, ValidationError> {
        let auth = &request.authorization;
        self.vote_relayed(
            &request.proof,
            &request.signals,
            auth.nonce,
            &auth.voter,
            &auth.signature,
        )
    }

    /// Apply a vote whose proof (and relay signature) were verified beforehand.
    ///
    /// Either every effect happens or none does: nullifier, tally, version, nonce and event.
    pub fn commit_vote(
        &mut self,
        signals: &PublicSignals,
        proof_valid: bool,
        relay: Option<RelayCheck>,
    ) -> Result<VoteReceipt, ValidationError> {
        let result = self.try_commit_vote(signals, proof_valid, relay);
        if let Err(e) = &result {
            warn!("election {}: rejected vote: {}", self.id(), e);
        }
        result
    }

    fn try_commit_vote(
        &mut self,
        signals: &PublicSignals,
        proof_valid: bool,
        relay: Option<RelayCheck>,
    ) -> Result<VoteReceipt, ValidationError> {
        self.require_status(ElectionStatus::Open)?;

        if let Some(relay) = &relay {
            if !relay.signature_valid {
                return Err(ValidationError::InvalidSignature);
            }
            let current = self.nonce_of(&relay.voter);
            if relay.nonce != current {
                return Err(ValidationError::StaleNonce {
                    expected: current,
                    found: relay.nonce,
                });
            }
        }

        self.check_binding(signals)?;

        // Checked before the tally so that racing submissions of one nullifier see DoubleVote
        if self.nullifiers.contains(&signals.nullifier_hash) {
            return Err(ValidationError::DoubleVote);
        }
        if signals.old_tally != self.tally {
            return Err(ValidationError::StaleTally {
                version: self.tally_version,
            });
        }
        if !proof_valid {
            return Err(ValidationError::InvalidProof);
        }

        self.nullifiers.insert(signals.nullifier_hash);
        self.tally = signals.new_tally.clone();
        self.tally_version += 1;
        let nonce = relay.map(|relay| {
            let next = self.nonces.entry(relay.voter.to_bytes()).or_insert(0);
            *next += 1;
            relay.nonce
        });
        self.events.push(ElectionEvent::VoteAccepted {
            election_id: self.id(),
            nullifier_hash: signals.nullifier_hash,
        });
        info!(
            "election {}: vote accepted, tally version {}",
            self.id(),
            self.tally_version
        );
        debug!("nullifier {}", fr_to_hex(&signals.nullifier_hash));

        Ok(VoteReceipt {
            election_id: self.id(),
            nullifier_hash: signals.nullifier_hash,
            tally_version: self.tally_version,
            nonce,
        })
    }

    pub fn close_election(&mut self, caller: &PublicKey) -> Result<(), ValidationError> {
        self.authorize(caller)?;
        self.require_status(ElectionStatus::Open)?;
        self.status = ElectionStatus::Closed;
        self.events.push(ElectionEvent::ElectionClosed {
            election_id: self.id(),
            tally_version: self.tally_version,
        });
        info!(
            "election {}: closed after {} votes",
            self.id(),
            self.tally_version
        );
        Ok(())
    }

    /// Finalize plaintext counts. Each count must equal its tally slot.
    pub fn publish_results(
        &mut self,
        caller: &PublicKey,
        counts: &[u64],
        aux: &AuxData,
    ) -> Result<FinalResult, ValidationError> {
        self.authorize(caller)?;
        self.require_status(ElectionStatus::Closed)?;
        if self.result.is_some() {
            return Err(ValidationError::ResultsAlreadyPublished);
        }
        if counts.len() != self.config.m_actual {
            return Err(ValidationError::ResultLengthMismatch {
                expected: self.config.m_actual,
                found: counts.len(),
            });
        }
        for (slot, count) in counts.iter().enumerate() {
            if fr_from_u64(*count) != self.tally[slot] {
                warn!(
                    "election {}: published count for slot {} does not match the tally",
                    self.id(),
                    slot
                );
                return Err(ValidationError::ResultMismatch(slot));
            }
        }

        if let Some(tally_verifier) = &self.tally_verifier {
            let inputs = result_public_inputs(
                self.id(),
                &self.tally,
                counts,
                self.config.params.max_candidates,
            );
            let valid = match &aux.proof {
                Some(proof) => tally_verifier.verify(proof, &inputs),
                None => false,
            };
            if !valid {
                return Err(ValidationError::InvalidProof);
            }
        }

        let result = FinalResult {
            counts: counts.to_vec(),
            tally_version: self.tally_version,
            aux: aux.clone(),
        };
        self.result = Some(result.clone());
        self.events.push(ElectionEvent::ResultsPublished {
            election_id: self.id(),
            counts: result.counts.clone(),
        });
        info!("election {}: results published", self.id());
        Ok(result)
    }
}
