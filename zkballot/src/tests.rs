use super::*;
use ark_ff::{One, Zero};
use ed25519_dalek::PublicKey;
use ed25519_dalek::SecretKey;
use proptest::prelude::*;
use std::sync::Arc;
use std::thread;

struct Harness {
    prover: AttestingProver,
    tree: EligibilityTree,
    authority: (SecretKey, PublicKey),
    store: Arc<MemStore>,
    election: Arc<ElectionHandle>,
    m_actual: usize,
}

fn harness(params: ProtocolParams, m_actual: usize, voters: &[(u64, u64)]) -> Harness {
    let prover = AttestingProver::generate(params);
    let mut tree = EligibilityTree::new(params.tree_depth);
    for (index, secret) in voters {
        tree.insert_secret(*index, fr_from_u64(*secret)).unwrap();
    }
    let authority = generate_keypair();
    let config = ElectionConfig::new(
        ElectionId::new_random(),
        m_actual,
        tree.root().unwrap(),
        authority.1,
    )
    .with_params(params);

    let store = Arc::new(MemStore::default());
    let election = store
        .initialize(config, Arc::new(prover.verifier()), None)
        .unwrap();
    election.open_election(&authority.1).unwrap();
    Harness {
        prover,
        tree,
        authority,
        store,
        election,
        m_actual,
    }
}

impl Harness {
    fn vote(&self, index: u64, secret: u64, candidate: u64) -> (Proof, PublicSignals) {
        let path = self.tree.path(index).unwrap();
        let tally = self.election.get_tally_commitments();
        let request = VoteRequest {
            election_id: self.election.id(),
            secret: fr_from_u64(secret),
            candidate_index: candidate,
            path: &path,
            current_tally: &tally,
            m_actual: self.m_actual,
        };
        self.prover.prove_vote(&request).unwrap()
    }
}

#[test]
fn end_to_end_election() {
    let h = harness(ProtocolParams::default(), 3, &[(0, 123456789)]);
    let (proof, signals) = h.vote(0, 123456789, 1);

    // Neither the relayer-visible signals nor the proof depend on anything but the public state
    assert_eq!(signals.signal_count(), 20);

    let receipt = h.store.submit_vote(h.election.id(), &proof, &signals).unwrap();
    assert_eq!(receipt.tally_version, 1);

    let tally = h.election.get_tally_commitments();
    assert_eq!(tally[1], Fr::one());
    assert!(tally
        .iter()
        .enumerate()
        .all(|(slot, value)| slot == 1 || value.is_zero()));

    // Same secret again: even a freshly generated proof against the new tally is a double vote
    let (proof_again, signals_again) = h.vote(0, 123456789, 2);
    assert_eq!(signals_again.nullifier_hash, signals.nullifier_hash);
    let err = h
        .store
        .submit_vote(h.election.id(), &proof_again, &signals_again)
        .unwrap_err();
    assert!(matches!(err, ValidationError::DoubleVote));
    assert!(!err.is_retryable());
    assert_eq!(h.election.get_tally_commitments(), tally);

    let authority = h.authority.1;
    h.election.close_election(&authority).unwrap();
    let result = h
        .election
        .publish_results(&authority, &[0, 1, 0], &AuxData::default())
        .unwrap();
    assert_eq!(result.counts, vec![0, 1, 0]);
    assert_eq!(h.store.get_results(h.election.id()).unwrap(), result);
}

#[test]
fn relay_scenario() {
    let h = harness(
        ProtocolParams::new(10, 4),
        3,
        &[(3, 3333), (5, 5555), (7, 7777)],
    );
    let (voter_1, voter_1_public) = generate_keypair();
    let (voter_2, voter_2_public) = generate_keypair();

    let (proof, signals) = h.vote(3, 3333, 0);
    let request_1 = RelayRequest::new(&voter_1, proof, signals, 0);

    // The relayer receives packed bytes and only ever handles public data
    let bytes = request_1.as_bytes().unwrap();
    let relayed = RelayRequest::from_bytes(&bytes).unwrap();
    h.store.relay(&relayed).unwrap();
    assert_eq!(h.election.nonce_of(&voter_1_public), 1);

    let (proof, signals) = h.vote(5, 5555, 2);
    let request_2 = RelayRequest::new(&voter_2, proof, signals, 0);
    let receipt = h.store.relay(&request_2).unwrap();
    assert_eq!(receipt.nonce, Some(0));
    assert_eq!(h.election.nonce_of(&voter_2_public), 1);
    assert_eq!(h.election.get_tally_commitments().counts(3), Some(vec![1, 0, 1]));

    // Replaying voter 1's original authorization
    let err = h.store.relay(&request_1).unwrap_err();
    assert!(matches!(
        err,
        ValidationError::StaleNonce {
            expected: 1,
            found: 0
        }
    ));
    assert!(err.is_retryable());

    // A signature at the current nonce does not carry over to different signals
    let (proof, signals) = h.vote(7, 7777, 1);
    let signed_for = h.vote(7, 7777, 2).1;
    let auth = RelayAuthorization::sign(&voter_1, h.election.id(), &signed_for, 1);
    assert!(matches!(
        h.election
            .vote_relayed(&proof, &signals, 1, &voter_1_public, &auth.signature),
        Err(ValidationError::InvalidSignature)
    ));
    assert_eq!(h.election.nonce_of(&voter_1_public), 1);
}

#[test]
fn failed_relay_does_not_advance_nonce() {
    let h = harness(ProtocolParams::new(6, 2), 2, &[(0, 10), (1, 11)]);
    let (voter, voter_public) = generate_keypair();

    let (_proof, signals) = h.vote(0, 10, 1);
    let bogus = RelayRequest::new(&voter, Proof(vec![0u8; 64]), signals, 0);
    assert!(matches!(
        h.store.relay(&bogus),
        Err(ValidationError::InvalidProof)
    ));
    assert_eq!(h.election.nonce_of(&voter_public), 0);

    let (proof, signals) = h.vote(0, 10, 1);
    let nullifier = signals.nullifier_hash;
    h.store
        .relay(&RelayRequest::new(&voter, proof, signals, 0))
        .unwrap();
    assert_eq!(h.election.nonce_of(&voter_public), 1);

    // Relayed and direct submissions share one nullifier set
    assert!(h.election.is_nullifier_consumed(&nullifier));
    let (proof, signals) = h.vote(0, 10, 0);
    assert!(matches!(
        h.store.submit_vote(h.election.id(), &proof, &signals),
        Err(ValidationError::DoubleVote)
    ));
}

#[test]
fn stale_tally() {
    let h = harness(ProtocolParams::new(6, 4), 3, &[(0, 1), (1, 2)]);
    let (proof_a, signals_a) = h.vote(0, 1, 2);
    let (proof_b, signals_b) = h.vote(1, 2, 2);

    h.store
        .submit_vote(h.election.id(), &proof_a, &signals_a)
        .unwrap();
    let err = h
        .store
        .submit_vote(h.election.id(), &proof_b, &signals_b)
        .unwrap_err();
    assert!(matches!(err, ValidationError::StaleTally { version: 1 }));
    assert!(!h.election.is_nullifier_consumed(&signals_b.nullifier_hash));

    let (proof_b, signals_b) = h.vote(1, 2, 2);
    h.store
        .submit_vote(h.election.id(), &proof_b, &signals_b)
        .unwrap();
    assert_eq!(
        h.election.get_tally_commitments().counts(3),
        Some(vec![0, 0, 2])
    );
}

#[test]
fn candidate_out_of_range_cannot_be_proven() {
    let h = harness(ProtocolParams::new(6, 4), 3, &[(0, 1)]);
    let path = h.tree.path(0).unwrap();
    let tally = h.election.get_tally_commitments();
    for candidate in &[3, 4, 200] {
        let request = VoteRequest {
            election_id: h.election.id(),
            secret: fr_from_u64(1),
            candidate_index: *candidate,
            path: &path,
            current_tally: &tally,
            m_actual: 3,
        };
        assert!(matches!(
            h.prover.prove_vote(&request),
            Err(Error::Unsatisfied(ConstraintError::CandidateRange))
        ));
    }
}

/// Accepts every proof, to exercise the store's own checks
struct AcceptAll;

impl ProofVerifier for AcceptAll {
    fn verify(&self, _proof: &Proof, _public_inputs: &[Fr]) -> bool {
        true
    }
}

fn accept_all_election(m_actual: usize) -> (Election, PublicKey) {
    let (_, authority) = generate_keypair();
    let root = leaf_commitment(fr_from_u64(9)).unwrap();
    let config = ElectionConfig::new(ElectionId::from_u64(5), m_actual, root, authority)
        .with_params(ProtocolParams::new(4, 8));
    let mut election = Election::initialize(config, Arc::new(AcceptAll), None).unwrap();
    election.open_election(&authority).unwrap();
    (election, authority)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn padding_slots_never_move(m_actual in 1usize..8, pick in any::<prop::sample::Index>()) {
        let (mut election, _) = accept_all_election(m_actual);
        let slot = m_actual + pick.index(8 - m_actual);

        let mut new_tally = TallyVector::zero(8);
        new_tally.0[slot] = Fr::one();
        let signals = PublicSignals {
            election_id: election.id(),
            voter_root: election.config().eligibility_root,
            nullifier_hash: fr_from_u64(slot as u64),
            old_tally: TallyVector::zero(8),
            new_tally,
            m_actual: fr_from_u64(m_actual as u64),
        };
        let result = election.submit_vote(&Proof(vec![]), &signals);
        prop_assert!(matches!(result, Err(ValidationError::OutOfRange(_))));
        prop_assert_eq!(election.tally_version(), 0);
        prop_assert!(election.get_tally_commitments().iter().all(|v| v.is_zero()));
    }
}

#[test]
fn concurrent_double_vote() {
    for _ in 0..4 {
        let h = harness(ProtocolParams::new(8, 4), 3, &[(2, 42)]);

        // Ballots from the same voter, all built against the same tally
        let ballots = vec![h.vote(2, 42, 0), h.vote(2, 42, 1), h.vote(2, 42, 1)];
        let threads: Vec<_> = ballots
            .into_iter()
            .map(|(proof, signals)| {
                let store = h.store.clone();
                let id = h.election.id();
                thread::spawn(move || store.submit_vote(id, &proof, &signals))
            })
            .collect();
        let results: Vec<_> = threads.into_iter().map(|t| t.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, ValidationError::DoubleVote)));
        assert_eq!(h.election.tally_version(), 1);
    }
}

#[test]
fn concurrent_distinct_voters() {
    let voters: Vec<(u64, u64)> = (0..6).map(|i| (i, 100 + i)).collect();
    let h = Arc::new(harness(ProtocolParams::new(8, 4), 3, &voters));

    // Each voter retries against the latest tally until accepted
    let threads: Vec<_> = voters
        .iter()
        .map(|(index, secret)| {
            let h = h.clone();
            let (index, secret) = (*index, *secret);
            thread::spawn(move || loop {
                let (proof, signals) = h.vote(index, secret, index % 3);
                match h.election.submit_vote(&proof, &signals) {
                    Ok(receipt) => return receipt,
                    Err(e) if e.is_retryable() => continue,
                    Err(e) => panic!("unexpected rejection: {}", e),
                }
            })
        })
        .collect();
    for t in threads {
        t.join().unwrap();
    }

    assert_eq!(h.election.tally_version(), 6);
    assert_eq!(
        h.election.get_tally_commitments().counts(3),
        Some(vec![2, 2, 2])
    );
}
