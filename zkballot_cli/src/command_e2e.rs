use crate::{exit_with, Config};
use ed25519_dalek::SecretKey;
use std::sync::Arc;
use zkballot::*;

/// Local demo: roster, election, direct and relayed votes, a rejected double vote, results.
pub fn command_e2e(matches: &clap::ArgMatches, config: &Config) {
    let voters: u64 = parse_arg(matches, "voters");
    let candidates: usize = parse_arg(matches, "candidates");
    let params = config.params;

    // The configured key doubles as authority and proving key
    let (authority_secret, authority_public) = match &config.secret_key {
        Some((secret, public)) => (clone_secret(secret), *public),
        None => generate_keypair(),
    };
    let prover = AttestingProver::new(clone_secret(&authority_secret), params);

    // Register voters
    let mut tree = EligibilityTree::new(params.tree_depth);
    let mut secrets = Vec::new();
    for index in 0..voters {
        let secret = generate_voter_secret();
        tree.insert_secret(index, secret)
            .unwrap_or_else(|e| exit_with("e2e", e));
        secrets.push(secret);
    }
    let root = tree.root().unwrap_or_else(|e| exit_with("e2e", e));
    println!("> Roster of {} voters, root {}", voters, fr_to_hex(&root));

    // Create and open the election
    let store = MemStore::default();
    let election_config =
        ElectionConfig::new(ElectionId::new_random(), candidates, root, authority_public)
            .with_params(params);
    let election = store
        .initialize(
            election_config,
            Arc::new(prover.verifier()),
            Some(Arc::new(prover.result_verifier())),
        )
        .unwrap_or_else(|e| exit_with("e2e", e));
    election
        .open_election(&authority_public)
        .unwrap_or_else(|e| exit_with("e2e", e));
    println!("> Election {} open", election.id());

    // Every other voter goes through a relayer
    let mut expected = vec![0u64; candidates];
    for (index, secret) in secrets.iter().enumerate() {
        let candidate = index % candidates;
        let (proof, signals) = prove(&prover, &tree, &election, index as u64, *secret, candidate);

        let receipt = if index % 2 == 0 {
            election.submit_vote(&proof, &signals)
        } else {
            let (voter_secret, voter_public) = generate_keypair();
            let nonce = election.nonce_of(&voter_public);
            let request = RelayRequest::new(&voter_secret, proof, signals, nonce);
            let bytes = request.as_bytes().unwrap_or_else(|e| exit_with("e2e", e));
            let relayed = RelayRequest::from_bytes(&bytes).unwrap_or_else(|e| exit_with("e2e", e));
            store.relay(&relayed)
        };
        let receipt = receipt.unwrap_or_else(|e| exit_with("e2e", e));
        expected[candidate] += 1;
        println!(
            "> Voter {} accepted, nullifier {}, tally version {}",
            index,
            fr_to_hex(&receipt.nullifier_hash),
            receipt.tally_version
        );
    }

    // A second ballot from the first voter must be rejected
    if let Some(secret) = secrets.first() {
        let (proof, signals) = prove(&prover, &tree, &election, 0, *secret, 0);
        match election.submit_vote(&proof, &signals) {
            Err(ValidationError::DoubleVote) => println!("> Double vote rejected"),
            other => exit_with("e2e", format!("double vote not rejected: {:?}", other)),
        }
    }

    election
        .close_election(&authority_public)
        .unwrap_or_else(|e| exit_with("e2e", e));

    let tally = election.get_tally_commitments();
    let counts = tally
        .counts(candidates)
        .unwrap_or_else(|| exit_with("e2e", "tally slot does not fit a count"));
    if counts != expected {
        exit_with("e2e", format!("tally {:?} differs from {:?}", counts, expected));
    }

    let aux = AuxData {
        proof: Some(
            prover
                .prove_result(election.id(), &tally, &counts)
                .unwrap_or_else(|e| exit_with("e2e", e)),
        ),
    };
    let result = election
        .publish_results(&authority_public, &counts, &aux)
        .unwrap_or_else(|e| exit_with("e2e", e));

    println!("> Results published");
    for (candidate, count) in result.counts.iter().enumerate() {
        println!("  candidate {} got {} votes", candidate, count);
    }
}

fn prove(
    prover: &AttestingProver,
    tree: &EligibilityTree,
    election: &ElectionHandle,
    index: u64,
    secret: Fr,
    candidate: usize,
) -> (Proof, PublicSignals) {
    let path = tree.path(index).unwrap_or_else(|e| exit_with("e2e", e));
    let tally = election.get_tally_commitments();
    let m_actual = election.with_election(|e| e.config().m_actual);
    let request = VoteRequest {
        election_id: election.id(),
        secret,
        candidate_index: candidate as u64,
        path: &path,
        current_tally: &tally,
        m_actual,
    };
    prover
        .prove_vote(&request)
        .unwrap_or_else(|e| exit_with("e2e", e))
}

fn parse_arg<T: std::str::FromStr>(matches: &clap::ArgMatches, name: &str) -> T
where
    T::Err: std::fmt::Display,
{
    matches
        .value_of(name)
        .unwrap_or_default()
        .parse()
        .unwrap_or_else(|e| exit_with("e2e", format!("invalid --{}: {}", name, e)))
}

fn clone_secret(secret: &SecretKey) -> SecretKey {
    SecretKey::from_bytes(secret.as_bytes()).unwrap_or_else(|e| exit_with("e2e", e))
}
