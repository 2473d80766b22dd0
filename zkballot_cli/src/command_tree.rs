use crate::{exit_with, Config};
use std::fs::read_to_string;
use zkballot::{fr_to_be_bytes, fr_to_hex, leaf_commitment, nullifier_hash, parse_fr};
use zkballot::{ElectionId, EligibilityTree, Fr, FrHex, Hex};

#[derive(serde::Deserialize)]
struct RosterEntry {
    index: u64,

    #[serde(with = "FrHex")]
    leaf: Fr,
}

fn read_roster(command: &str, filename: &str, config: &Config) -> EligibilityTree {
    let contents = read_to_string(filename)
        .unwrap_or_else(|e| exit_with(command, format!("{}: {}", filename, e)));
    let entries: Vec<RosterEntry> = serde_json::from_str(&contents)
        .unwrap_or_else(|e| exit_with(command, format!("{}: {}", filename, e)));

    let mut tree = EligibilityTree::new(config.params.tree_depth);
    for entry in entries {
        tree.insert_leaf(entry.index, entry.leaf)
            .unwrap_or_else(|e| exit_with(command, e));
    }
    log::info!("loaded {} leaves from {}", tree.len(), filename);
    tree
}

pub fn command_leaf(matches: &clap::ArgMatches) {
    let secret = parse_fr(matches.value_of("SECRET").unwrap_or_default())
        .unwrap_or_else(|e| exit_with("leaf", e));
    let leaf = leaf_commitment(secret).unwrap_or_else(|e| exit_with("leaf", e));
    // Roster form
    println!("{}", hex::encode(fr_to_be_bytes(&leaf)));
}

pub fn command_nullifier(matches: &clap::ArgMatches) {
    let secret = parse_fr(matches.value_of("SECRET").unwrap_or_default())
        .unwrap_or_else(|e| exit_with("nullifier", e));
    let election_id: ElectionId = matches
        .value_of("ELECTION-ID")
        .unwrap_or_default()
        .parse()
        .unwrap_or_else(|e| exit_with("nullifier", e));
    let nullifier =
        nullifier_hash(secret, election_id).unwrap_or_else(|e| exit_with("nullifier", e));
    println!("{}", fr_to_hex(&nullifier));
}

pub fn command_root(matches: &clap::ArgMatches, config: &Config) {
    let tree = read_roster("root", matches.value_of("ROSTER").unwrap_or_default(), config);
    let root = tree.root().unwrap_or_else(|e| exit_with("root", e));
    println!("{}", fr_to_hex(&root));
}

pub fn command_path(matches: &clap::ArgMatches, config: &Config) {
    let tree = read_roster("path", matches.value_of("ROSTER").unwrap_or_default(), config);
    let index: u64 = matches
        .value_of("INDEX")
        .unwrap_or_default()
        .parse()
        .unwrap_or_else(|e| exit_with("path", format!("invalid index: {}", e)));
    let path = tree.path(index).unwrap_or_else(|e| exit_with("path", e));
    let json = serde_json::to_string_pretty(&path).unwrap_or_else(|e| exit_with("path", e));
    println!("{}", json);
}
