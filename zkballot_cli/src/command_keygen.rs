use zkballot::{fr_to_hex, generate_keypair, generate_voter_secret, leaf_commitment};

pub fn command_keygen(_matches: &clap::ArgMatches) {
    let (secret, public) = generate_keypair();
    let (secret, public) = (
        hex::encode(secret.to_bytes()),
        hex::encode(public.to_bytes()),
    );

    println!("secret-key: {}", secret);
    println!("public-key: {}", public);
}

pub fn command_secret(_matches: &clap::ArgMatches) {
    let secret = generate_voter_secret();
    let leaf = leaf_commitment(secret).unwrap_or_else(|e| crate::exit_with("secret", e));

    println!("voter-secret: {}", fr_to_hex(&secret));
    println!("leaf: {}", fr_to_hex(&leaf));
}
