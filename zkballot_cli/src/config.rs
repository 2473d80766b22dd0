use ed25519_dalek::PublicKey;
use ed25519_dalek::SecretKey;
use std::env::var;
use zkballot::{secret_key_from_hex, Error, ProtocolParams};

pub struct Config {
    pub params: ProtocolParams,

    /// Key used by the demo prover and as the demo election authority
    pub secret_key: Option<(SecretKey, PublicKey)>,
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        let mut params = ProtocolParams::default();
        if let Some(depth) = parse_var("ZKBALLOT_TREE_DEPTH")? {
            params.tree_depth = depth;
        }
        if let Some(max_candidates) = parse_var("ZKBALLOT_MAX_CANDIDATES")? {
            params.max_candidates = max_candidates;
        }
        params.validate()?;

        let secret_key = match var("ZKBALLOT_SECRET_KEY") {
            Ok(val) => Some(secret_key_from_hex(&val)?),
            Err(_e) => None,
        };

        Ok(Config { params, secret_key })
    }
}

fn parse_var(name: &str) -> Result<Option<usize>, Error> {
    match var(name) {
        Ok(val) => val
            .parse()
            .map(Some)
            .map_err(|e| Error::InvalidParams(format!("{} must be a number: {}", name, e))),
        Err(_e) => Ok(None),
    }
}
