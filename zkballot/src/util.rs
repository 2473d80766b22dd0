use crate::*;
use ed25519_dalek::Keypair;
use ed25519_dalek::PublicKey;
use ed25519_dalek::SecretKey;
use rand::RngCore;

/// Fresh ed25519 key pair, used for authority, prover and relay keys
pub fn generate_keypair() -> (SecretKey, PublicKey) {
    let mut csprng = rand::rngs::OsRng {};
    let Keypair { public, secret } = Keypair::generate(&mut csprng);
    (secret, public)
}

/// Parse a hex-encoded ed25519 secret key
pub fn secret_key_from_hex(s: &str) -> Result<(SecretKey, PublicKey), Error> {
    let bytes = hex::decode(s.trim_start_matches("0x"))
        .map_err(|e| Error::FieldBadFormat(format!("secret key: {}", e)))?;
    let secret = SecretKey::from_bytes(&bytes)?;
    let public = PublicKey::from(&secret);
    Ok((secret, public))
}

/// Random voter secret. 31 random bytes, so no reduction is involved.
pub fn generate_voter_secret() -> Fr {
    let mut bytes = [0u8; 31];
    rand::rngs::OsRng {}.fill_bytes(&mut bytes);
    fr_from_be_bytes_mod_order(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_key_hex() {
        let (secret, public) = generate_keypair();
        let (parsed, parsed_public) = secret_key_from_hex(&hex::encode(secret.as_bytes())).unwrap();
        assert_eq!(parsed.as_bytes(), secret.as_bytes());
        assert_eq!(parsed_public, public);

        assert!(secret_key_from_hex("zz").is_err());
        assert!(matches!(
            secret_key_from_hex("abcd"),
            Err(Error::SignatureError(_))
        ));
    }

    #[test]
    fn voter_secrets_differ() {
        assert_ne!(generate_voter_secret(), generate_voter_secret());
    }
}
