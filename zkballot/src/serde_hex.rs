use crate::*;
use ed25519_dalek::PublicKey;
use ed25519_dalek::Signature;
use ed25519_dalek::SignatureError;
use std::borrow::Cow;
use std::convert::TryFrom;

pub use hex_buffer_serde::Hex;

const FR_LEN: usize = 32;

// Single-purpose types for use in `#[serde(with)]`

/// A field element as 32 big-endian bytes
pub enum FrHex {}

impl Hex<Fr> for FrHex {
    type Error = Error;

    fn create_bytes(value: &Fr) -> Cow<[u8]> {
        Cow::from(fr_to_be_bytes(value).to_vec())
    }

    fn from_bytes(bytes: &[u8]) -> Result<Fr, Error> {
        if bytes.len() != FR_LEN {
            return Err(Error::FieldBadFormat(format!(
                "expected {} bytes, found {}",
                FR_LEN,
                bytes.len()
            )));
        }
        Ok(fr_from_be_bytes_mod_order(bytes))
    }
}

/// A list of field elements as concatenated 32-byte words
pub enum FrVecHex {}

impl Hex<Vec<Fr>> for FrVecHex {
    type Error = Error;

    fn create_bytes(values: &Vec<Fr>) -> Cow<[u8]> {
        let mut bytes = Vec::with_capacity(values.len() * FR_LEN);
        for value in values {
            bytes.extend_from_slice(&fr_to_be_bytes(value));
        }
        Cow::from(bytes)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Vec<Fr>, Error> {
        if bytes.len() % FR_LEN != 0 {
            return Err(Error::FieldBadFormat(format!(
                "{} bytes is not a whole number of {}-byte elements",
                bytes.len(),
                FR_LEN
            )));
        }
        Ok(bytes.chunks(FR_LEN).map(fr_from_be_bytes_mod_order).collect())
    }
}

pub enum BytesHex {}

impl Hex<Vec<u8>> for BytesHex {
    type Error = String;

    fn create_bytes(bytes: &Vec<u8>) -> Cow<[u8]> {
        Cow::from(&bytes[..])
    }

    fn from_bytes(bytes: &[u8]) -> Result<Vec<u8>, String> {
        Ok(bytes.to_vec())
    }
}

pub enum Bytes32Hex {}

impl Hex<[u8; 32]> for Bytes32Hex {
    type Error = String;

    fn create_bytes(bytes: &[u8; 32]) -> Cow<[u8]> {
        Cow::from(&bytes[..])
    }

    fn from_bytes(bytes: &[u8]) -> Result<[u8; 32], String> {
        <[u8; 32]>::try_from(bytes)
            .map_err(|_| format!("expected 32 bytes, found {}", bytes.len()))
    }
}

pub enum EdPublicKeyHex {}

impl Hex<PublicKey> for EdPublicKeyHex {
    type Error = SignatureError;

    fn create_bytes(public_key: &PublicKey) -> Cow<[u8]> {
        public_key.as_ref().into()
    }

    fn from_bytes(bytes: &[u8]) -> Result<PublicKey, SignatureError> {
        PublicKey::from_bytes(bytes)
    }
}

pub enum EdSignatureHex {}

impl Hex<Signature> for EdSignatureHex {
    type Error = SignatureError;

    fn create_bytes(sig: &Signature) -> Cow<[u8]> {
        Cow::from(sig.to_bytes().to_vec())
    }

    fn from_bytes(bytes: &[u8]) -> Result<Signature, SignatureError> {
        Signature::try_from(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Element(#[serde(with = "FrHex")] Fr);

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Elements(#[serde(with = "FrVecHex")] Vec<Fr>);

    #[test]
    fn field_elements_as_plain_hex() {
        let element = Element(fr_from_u64(255));
        let json = serde_json::to_string(&element).unwrap();
        assert_eq!(json, format!("\"{}ff\"", "0".repeat(62)));
        assert_eq!(serde_json::from_str::<Element>(&json).unwrap(), element);

        // Binary formats carry the raw 32 bytes
        let cbor = serde_cbor::to_vec(&element).unwrap();
        assert_eq!(serde_cbor::from_slice::<Element>(&cbor).unwrap(), element);

        let elements = Elements(vec![fr_from_u64(1), fr_from_u64(2)]);
        let json = serde_json::to_string(&elements).unwrap();
        assert_eq!(json.len(), 2 + 128);
        assert_eq!(serde_json::from_str::<Elements>(&json).unwrap(), elements);
    }

    #[test]
    fn wrong_lengths_are_rejected() {
        assert!(serde_json::from_str::<Element>("\"ff\"").is_err());
        assert!(serde_json::from_str::<Elements>(&format!("\"{}\"", "0".repeat(66))).is_err());

        #[derive(Deserialize, Debug)]
        struct Word(#[serde(with = "Bytes32Hex")] [u8; 32]);
        assert!(serde_json::from_str::<Word>(&format!("\"{}\"", "ab".repeat(31))).is_err());
        assert_eq!(
            serde_json::from_str::<Word>(&format!("\"{}\"", "ab".repeat(32))).unwrap().0,
            [0xab; 32]
        );
    }
}
