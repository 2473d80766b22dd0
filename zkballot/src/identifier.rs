use crate::*;
use ark_ff::PrimeField;
use rand::Rng;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

/// Election identifier
///
/// An election id is a field element so it can enter the nullifier hash and the public
/// signals directly. It displays and serializes as 32-byte big-endian hex.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElectionId(Fr);

impl ElectionId {
    pub fn new(value: Fr) -> Self {
        ElectionId(value)
    }

    pub fn from_u64(value: u64) -> Self {
        ElectionId(Fr::from(value))
    }

    /// Create a new random election identifier
    pub fn new_random() -> Self {
        let mut csprng = rand::rngs::OsRng {};

        // 31 bytes always fits below the modulus
        let bytes: [u8; 31] = csprng.gen();
        ElectionId(Fr::from_be_bytes_mod_order(&bytes))
    }

    pub fn as_fr(&self) -> Fr {
        self.0
    }

    pub fn to_array(&self) -> [u8; 32] {
        fr_to_be_bytes(&self.0)
    }
}

impl FromStr for ElectionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ElectionId(parse_fr(s)?))
    }
}

impl std::fmt::Display for ElectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", fr_to_hex(&self.0))
    }
}

impl<'de> Deserialize<'de> for ElectionId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        std::str::FromStr::from_str(&s).map_err(de::Error::custom)
    }
}

impl Serialize for ElectionId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl From<ElectionId> for Fr {
    fn from(item: ElectionId) -> Self {
        item.0
    }
}
