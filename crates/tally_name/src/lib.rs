use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use tally_error::ChainError;
use tally_proc_macros::{NumBytes, Read, Write};

mod name;
pub use name::{NAME_CHARS, NAME_MAX_LEN, ParseNameError, name_from_bytes, name_to_bytes};

/// Account identity: up to 13 base-32 characters packed into a u64.
///
/// Ordering follows the packed value, which is also the byte order of the
/// big-endian store keys, so scans over account-keyed tables visit accounts
/// in `Name` order.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Read, Write, NumBytes,
)]
pub struct Name(u64);

impl Name {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn as_bytes(&self) -> [u8; NAME_MAX_LEN] {
        name_to_bytes(self.0)
    }
}

impl From<u64> for Name {
    fn from(n: u64) -> Self {
        Self(n)
    }
}

impl From<Name> for u64 {
    fn from(n: Name) -> Self {
        n.0
    }
}

impl FromStr for Name {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        name_from_bytes(s.bytes())
            .map(Name)
            .map_err(|e| ChainError::ParseError(format!("invalid name {:?}: {}", s, e)))
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let bytes = self.as_bytes();
        let value = std::str::from_utf8(&bytes)
            .map(|s| s.trim_end_matches('.'))
            .map_err(|_| fmt::Error)?;
        f.write_str(value)
    }
}

impl Serialize for Name {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Name::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use tally_serialization::{Read, Write};

    use super::*;

    #[test]
    fn test_name() {
        let name = Name::new(6138663577826885632);
        assert_eq!(name.to_string(), "eosio");
        assert_eq!(Name::from_str("eosio").unwrap(), name);
    }

    #[test]
    fn test_name_ordering_matches_key_order() {
        let alice = Name::from_str("alice").unwrap();
        let bob = Name::from_str("bob").unwrap();
        assert!(alice < bob);
        assert!(alice.as_u64().to_be_bytes() < bob.as_u64().to_be_bytes());
    }

    #[test]
    fn test_name_rejects_bad_input() {
        assert!(Name::from_str("Alice").is_err());
        assert!(Name::from_str("abcdefghijklmn").is_err());
    }

    #[test]
    fn test_name_codec_and_json() {
        let name = Name::from_str("tally.ram").unwrap();
        let packed = name.pack().unwrap();
        assert_eq!(packed, name.as_u64().to_le_bytes().to_vec());
        assert_eq!(Name::unpack(&packed).unwrap(), name);

        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"tally.ram\"");
        assert_eq!(serde_json::from_str::<Name>(&json).unwrap(), name);
    }
}
