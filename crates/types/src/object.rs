//! Object identity and versioning types.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Length in bytes of object ids and account addresses.
pub const ID_LENGTH: usize = 32;

/// Errors from parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid hex identifier {0:?}: {1}")]
    InvalidHex(String, String),

    #[error("Identifier {0:?} longer than {ID_LENGTH} bytes")]
    TooLong(String),

    #[error("Invalid move target {0:?}, expected package::module::function")]
    InvalidMoveTarget(String),
}

fn parse_hex_id(s: &str) -> Result<[u8; ID_LENGTH], ParseError> {
    let trimmed = s.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.is_empty() {
        return Err(ParseError::InvalidHex(s.to_string(), "empty".to_string()));
    }
    if digits.len() > ID_LENGTH * 2 {
        return Err(ParseError::TooLong(s.to_string()));
    }

    // Short forms like `0x2` are left-padded to the full width.
    let padded = format!("{:0>width$}", digits, width = ID_LENGTH * 2);
    let mut bytes = [0u8; ID_LENGTH];
    hex::decode_to_slice(&padded, &mut bytes)
        .map_err(|e| ParseError::InvalidHex(s.to_string(), e.to_string()))?;
    Ok(bytes)
}

macro_rules! hex_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub [u8; ID_LENGTH]);

        impl $name {
            /// Build from raw bytes.
            pub fn new(bytes: [u8; ID_LENGTH]) -> Self {
                Self(bytes)
            }
        }

        impl FromStr for $name {
            type Err = ParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_hex_id(s).map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(de::Error::custom)
            }
        }
    };
}

hex_identifier!(
    /// Identifier of a ledger object.
    ObjectId
);

hex_identifier!(
    /// Account address that owns objects and signs transactions.
    SuiAddress
);

/// Object version. Every mutation of an object produces a strictly larger version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct SequenceNumber(pub u64);

impl fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// The JSON-RPC API renders versions as decimal strings in some places and as
// numbers in others.
impl<'de> Deserialize<'de> for SequenceNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        crate::serde_helpers::u64_from_str_or_num(deserializer).map(SequenceNumber)
    }
}

/// Digest identifying one historical state of an object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectDigest(pub String);

impl fmt::Display for ObjectDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Digest of an executed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionDigest(pub String);

impl fmt::Display for TransactionDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unambiguous reference to one state of an owned object.
///
/// Paying gas with a stale reference is rejected by the ledger, so callers
/// that skip reads between submissions must keep this exactly in sync.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRef {
    pub object_id: ObjectId,
    pub version: SequenceNumber,
    pub digest: ObjectDigest,
}

impl ObjectRef {
    pub fn new(object_id: ObjectId, version: SequenceNumber, digest: ObjectDigest) -> Self {
        Self {
            object_id,
            version,
            digest,
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}#{}", self.object_id, self.version, self.digest)
    }
}

/// A fee-paying coin owned by an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coin {
    pub object_ref: ObjectRef,
    /// Balance in the smallest unit (MIST).
    pub balance: u64,
}

impl Coin {
    pub fn id(&self) -> ObjectId {
        self.object_ref.object_id
    }
}

/// Owner of a ledger object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Owner {
    AddressOwner(SuiAddress),
    ObjectOwner(SuiAddress),
    Shared {
        initial_shared_version: SequenceNumber,
    },
    Immutable,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_id_is_left_padded() {
        let id: ObjectId = "0x2".parse().unwrap();
        let mut expected = [0u8; ID_LENGTH];
        expected[ID_LENGTH - 1] = 2;
        assert_eq!(id, ObjectId(expected));
        assert_eq!(
            id.to_string(),
            "0x0000000000000000000000000000000000000000000000000000000000000002"
        );
    }

    #[test]
    fn test_id_rejects_garbage() {
        assert!("0xzz".parse::<ObjectId>().is_err());
        assert!("".parse::<ObjectId>().is_err());
        assert!(format!("0x{}", "a".repeat(65)).parse::<ObjectId>().is_err());
    }

    #[test]
    fn test_owner_json_shapes() {
        let shared: Owner =
            serde_json::from_str(r#"{"Shared":{"initial_shared_version":7}}"#).unwrap();
        assert_eq!(
            shared,
            Owner::Shared {
                initial_shared_version: SequenceNumber(7)
            }
        );

        let immutable: Owner = serde_json::from_str(r#""Immutable""#).unwrap();
        assert_eq!(immutable, Owner::Immutable);

        let owned: Owner = serde_json::from_str(r#"{"AddressOwner":"0x5"}"#).unwrap();
        assert!(matches!(owned, Owner::AddressOwner(_)));
    }

    #[test]
    fn test_version_accepts_string_and_number() {
        let a: SequenceNumber = serde_json::from_str(r#""42""#).unwrap();
        let b: SequenceNumber = serde_json::from_str("42").unwrap();
        assert_eq!(a, b);
    }
}
