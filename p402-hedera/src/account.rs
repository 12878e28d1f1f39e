//! Hedera entity identifiers.
//!
//! Accounts and tokens share the `shard.realm.num` textual form
//! (`0.0.7001`). Both are parsed strictly: three dot-separated non-negative
//! integers, nothing else.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// Error returned when parsing an invalid Hedera entity id.
#[derive(Debug, thiserror::Error)]
#[error("invalid hedera entity id: {0}")]
pub struct EntityIdFormatError(String);

fn parse_entity(s: &str) -> Result<(u64, u64, u64), EntityIdFormatError> {
    let mut parts = s.split('.');
    let (Some(shard), Some(realm), Some(num), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(EntityIdFormatError(s.into()));
    };
    let parse = |p: &str| p.parse::<u64>().map_err(|_| EntityIdFormatError(s.into()));
    Ok((parse(shard)?, parse(realm)?, parse(num)?))
}

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name {
            /// The shard number.
            pub shard: u64,
            /// The realm number.
            pub realm: u64,
            /// The entity number within the realm.
            pub num: u64,
        }

        impl $name {
            /// Creates an id from its three components.
            #[must_use]
            pub const fn new(shard: u64, realm: u64, num: u64) -> Self {
                Self { shard, realm, num }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}.{}.{}", self.shard, self.realm, self.num)
            }
        }

        impl FromStr for $name {
            type Err = EntityIdFormatError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let (shard, realm, num) = parse_entity(s)?;
                Ok(Self { shard, realm, num })
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_str(&s).map_err(de::Error::custom)
            }
        }
    };
}

entity_id! {
    /// A Hedera account id in `shard.realm.num` form.
    AccountId
}

entity_id! {
    /// A Hedera token id in `shard.realm.num` form.
    TokenId
}
