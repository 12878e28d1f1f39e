//! Namespaced blockchain network identifiers.
//!
//! Every network in the protocol is identified by a `namespace:reference`
//! string — `"hedera:testnet"`, `"ton:mainnet"`, `"eip155:8453"` — naming
//! both the chain family and the environment within it.
//!
//! - [`ChainId`] - a parsed network identifier
//! - [`ChainIdPattern`] - exact or namespace-wildcard matching for registry keys

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt;
use std::str::FromStr;

/// A namespaced blockchain network identifier.
///
/// The format is `namespace:reference` where `namespace` identifies the
/// chain family (e.g. `hedera`, `ton`) and `reference` the specific
/// environment within it (e.g. `testnet`, `mainnet`).
///
/// # Serialization
///
/// Serializes to/from a colon-separated string: `"hedera:testnet"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChainId {
    namespace: String,
    reference: String,
}

impl ChainId {
    /// Creates a new chain ID from namespace and reference components.
    pub fn new<N: Into<String>, R: Into<String>>(namespace: N, reference: R) -> Self {
        Self {
            namespace: namespace.into(),
            reference: reference.into(),
        }
    }

    /// Returns the namespace component.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the reference component.
    #[must_use]
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Returns `true` if the reference component is the wildcard `*`.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.reference == "*"
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.reference)
    }
}

impl From<ChainId> for String {
    fn from(value: ChainId) -> Self {
        value.to_string()
    }
}

/// Error returned when parsing an invalid chain ID string.
///
/// A valid chain ID is `namespace:reference` with both components non-empty.
#[derive(Debug, thiserror::Error)]
#[error("invalid chain id format: {0}")]
pub struct ChainIdFormatError(String);

impl FromStr for ChainId {
    type Err = ChainIdFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((namespace, reference)) if !namespace.is_empty() && !reference.is_empty() => {
                Ok(Self::new(namespace, reference))
            }
            _ => Err(ChainIdFormatError(s.into())),
        }
    }
}

impl Serialize for ChainId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ChainId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(de::Error::custom)
    }
}

/// A pattern for matching chain IDs.
///
/// - **Exact**: matches one specific chain (`hedera:testnet`)
/// - **Wildcard**: matches any chain within a namespace (`hedera:*`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChainIdPattern {
    /// Matches exactly one chain.
    Exact(ChainId),
    /// Matches any chain within the namespace.
    Wildcard {
        /// The namespace to match (e.g. `hedera`, `ton`).
        namespace: String,
    },
}

impl ChainIdPattern {
    /// Creates an exact-match pattern.
    pub fn exact<N: Into<String>, R: Into<String>>(namespace: N, reference: R) -> Self {
        Self::Exact(ChainId::new(namespace, reference))
    }

    /// Creates a namespace wildcard pattern.
    pub fn wildcard<N: Into<String>>(namespace: N) -> Self {
        Self::Wildcard {
            namespace: namespace.into(),
        }
    }

    /// Returns the namespace this pattern applies to.
    #[must_use]
    pub fn namespace(&self) -> &str {
        match self {
            Self::Exact(chain_id) => chain_id.namespace(),
            Self::Wildcard { namespace } => namespace,
        }
    }

    /// Returns `true` if the given chain ID matches this pattern.
    #[must_use]
    pub fn matches(&self, chain_id: &ChainId) -> bool {
        match self {
            Self::Exact(expected) => expected == chain_id,
            Self::Wildcard { namespace } => chain_id.namespace() == namespace,
        }
    }
}

impl From<ChainId> for ChainIdPattern {
    fn from(chain_id: ChainId) -> Self {
        Self::Exact(chain_id)
    }
}

impl fmt::Display for ChainIdPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(chain_id) => write!(f, "{chain_id}"),
            Self::Wildcard { namespace } => write!(f, "{namespace}:*"),
        }
    }
}

impl FromStr for ChainIdPattern {
    type Err = ChainIdFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let chain_id = ChainId::from_str(s)?;
        if chain_id.is_wildcard() {
            Ok(Self::Wildcard {
                namespace: chain_id.namespace().to_owned(),
            })
        } else {
            Ok(Self::Exact(chain_id))
        }
    }
}
