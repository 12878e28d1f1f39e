//! Payment scheme dispatch.
//!
//! A scheme defines how payments are evidenced, verified, and settled for a
//! chain family. Scheme crates implement [`crate::facilitator::Facilitator`]
//! for their `(scheme, network)` pairs; [`SchemeRegistry`] maps incoming
//! requests to the right handler.

use std::fmt;
use std::fmt::{Display, Formatter};

use crate::chain::{ChainId, ChainIdPattern};

mod registry;

pub use registry::SchemeRegistry;

/// The `exact` scheme name: pay exactly the required amount of the required
/// asset to the required recipient.
pub const EXACT_SCHEME: &str = "exact";

/// Unique identifier for a scheme handler instance.
///
/// Combines a chain pattern and scheme name: an exact pattern identifies a
/// handler bound to one chain, a wildcard pattern a handler serving a whole
/// namespace.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct SchemeSlug {
    /// The chains this handler serves.
    pub chain: ChainIdPattern,
    /// The scheme name (e.g. `"exact"`).
    pub name: String,
}

impl SchemeSlug {
    /// Creates a new scheme handler slug.
    #[must_use]
    pub fn new(chain: impl Into<ChainIdPattern>, name: String) -> Self {
        Self {
            chain: chain.into(),
            name,
        }
    }

    /// Returns `true` if the given chain ID falls under this slug's pattern.
    #[must_use]
    pub fn matches(&self, chain_id: &ChainId) -> bool {
        self.chain.matches(chain_id)
    }
}

impl Display for SchemeSlug {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chain, self.name)
    }
}
