//! Configuration for the Hedera exact facilitator.

use serde::{Deserialize, Serialize};

/// Tunable policy for the Hedera exact facilitator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct HederaExactConfig {
    /// Allow `payTo` to be an alias (derived/auto-creatable) account.
    ///
    /// Off by default: alias destinations can incur auto-creation fees the
    /// fee payer would silently absorb.
    pub allow_alias_destination: bool,
}
