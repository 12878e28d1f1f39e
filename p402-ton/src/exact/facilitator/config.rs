use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::memo::MemoMode;
use crate::retry::RetryPolicy;

/// Policy knobs for the TON exact handler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TonExactConfig {
    /// How strictly the invoice memo prefix is enforced.
    pub memo_mode: MemoMode,

    /// Expected sub-unit precision per jetton master, keyed by canonical
    /// raw address. A jetton absent from the map skips the precision check.
    pub jetton_decimals: HashMap<String, u32>,

    /// How many recent incoming transfers to scan during memo lookup.
    pub lookup_limit: usize,

    /// Settlement retry policy for transient lookup failures.
    #[serde(skip)]
    pub retry: RetryPolicy,
}

impl TonExactConfig {
    /// Default memo-lookup window.
    pub const DEFAULT_LOOKUP_LIMIT: usize = 32;

    /// Effective lookup window, substituting the default for zero.
    #[must_use]
    pub fn effective_lookup_limit(&self) -> usize {
        if self.lookup_limit == 0 {
            Self::DEFAULT_LOOKUP_LIMIT
        } else {
            self.lookup_limit
        }
    }
}
