//! Invoice memo validation.
//!
//! A TON payment is tied to its invoice by the transfer comment. Strict
//! mode requires the structured `x402:` namespace prefix; legacy mode
//! tolerates its absence but still validates length and charset.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// The structured invoice namespace prefix.
pub const MEMO_PREFIX: &str = "x402:";

/// Upper bound on memo length, in bytes.
pub const MAX_MEMO_LEN: usize = 120;

static MEMO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9:._-]*$").expect("memo regex")
});

/// How strictly the namespace prefix is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoMode {
    /// The `x402:` prefix is required.
    #[default]
    Strict,
    /// The prefix is optional but validated when present.
    Legacy,
}

/// Why a memo failed validation.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MemoError {
    /// The memo is empty.
    #[error("memo is empty")]
    Empty,

    /// The memo exceeds [`MAX_MEMO_LEN`] bytes.
    #[error("memo exceeds {MAX_MEMO_LEN} bytes")]
    TooLong,

    /// The memo contains characters outside the allowed set.
    #[error("memo contains invalid characters")]
    InvalidCharacters,

    /// Strict mode requires the `x402:` prefix.
    #[error("memo is missing the {MEMO_PREFIX} prefix")]
    MissingPrefix,

    /// The prefix is present but carries no invoice identifier.
    #[error("memo has an empty invoice identifier")]
    EmptyInvoice,
}

/// Returns `true` if the memo carries the structured namespace prefix.
#[must_use]
pub fn has_prefix(memo: &str) -> bool {
    memo.starts_with(MEMO_PREFIX)
}

/// Validates a memo under the given mode.
///
/// # Errors
///
/// Returns [`MemoError`] naming the first violated rule.
pub fn validate_memo(memo: &str, mode: MemoMode) -> Result<(), MemoError> {
    if memo.is_empty() {
        return Err(MemoError::Empty);
    }
    if memo.len() > MAX_MEMO_LEN {
        return Err(MemoError::TooLong);
    }
    if !MEMO_RE.is_match(memo) {
        return Err(MemoError::InvalidCharacters);
    }
    match (mode, has_prefix(memo)) {
        (MemoMode::Strict, false) => Err(MemoError::MissingPrefix),
        (_, true) if memo.len() == MEMO_PREFIX.len() => Err(MemoError::EmptyInvoice),
        _ => Ok(()),
    }
}
