//! Facilitator server configuration.
//!
//! Loaded from a TOML file. String values may reference environment
//! variables with `$VAR` or `${VAR}`; unresolved references are left
//! untouched so the startup code can detect and skip them.
//!
//! # Example
//!
//! ```toml
//! host = "0.0.0.0"
//! port = 4021
//!
//! [hedera."hedera:testnet"]
//! mirror_url = "https://testnet.mirrornode.hedera.com"
//! submit_url = "$HEDERA_SUBMIT_URL"
//! operators = ["0.0.5001"]
//!
//! [ton."ton:mainnet"]
//! api_url = "https://toncenter.com/api/v3"
//! api_key = "$TONCENTER_API_KEY"
//! memo_mode = "strict"
//! ```

use std::collections::HashMap;
use std::net::IpAddr;
use std::path::Path;

use p402_hedera::exact::HederaExactConfig;
use p402_ton::exact::TonExactConfig;
use p402_ton::memo::MemoMode;
use serde::{Deserialize, Serialize};

/// Top-level facilitator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilitatorConfig {
    /// Server bind address (default: `0.0.0.0`).
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Server port (default: `4021`).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Hedera backends keyed by chain identifier (`hedera:testnet`).
    #[serde(default)]
    pub hedera: HashMap<String, HederaChainConfig>,

    /// TON backends keyed by chain identifier (`ton:mainnet`).
    #[serde(default)]
    pub ton: HashMap<String, TonChainConfig>,
}

/// One Hedera network backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HederaChainConfig {
    /// Mirror-node REST base URL, used for account resolution.
    pub mirror_url: String,

    /// Signing relay URL. The relay holds the operator keys and submits
    /// countersigned transactions to consensus nodes.
    pub submit_url: String,

    /// Fee-payer accounts the signing relay manages.
    pub operators: Vec<String>,

    /// Allow `payTo` destinations that resolve to alias accounts.
    #[serde(default)]
    pub allow_alias_destination: bool,
}

impl HederaChainConfig {
    /// Scheme-handler policy derived from this backend config.
    #[must_use]
    pub fn scheme_config(&self) -> HederaExactConfig {
        HederaExactConfig {
            allow_alias_destination: self.allow_alias_destination,
        }
    }
}

/// One TON network backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TonChainConfig {
    /// Indexer API base URL (toncenter v3 layout).
    pub api_url: String,

    /// Optional indexer API key, sent as the `X-API-Key` header.
    #[serde(default)]
    pub api_key: Option<String>,

    /// How strictly the invoice memo prefix is enforced.
    #[serde(default)]
    pub memo_mode: MemoMode,

    /// Expected jetton precision, keyed by canonical raw master address.
    #[serde(default)]
    pub jetton_decimals: HashMap<String, u32>,

    /// How many recent transfers to scan during memo lookup. Zero uses
    /// the scheme default.
    #[serde(default)]
    pub lookup_limit: usize,
}

impl TonChainConfig {
    /// Scheme-handler policy derived from this backend config.
    #[must_use]
    pub fn scheme_config(&self) -> TonExactConfig {
        TonExactConfig {
            memo_mode: self.memo_mode,
            jetton_decimals: self.jetton_decimals.clone(),
            lookup_limit: self.lookup_limit,
            ..TonExactConfig::default()
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(std::net::Ipv4Addr::new(0, 0, 0, 0))
}

fn default_port() -> u16 {
    4021
}

impl Default for FacilitatorConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            hedera: HashMap::new(),
            ton: HashMap::new(),
        }
    }
}

impl FacilitatorConfig {
    /// Loads configuration from a TOML file, expanding environment
    /// variable references in the raw text first.
    ///
    /// A missing file yields the defaults, so the server can start with
    /// no configuration and report an empty scheme set.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let expanded = expand_env_vars(&content);
        Ok(toml::from_str(&expanded)?)
    }

    /// Returns `true` when a config value still carries an unresolved
    /// `$VAR` reference and must not be used as-is.
    #[must_use]
    pub fn is_unresolved(value: &str) -> bool {
        value.trim().starts_with('$')
    }
}

/// Expands `$VAR` and `${VAR}` references from the process environment.
///
/// Unresolved references are left as-is.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }
        let braced = chars.peek() == Some(&'{');
        if braced {
            chars.next();
        }

        let mut var_name = String::new();
        while let Some(&c) = chars.peek() {
            if braced {
                if c == '}' {
                    chars.next();
                    break;
                }
            } else if !c.is_ascii_alphanumeric() && c != '_' {
                break;
            }
            var_name.push(c);
            chars.next();
        }

        if var_name.is_empty() {
            result.push('$');
            if braced {
                result.push('{');
            }
        } else if let Ok(val) = std::env::var(&var_name) {
            result.push_str(&val);
        } else {
            result.push('$');
            if braced {
                result.push('{');
            }
            result.push_str(&var_name);
            if braced {
                result.push('}');
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let config: FacilitatorConfig = toml::from_str(
            r#"
            host = "127.0.0.1"
            port = 8080

            [hedera."hedera:testnet"]
            mirror_url = "https://testnet.mirrornode.hedera.com"
            submit_url = "https://relay.internal/submit"
            operators = ["0.0.5001"]
            allow_alias_destination = true

            [ton."ton:mainnet"]
            api_url = "https://toncenter.com/api/v3"
            memo_mode = "legacy"
            lookup_limit = 16
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 8080);
        let hedera = &config.hedera["hedera:testnet"];
        assert!(hedera.allow_alias_destination);
        assert!(hedera.scheme_config().allow_alias_destination);
        let ton = &config.ton["ton:mainnet"];
        assert_eq!(ton.memo_mode, MemoMode::Legacy);
        assert_eq!(ton.scheme_config().effective_lookup_limit(), 16);
    }

    #[test]
    fn defaults_apply_when_sections_are_absent() {
        let config: FacilitatorConfig = toml::from_str("").unwrap();
        assert_eq!(config.port, 4021);
        assert!(config.hedera.is_empty());
        assert!(config.ton.is_empty());
    }

    #[test]
    fn expands_env_references() {
        // Safety note: set_var is process-global; the key is unique to
        // this test.
        unsafe { std::env::set_var("P402_TEST_EXPAND", "resolved") };
        assert_eq!(expand_env_vars("a $P402_TEST_EXPAND b"), "a resolved b");
        assert_eq!(expand_env_vars("${P402_TEST_EXPAND}"), "resolved");
        assert_eq!(expand_env_vars("$P402_TEST_MISSING"), "$P402_TEST_MISSING");
        assert_eq!(expand_env_vars("plain $"), "plain $");
    }

    #[test]
    fn unresolved_values_are_detected() {
        assert!(FacilitatorConfig::is_unresolved("$TONCENTER_API_KEY"));
        assert!(!FacilitatorConfig::is_unresolved("abc123"));
    }
}
