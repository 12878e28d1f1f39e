//! TON address parsing and canonicalization.
//!
//! The same account has several textual encodings: the raw form
//! `workchain:hex` and the user-friendly base64 forms (bounceable or not,
//! standard or url-safe alphabet, optional testnet flag). Payments must
//! treat all of them as equal, so everything is parsed down to
//! `(workchain, hash)` and compared there.

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use crc::{CRC_16_XMODEM, Crc};

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// Friendly-form tag byte for a bounceable address.
const TAG_BOUNCEABLE: u8 = 0x11;
/// Friendly-form tag byte for a non-bounceable address.
const TAG_NON_BOUNCEABLE: u8 = 0x51;
/// Tag bit marking a testnet-only address.
const TAG_TEST_ONLY: u8 = 0x80;

/// A canonical TON account address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TonAddress {
    /// The workchain, `0` for the basechain and `-1` for the masterchain.
    pub workchain: i8,
    /// The 256-bit account id within the workchain.
    pub hash: [u8; 32],
}

/// Error returned when parsing an invalid TON address.
#[derive(Debug, thiserror::Error)]
#[error("invalid ton address: {0}")]
pub struct TonAddressError(String);

impl TonAddress {
    /// Renders the user-friendly base64url form.
    #[must_use]
    pub fn to_friendly(&self, bounceable: bool) -> String {
        let mut bytes = [0u8; 36];
        bytes[0] = if bounceable {
            TAG_BOUNCEABLE
        } else {
            TAG_NON_BOUNCEABLE
        };
        bytes[1] = self.workchain as u8;
        bytes[2..34].copy_from_slice(&self.hash);
        let checksum = CRC16.checksum(&bytes[..34]);
        bytes[34..36].copy_from_slice(&checksum.to_be_bytes());
        URL_SAFE_NO_PAD.encode(bytes)
    }

    fn from_raw(s: &str) -> Result<Self, TonAddressError> {
        let (workchain, hex) = s
            .split_once(':')
            .ok_or_else(|| TonAddressError(s.into()))?;
        let workchain: i8 = workchain.parse().map_err(|_| TonAddressError(s.into()))?;
        if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TonAddressError(s.into()));
        }
        let mut hash = [0u8; 32];
        for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
            let pair = std::str::from_utf8(chunk).map_err(|_| TonAddressError(s.into()))?;
            hash[i] = u8::from_str_radix(pair, 16).map_err(|_| TonAddressError(s.into()))?;
        }
        Ok(Self { workchain, hash })
    }

    fn from_friendly(s: &str) -> Result<Self, TonAddressError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(s)
            .or_else(|_| STANDARD_NO_PAD.decode(s))
            .map_err(|_| TonAddressError(s.into()))?;
        if bytes.len() != 36 {
            return Err(TonAddressError(s.into()));
        }
        let tag = bytes[0] & !TAG_TEST_ONLY;
        if tag != TAG_BOUNCEABLE && tag != TAG_NON_BOUNCEABLE {
            return Err(TonAddressError(s.into()));
        }
        let expected = u16::from_be_bytes([bytes[34], bytes[35]]);
        if CRC16.checksum(&bytes[..34]) != expected {
            return Err(TonAddressError(s.into()));
        }
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&bytes[2..34]);
        Ok(Self {
            workchain: bytes[1] as i8,
            hash,
        })
    }
}

impl FromStr for TonAddress {
    type Err = TonAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains(':') {
            Self::from_raw(s)
        } else {
            Self::from_friendly(s)
        }
    }
}

impl fmt::Display for TonAddress {
    /// The canonical raw form: `workchain:hex` with lowercase hex.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.workchain)?;
        for byte in &self.hash {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}
