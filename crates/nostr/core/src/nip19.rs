//! NIP-19: bech32-encoded entities.
//!
//! Only the bare-key entities are decoded here (`npub` being the one the
//! bootstrap client needs). A token is `<prefix>1<payload><checksum>` where
//! payload and checksum are 5-bit symbols over the bech32 alphabet and the
//! checksum is the trailing six symbols.
//!
//! Characters outside the alphabet are rejected rather than skipped. The
//! checksum must be present but is only verified when
//! [`DecodeOptions::verify_checksum`] is set, and then only the original
//! bech32 constant is accepted (bech32m tokens fail).
//!
//! See: <https://github.com/nostr-protocol/nips/blob/master/19.md>

use crate::keys::{PUBLIC_KEY_LEN, PublicKey};
use bech32::Bech32;
use bech32::primitives::decode::{CharError, UncheckedHrpstring, UncheckedHrpstringError};
use thiserror::Error;

/// Human-readable prefix for public keys.
pub const NPUB_PREFIX: &str = "npub";

/// Number of trailing checksum symbols.
pub const CHECKSUM_LEN: usize = 6;

const SEPARATOR: char = '1';

/// Errors that can occur when decoding a NIP-19 identifier.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Nip19Error {
    #[error("missing prefix: expected token to start with {expected:?}")]
    MissingPrefix { expected: String },

    #[error("invalid character {ch:?} at position {position}")]
    InvalidCharacter { ch: char, position: usize },

    #[error("mixed-case identifier")]
    MixedCase,

    #[error("identifier too short: {0} data symbols")]
    TooShort(usize),

    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("checksum verification failed: {0}")]
    Checksum(String),
}

/// Decoding policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Verify the BIP-173 checksum instead of just stripping it.
    pub verify_checksum: bool,
}

impl DecodeOptions {
    pub fn verify_checksum(mut self, verify: bool) -> Self {
        self.verify_checksum = verify;
        self
    }
}

/// Decode an `npub` identifier into its public key.
pub fn decode_npub(token: &str) -> Result<PublicKey, Nip19Error> {
    decode(NPUB_PREFIX, token, DecodeOptions::default())
}

/// Decode a bare-key identifier with the given human-readable prefix.
pub fn decode(prefix: &str, token: &str, options: DecodeOptions) -> Result<PublicKey, Nip19Error> {
    let prefix = prefix.to_ascii_lowercase();
    let missing_prefix = || Nip19Error::MissingPrefix {
        expected: format!("{}{}", prefix, SEPARATOR),
    };

    let unchecked = UncheckedHrpstring::new(token).map_err(|e| match e {
        UncheckedHrpstringError::Char(CharError::InvalidChar(ch)) => {
            Nip19Error::InvalidCharacter {
                ch,
                position: data_position(token, ch),
            }
        }
        UncheckedHrpstringError::Char(CharError::MixedCase) => Nip19Error::MixedCase,
        UncheckedHrpstringError::Char(CharError::NothingAfterSeparator) => Nip19Error::TooShort(0),
        _ => missing_prefix(),
    })?;

    if unchecked.hrp().to_lowercase() != prefix {
        return Err(missing_prefix());
    }

    // The separator is the last '1'; everything after it is payload plus checksum.
    let symbols = token
        .rsplit_once(SEPARATOR)
        .map_or(0, |(_, data)| data.len());
    if symbols <= CHECKSUM_LEN {
        return Err(Nip19Error::TooShort(symbols));
    }

    let checked = if options.verify_checksum {
        unchecked
            .validate_and_remove_checksum::<Bech32>()
            .map_err(|e| Nip19Error::Checksum(e.to_string()))?
    } else {
        unchecked.remove_checksum::<Bech32>()
    };
    let bytes: Vec<u8> = checked.byte_iter().collect();

    PublicKey::from_slice(&bytes).map_err(|_| Nip19Error::InvalidLength {
        expected: PUBLIC_KEY_LEN,
        actual: bytes.len(),
    })
}

/// Index of the first `ch` after the separator.
fn data_position(token: &str, ch: char) -> usize {
    let start = token.rfind(SEPARATOR).map_or(0, |i| i + 1);
    token[start..]
        .chars()
        .position(|c| c == ch)
        .map_or(start, |i| start + i)
}
