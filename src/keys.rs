//! Key material types.
//!
//! Two secrets pass through the crate, both in hex form:
//! 1. [`RawKeyHex`]: the 32-byte data key, hex-encoded to 64 ASCII characters.
//!    This is the form handed to callers and the plaintext sealed at rest.
//! 2. [`WrappingKey`]: the hex SHA-256 of a passphrase, used only to seal and
//!    open a raw key.
//!
//! Both hold their text in `Zeroizing` buffers, are not `Clone`, and redact
//! themselves in `Debug` output.

use std::fmt;

use zeroize::Zeroizing;

use crate::crypto;
use crate::error::{KeycryptError, Result};

/// Size of a raw data key in bytes (256 bits).
pub const RAW_KEY_LEN: usize = 32;

// ---------------------------------------------------------------------------
// Raw key
// ---------------------------------------------------------------------------

/// A hex-encoded data key, usable directly with [`crate::stream`] or
/// [`crate::crypto`].
pub struct RawKeyHex {
    hex: Zeroizing<String>,
}

impl RawKeyHex {
    /// Wrap decrypted key text. The text must be valid UTF-8 hex.
    pub(crate) fn from_plaintext(bytes: Vec<u8>) -> Result<Self> {
        let bytes = Zeroizing::new(bytes);
        let text = std::str::from_utf8(&bytes)
            .map_err(|_| KeycryptError::KeyFormat("stored key is not text".to_string()))?;
        if !text.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(KeycryptError::KeyFormat(
                "stored key is not hex".to_string(),
            ));
        }
        Ok(Self {
            hex: Zeroizing::new(text.to_string()),
        })
    }

    /// Borrow the hex text.
    pub fn as_str(&self) -> &str {
        &self.hex
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.hex.as_bytes()
    }
}

impl fmt::Debug for RawKeyHex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawKeyHex")
            .field("hex", &"[REDACTED]")
            .finish()
    }
}

/// Generate a fresh random data key.
///
/// This is the only function in the crate that produces raw key material from
/// scratch.
pub fn generate_raw_key() -> Result<RawKeyHex> {
    let mut bytes = Zeroizing::new([0u8; RAW_KEY_LEN]);
    crypto::fill_random(&mut bytes[..])?;
    Ok(RawKeyHex {
        hex: Zeroizing::new(hex::encode(&bytes[..])),
    })
}

// ---------------------------------------------------------------------------
// Wrapping key
// ---------------------------------------------------------------------------

/// A key whose only purpose is to seal and open a [`RawKeyHex`].
///
/// Produced by [`crate::passphrase::hash_passphrase`]; compares by value so
/// callers can check determinism.
#[derive(PartialEq, Eq)]
pub struct WrappingKey {
    hex: Zeroizing<String>,
}

impl WrappingKey {
    pub(crate) fn from_hex(hex: String) -> Self {
        Self {
            hex: Zeroizing::new(hex),
        }
    }

    /// Borrow the hex text.
    pub fn as_hex(&self) -> &str {
        &self.hex
    }
}

impl fmt::Debug for WrappingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrappingKey")
            .field("hex", &"[REDACTED]")
            .finish()
    }
}
