//! Error types for keycrypt.
//!
//! Each variant is a distinct failure mode of the key lifecycle. Messages say
//! *what* failed and never carry key material or passphrases.

use thiserror::Error;

/// The single error type for all keycrypt operations.
#[derive(Debug, Error)]
pub enum KeycryptError {
    /// A key was not valid hex, or decoded to a length the cipher rejects.
    #[error("invalid key format: {0}")]
    KeyFormat(String),

    /// AEAD tag verification failed. Covers a wrong passphrase as well as a
    /// tampered or truncated blob; the two are deliberately not distinguished.
    #[error("authentication failed")]
    Authentication,

    /// A key file does not exist, or no stored record matches a digest.
    #[error("not found: {0}")]
    NotFound(String),

    /// File-system or random-source failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stream header carried a format version this build does not read.
    #[error("unsupported stream format version: {0}")]
    UnsupportedFormat(u8),

    /// Configuration could not be read or parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, KeycryptError>;

impl KeycryptError {
    /// Random-source failures surface as I/O errors.
    pub(crate) fn randomness() -> Self {
        Self::Io(std::io::Error::other("random source failed"))
    }
}
