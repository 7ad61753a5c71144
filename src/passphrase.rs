//! Passphrase hashing.
//!
//! The wrapping key is the hex SHA-256 of the passphrase. The same passphrase
//! must be supplied at generation and at every load; a different one fails
//! tag verification in [`crate::crypto::open`].

use crate::digest;
use crate::keys::WrappingKey;

/// Derive the wrapping key for `passphrase`. Deterministic and infallible.
pub fn hash_passphrase(passphrase: &str) -> WrappingKey {
    WrappingKey::from_hex(digest::sha256_hex(passphrase.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(hash_passphrase("secret"), hash_passphrase("secret"));
        assert_ne!(hash_passphrase("secret1"), hash_passphrase("secret2"));
    }

    #[test]
    fn test_hash_is_hex_sha256() {
        let key = hash_passphrase("abc");
        assert_eq!(
            key.as_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
