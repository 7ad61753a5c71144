//! Authenticated block encryption used to wrap key material at rest.
//!
//! This module and `digest` are the only places that import `ring` directly.
//! Keys arrive hex-encoded (the canonical wrapping-key representation) and are
//! decoded here, immediately before use.
//!
//! Primitive choices:
//! - **Cipher**: AES-GCM, key size chosen by the decoded key length
//! - **Nonce**: 96-bit (12 bytes), drawn fresh per seal from `SystemRandom`
//! - **Tag**: 128-bit, appended by the AEAD

use ring::aead::{self, LessSafeKey, Nonce, UnboundKey, AES_128_GCM, AES_256_GCM};
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroizing;

use crate::error::{KeycryptError, Result};

/// Size of the nonce prefix in bytes (96 bits).
pub const NONCE_LEN: usize = 12;

/// Size of the GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Fill `buf` from the system CSPRNG.
pub(crate) fn fill_random(buf: &mut [u8]) -> Result<()> {
    SystemRandom::new()
        .fill(buf)
        .map_err(|_| KeycryptError::randomness())
}

/// Hex-decode a key into a buffer that is wiped on drop.
pub(crate) fn decode_key_hex(key_hex: &str) -> Result<Zeroizing<Vec<u8>>> {
    hex::decode(key_hex)
        .map(Zeroizing::new)
        .map_err(|_| KeycryptError::KeyFormat("key is not valid hex".to_string()))
}

fn algorithm_for(key_len: usize) -> Result<&'static aead::Algorithm> {
    match key_len {
        16 => Ok(&AES_128_GCM),
        32 => Ok(&AES_256_GCM),
        24 => Err(KeycryptError::KeyFormat(
            "AES-192-GCM is not supported".to_string(),
        )),
        n => Err(KeycryptError::KeyFormat(format!(
            "key decodes to {n} bytes, expected 16 or 32"
        ))),
    }
}

fn aead_key(key_hex: &str) -> Result<LessSafeKey> {
    let key_bytes = decode_key_hex(key_hex)?;
    let algorithm = algorithm_for(key_bytes.len())?;
    let unbound = UnboundKey::new(algorithm, &key_bytes)
        .map_err(|_| KeycryptError::KeyFormat("key rejected by cipher".to_string()))?;
    Ok(LessSafeKey::new(unbound))
}

/// Seal `plaintext` under a hex-encoded key.
///
/// The nonce is bundled with the output and extracted again by [`open`].
///
/// # Layout of returned bytes
/// ```text
/// [ nonce (12 bytes) ][ ciphertext ][ GCM tag (16 bytes) ]
/// ```
pub fn seal(key_hex: &str, plaintext: &[u8]) -> Result<Vec<u8>> {
    let key = aead_key(key_hex)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    fill_random(&mut nonce_bytes)?;
    let nonce = Nonce::assume_unique_for_key(nonce_bytes);

    let mut output = Vec::with_capacity(NONCE_LEN + plaintext.len() + TAG_LEN);
    output.extend_from_slice(&nonce_bytes);
    output.extend_from_slice(plaintext);

    // The tag is appended after in-place encryption of everything past the nonce.
    let tag = key
        .seal_in_place_separate_tag(nonce, aead::Aad::empty(), &mut output[NONCE_LEN..])
        .map_err(|_| KeycryptError::Io(std::io::Error::other("AEAD seal failed")))?;
    output.extend_from_slice(tag.as_ref());

    Ok(output)
}

/// Authenticate and decrypt a blob produced by [`seal`].
///
/// A wrong key, a flipped bit, or a truncated blob all fail with
/// [`KeycryptError::Authentication`]. No partial plaintext is ever returned.
pub fn open(key_hex: &str, blob: &[u8]) -> Result<Vec<u8>> {
    let key = aead_key(key_hex)?;

    if blob.len() < NONCE_LEN + TAG_LEN {
        return Err(KeycryptError::Authentication);
    }

    let (nonce_bytes, sealed) = blob.split_at(NONCE_LEN);
    let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
        .map_err(|_| KeycryptError::Authentication)?;

    let mut payload = sealed.to_vec();
    let plaintext = key
        .open_in_place(nonce, aead::Aad::empty(), &mut payload)
        .map_err(|_| KeycryptError::Authentication)?;

    Ok(plaintext.to_vec())
}
