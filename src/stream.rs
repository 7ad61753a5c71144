//! Streaming encryption over arbitrary readers and writers.
//!
//! AES in output-feedback mode turns the block cipher into a keystream that
//! is XORed with the data, so output length tracks input length, nothing is
//! buffered beyond the caller's own chunks, and encryption and decryption are
//! the same transform. There is no integrity check on this path: corruption
//! garbles the output and is not detected.
//!
//! ## Stream layout
//!
//! ```text
//! IvMode::Random      [ 0x01 ][ IV (16 bytes) ][ ciphertext ... ]
//! IvMode::LegacyZero  [ ciphertext ... ]            (IV = 16 zero bytes)
//! ```
//!
//! `LegacyZero` exists only to read and write streams in the older
//! header-less format. Reusing a key with a constant IV reuses the keystream.

use std::fmt;
use std::io::{self, Read, Write};

use aes::{Aes128, Aes192, Aes256};
use ofb::cipher::{InvalidLength, KeyIvInit, StreamCipher as _};
use ofb::Ofb;
use zeroize::Zeroizing;

use crate::crypto;
use crate::error::{KeycryptError, Result};
use crate::keys::RawKeyHex;
use crate::log::Logger;

/// AES block size, and so the IV length.
pub const IV_LEN: usize = 16;

/// Format byte written ahead of the IV in [`IvMode::Random`] streams.
pub const STREAM_FORMAT_V1: u8 = 0x01;

/// Bytes added in front of the ciphertext by [`IvMode::Random`].
pub const HEADER_LEN: usize = 1 + IV_LEN;

/// How the initialisation vector is chosen and carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IvMode {
    /// A fresh random IV per stream, stored in a versioned header.
    #[default]
    Random,
    /// The all-zero IV with no header, byte-compatible with older streams.
    LegacyZero,
}

impl fmt::Display for IvMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Random => f.write_str("random-iv"),
            Self::LegacyZero => f.write_str("legacy-zero-iv"),
        }
    }
}

/// OFB keystream over whichever AES variant the key length selects.
enum OfbCipher {
    Aes128(Ofb<Aes128>),
    Aes192(Ofb<Aes192>),
    Aes256(Ofb<Aes256>),
}

impl OfbCipher {
    fn new(key: &[u8], iv: &[u8; IV_LEN]) -> Result<Self> {
        let invalid = |_: InvalidLength| KeycryptError::KeyFormat("key rejected by cipher".to_string());
        match key.len() {
            16 => Ok(Self::Aes128(Ofb::new_from_slices(key, &iv[..]).map_err(invalid)?)),
            24 => Ok(Self::Aes192(Ofb::new_from_slices(key, &iv[..]).map_err(invalid)?)),
            32 => Ok(Self::Aes256(Ofb::new_from_slices(key, &iv[..]).map_err(invalid)?)),
            n => Err(KeycryptError::KeyFormat(format!(
                "key decodes to {n} bytes, expected 16, 24 or 32"
            ))),
        }
    }

    fn apply(&mut self, buf: &mut [u8]) {
        match self {
            Self::Aes128(c) => c.apply_keystream(buf),
            Self::Aes192(c) => c.apply_keystream(buf),
            Self::Aes256(c) => c.apply_keystream(buf),
        }
    }
}

/// Builder binding a stream key, an IV mode, and a logger.
///
/// ```no_run
/// use keycrypt::stream::StreamCipher;
///
/// # fn main() -> keycrypt::Result<()> {
/// let key = "00".repeat(32);
/// let mut writer = StreamCipher::from_hex(&key)?.encrypt_writer(Vec::new())?;
/// std::io::Write::write_all(&mut writer, b"payload")?;
/// let ciphertext = writer.finish()?;
/// # let _ = ciphertext;
/// # Ok(())
/// # }
/// ```
pub struct StreamCipher {
    key: Zeroizing<Vec<u8>>,
    mode: IvMode,
    logger: Logger,
}

impl fmt::Debug for StreamCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamCipher")
            .field("key", &"[REDACTED]")
            .field("mode", &self.mode)
            .finish()
    }
}

impl StreamCipher {
    /// Decode a hex stream key. The key must decode to 16, 24 or 32 bytes.
    pub fn from_hex(key_hex: &str) -> Result<Self> {
        let key = crypto::decode_key_hex(key_hex)?;
        if !matches!(key.len(), 16 | 24 | 32) {
            return Err(KeycryptError::KeyFormat(format!(
                "key decodes to {} bytes, expected 16, 24 or 32",
                key.len()
            )));
        }
        Ok(Self {
            key,
            mode: IvMode::default(),
            logger: Logger::noop(),
        })
    }

    /// Use a key loaded from the key store.
    pub fn from_raw_key(key: &RawKeyHex) -> Result<Self> {
        Self::from_hex(key.as_str())
    }

    pub fn with_mode(mut self, mode: IvMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    pub fn mode(&self) -> IvMode {
        self.mode
    }

    /// Wrap `sink` so every byte written is encrypted before it is forwarded.
    ///
    /// In [`IvMode::Random`] the header is written to `sink` immediately.
    pub fn encrypt_writer<W: Write>(&self, mut sink: W) -> Result<EncryptWriter<W>> {
        self.logger
            .debug("stream::encrypt_writer", "encrypting", &[&self.mode]);
        let iv = match self.mode {
            IvMode::Random => {
                let mut iv = [0u8; IV_LEN];
                crypto::fill_random(&mut iv)?;
                let mut header = [0u8; HEADER_LEN];
                header[0] = STREAM_FORMAT_V1;
                header[1..].copy_from_slice(&iv);
                sink.write_all(&header)?;
                iv
            }
            IvMode::LegacyZero => [0u8; IV_LEN],
        };
        Ok(EncryptWriter {
            inner: sink,
            cipher: OfbCipher::new(&self.key, &iv)?,
            scratch: Vec::new(),
        })
    }

    /// Wrap `source` so every byte read from it is decrypted.
    ///
    /// In [`IvMode::Random`] the header is consumed from `source` immediately.
    pub fn decrypt_reader<R: Read>(&self, mut source: R) -> Result<DecryptReader<R>> {
        self.logger
            .debug("stream::decrypt_reader", "decrypting", &[&self.mode]);
        let iv = match self.mode {
            IvMode::Random => {
                let mut header = [0u8; HEADER_LEN];
                source.read_exact(&mut header)?;
                if header[0] != STREAM_FORMAT_V1 {
                    let err = KeycryptError::UnsupportedFormat(header[0]);
                    self.logger.error("stream::decrypt_reader", &err);
                    return Err(err);
                }
                let mut iv = [0u8; IV_LEN];
                iv.copy_from_slice(&header[1..]);
                iv
            }
            IvMode::LegacyZero => [0u8; IV_LEN],
        };
        Ok(DecryptReader {
            inner: source,
            cipher: OfbCipher::new(&self.key, &iv)?,
        })
    }
}

/// Encrypt everything written into `sink` under `key_hex` with a random IV.
pub fn wrap_writer<W: Write>(sink: W, key_hex: &str) -> Result<EncryptWriter<W>> {
    StreamCipher::from_hex(key_hex)?.encrypt_writer(sink)
}

/// Decrypt everything read from `source` under `key_hex`, expecting the
/// header written by [`wrap_writer`].
pub fn wrap_reader<R: Read>(source: R, key_hex: &str) -> Result<DecryptReader<R>> {
    StreamCipher::from_hex(key_hex)?.decrypt_reader(source)
}

/// A writer that encrypts before forwarding. Owns its cipher state
/// exclusively; one instance serves one stream.
///
/// The keystream advances before the inner write, so after any error from
/// `write` the stream is out of step with its ciphertext. Discard the writer
/// and the partial output; retrying the same buffer produces garbage.
pub struct EncryptWriter<W: Write> {
    inner: W,
    cipher: OfbCipher,
    scratch: Vec<u8>,
}

impl<W: Write> EncryptWriter<W> {
    /// Flush and release the wrapped sink. No trailer is written.
    pub fn finish(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }
}

impl<W: Write> Write for EncryptWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.scratch.clear();
        self.scratch.extend_from_slice(buf);
        self.cipher.apply(&mut self.scratch);
        // The keystream has already advanced past `buf`, so all of it must land.
        self.inner.write_all(&self.scratch)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// A reader that decrypts what it reads. Owns its cipher state exclusively.
pub struct DecryptReader<R: Read> {
    inner: R,
    cipher: OfbCipher,
}

impl<R: Read> DecryptReader<R> {
    /// Release the wrapped source.
    pub fn into_inner(self) -> R {
        self.inner
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }
}

impl<R: Read> Read for DecryptReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.cipher.apply(&mut buf[..n]);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(key: &str, mode: IvMode, data: &[u8]) -> Vec<u8> {
        let cipher = StreamCipher::from_hex(key).unwrap().with_mode(mode);
        let mut writer = cipher.encrypt_writer(Vec::new()).unwrap();
        writer.write_all(data).unwrap();
        let encrypted = writer.finish().unwrap();

        let mut reader = cipher.decrypt_reader(&encrypted[..]).unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn test_all_key_sizes() {
        for len in [16, 24, 32] {
            let key = "ab".repeat(len);
            for mode in [IvMode::Random, IvMode::LegacyZero] {
                assert_eq!(roundtrip(&key, mode, b"block cipher in ofb"), b"block cipher in ofb");
            }
        }
    }

    struct FailingSink;

    impl Write for FailingSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("sink closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_inner_write_error_propagates() {
        let cipher = StreamCipher::from_hex(&"22".repeat(32))
            .unwrap()
            .with_mode(IvMode::LegacyZero);
        let mut writer = cipher.encrypt_writer(FailingSink).unwrap();
        let err = writer.write(b"data").unwrap_err();
        assert_eq!(err.to_string(), "sink closed");
    }

    #[test]
    fn test_rejects_bad_keys() {
        assert!(matches!(
            StreamCipher::from_hex("xyz"),
            Err(KeycryptError::KeyFormat(_))
        ));
        assert!(matches!(
            StreamCipher::from_hex(&"00".repeat(20)),
            Err(KeycryptError::KeyFormat(_))
        ));
    }

    #[test]
    fn test_legacy_zero_iv_known_answer() {
        // OFB with a zero IV: the first keystream block is AES_k(0^128).
        let key = "00".repeat(16);
        let cipher = StreamCipher::from_hex(&key)
            .unwrap()
            .with_mode(IvMode::LegacyZero);
        let mut writer = cipher.encrypt_writer(Vec::new()).unwrap();
        writer.write_all(&[0u8; 16]).unwrap();
        let out = writer.finish().unwrap();
        assert_eq!(hex::encode(out), "66e94bd4ef8a2c3b884cfa59ca342b2e");
    }

    #[test]
    fn test_random_iv_header() {
        let key = "11".repeat(32);
        let a = wrap_writer(Vec::new(), &key).unwrap().finish().unwrap();
        let b = wrap_writer(Vec::new(), &key).unwrap().finish().unwrap();
        assert_eq!(a.len(), HEADER_LEN);
        assert_eq!(a[0], STREAM_FORMAT_V1);
        assert_ne!(a[1..], b[1..]);
    }

    #[test]
    fn test_unknown_header_version() {
        let key = "11".repeat(32);
        let mut stream = vec![0x7fu8];
        stream.extend_from_slice(&[0u8; IV_LEN]);
        assert!(matches!(
            wrap_reader(&stream[..], &key),
            Err(KeycryptError::UnsupportedFormat(0x7f))
        ));
    }

    #[test]
    fn test_truncated_header_is_io_error() {
        let key = "11".repeat(32);
        assert!(matches!(
            wrap_reader(&[STREAM_FORMAT_V1, 0, 0][..], &key),
            Err(KeycryptError::Io(_))
        ));
    }

    #[test]
    fn test_chunked_writes_match_single_write() {
        let key = "42".repeat(32);
        let data: Vec<u8> = (0..=255u8).cycle().take(5000).collect();
        let cipher = StreamCipher::from_hex(&key)
            .unwrap()
            .with_mode(IvMode::LegacyZero);

        let mut whole = cipher.encrypt_writer(Vec::new()).unwrap();
        whole.write_all(&data).unwrap();
        let whole = whole.finish().unwrap();

        let mut chunked = cipher.encrypt_writer(Vec::new()).unwrap();
        for chunk in data.chunks(7) {
            chunked.write_all(chunk).unwrap();
        }
        assert_eq!(chunked.finish().unwrap(), whole);
        assert_eq!(whole.len(), data.len());
    }
}
