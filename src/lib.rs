//! # keycrypt
//!
//! Symmetric key lifecycle and stream encryption for build tooling.
//!
//! A data key is generated at random, sealed with AES-GCM under a key derived
//! from a passphrase, and written to a key directory under the SHA-256 digest
//! of the sealed blob. It can be loaded back by path or by digest. Loaded keys
//! drive an AES-OFB stream cipher that wraps any reader or writer.
//!
//! ```no_run
//! use keycrypt::{KeyStore, StreamCipher};
//!
//! # fn main() -> keycrypt::Result<()> {
//! let store = KeyStore::new("/var/lib/build/keys");
//! let digest = store.generate("correct-horse")?;
//! let key = store.load_by_digest(&digest, "correct-horse")?;
//! let writer = StreamCipher::from_raw_key(&key)?.encrypt_writer(Vec::new())?;
//! # let _ = writer;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod crypto;
pub mod digest;
pub mod error;
pub mod keys;
pub mod log;
pub mod passphrase;
pub mod store;
pub mod stream;

pub use config::KeyStoreConfig;
pub use error::{KeycryptError, Result};
pub use keys::{generate_raw_key, RawKeyHex, WrappingKey};
pub use log::{FileLogSink, LogRecord, LogSink, Logger, Severity, TracingSink};
pub use passphrase::hash_passphrase;
pub use store::KeyStore;
pub use stream::{wrap_reader, wrap_writer, DecryptReader, EncryptWriter, IvMode, StreamCipher};
