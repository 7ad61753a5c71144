//! Content-addressed key storage.
//!
//! Every key lives in its own file inside the key directory:
//!
//! ```text
//! <key_dir>/<hex sha256 of file contents>
//!     contents = nonce (12) ‖ AES-GCM(ciphertext of RawKeyHex) ‖ tag (16)
//! ```
//!
//! A record is written once by [`KeyStore::generate`] and never rewritten.
//! The store holds no locks: callers that write the same directory from
//! several processes must serialise those writes themselves.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::config::KeyStoreConfig;
use crate::crypto;
use crate::digest;
use crate::error::{KeycryptError, Result};
use crate::keys::{self, RawKeyHex};
use crate::log::{Logger, Severity};
use crate::passphrase;

/// Handle on one key directory.
#[derive(Debug, Clone)]
pub struct KeyStore {
    key_dir: PathBuf,
    logger: Logger,
}

impl KeyStore {
    /// A store over `key_dir`. Performs no I/O; the directory is expected
    /// to exist by the time keys are generated.
    pub fn new(key_dir: impl Into<PathBuf>) -> Self {
        Self {
            key_dir: key_dir.into(),
            logger: Logger::noop(),
        }
    }

    /// A store over the configured directory, creating it if asked to.
    pub fn from_config(config: &KeyStoreConfig) -> Result<Self> {
        if config.create_dir {
            fs::create_dir_all(&config.key_dir)?;
        }
        Ok(Self::new(config.key_dir.clone()))
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    pub fn key_dir(&self) -> &Path {
        &self.key_dir
    }

    /// Generate a key, seal it under `passphrase`, and store it.
    ///
    /// Returns the hex digest that names the new record.
    pub fn generate(&self, passphrase: &str) -> Result<String> {
        const ORIGIN: &str = "store::generate";
        self.logger.funct(ORIGIN);

        let raw = keys::generate_raw_key()?;
        let wrapping = passphrase::hash_passphrase(passphrase);
        let blob = crypto::seal(wrapping.as_hex(), raw.as_bytes())?;
        let name = digest::sha256_hex(&blob);
        let path = self.key_dir.join(&name);

        if let Err(e) = write_record(&self.key_dir, &path, &blob) {
            self.logger.error(ORIGIN, &e);
            return Err(e.into());
        }

        self.logger
            .debug(ORIGIN, "stored key", &[&name, &path.display()]);
        Ok(name)
    }

    /// Read the record at `path` and open it with `passphrase`.
    ///
    /// `path` need not be inside the key directory.
    pub fn load(&self, path: impl AsRef<Path>, passphrase: &str) -> Result<RawKeyHex> {
        const ORIGIN: &str = "store::load";
        let path = path.as_ref();
        self.logger.debug(ORIGIN, "loading key", &[&path.display()]);

        let blob = fs::read(path).map_err(|e| self.io_error(ORIGIN, path, e))?;
        let wrapping = passphrase::hash_passphrase(passphrase);
        let plaintext = crypto::open(wrapping.as_hex(), &blob).map_err(|e| {
            self.logger.error(ORIGIN, &e);
            e
        })?;
        RawKeyHex::from_plaintext(plaintext)
    }

    /// Find the record whose contents hash to `digest_hex` and open it.
    pub fn load_by_digest(&self, digest_hex: &str, passphrase: &str) -> Result<RawKeyHex> {
        let path = self.find_by_digest(digest_hex)?;
        self.logger.log(
            Severity::Call,
            "store::load_by_digest",
            Some("store::load"),
            &[&path.display()],
        );
        self.load(path, passphrase)
    }

    /// Locate the record whose contents hash to `digest_hex`.
    ///
    /// The file named by the digest is tried first; if it is absent or its contents
    /// do not match, every file in the directory is hashed in turn. Any I/O
    /// error aborts the search.
    pub fn find_by_digest(&self, digest_hex: &str) -> Result<PathBuf> {
        const ORIGIN: &str = "store::find_by_digest";
        if !digest::is_digest_hex(digest_hex) {
            return Err(KeycryptError::KeyFormat(
                "digest must be 64 hex characters".to_string(),
            ));
        }
        let wanted = digest_hex.to_ascii_lowercase();

        // Same rule as the scan: regular files only, symlinks not followed.
        let direct = self.key_dir.join(&wanted);
        let direct_is_file = fs::symlink_metadata(&direct)
            .map(|m| m.file_type().is_file())
            .unwrap_or(false);
        if direct_is_file && self.content_digest(&direct)? == wanted {
            return Ok(direct);
        }

        self.logger.debug(ORIGIN, "scanning", &[&self.key_dir.display()]);
        for path in self.record_paths()? {
            if self.content_digest(&path)? == wanted {
                return Ok(path);
            }
        }

        let err = KeycryptError::NotFound(format!("no key with digest {wanted}"));
        self.logger.error(ORIGIN, &err);
        Err(err)
    }

    /// Digests of every record whose file name matches its contents.
    pub fn digests(&self) -> Result<Vec<String>> {
        let mut found = Vec::new();
        for path in self.record_paths()? {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if digest::is_digest_hex(name) && self.content_digest(&path)? == name {
                found.push(name.to_string());
            }
        }
        found.sort();
        Ok(found)
    }

    /// True if the file at `path` is named by the digest of its own contents.
    pub fn verify(&self, path: impl AsRef<Path>) -> Result<bool> {
        let path = path.as_ref();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return Ok(false);
        };
        Ok(self.content_digest(path)? == name)
    }

    /// Regular files in the key directory, in directory order.
    fn record_paths(&self) -> Result<Vec<PathBuf>> {
        const ORIGIN: &str = "store::record_paths";
        let entries = fs::read_dir(&self.key_dir)
            .map_err(|e| self.io_error(ORIGIN, &self.key_dir, e))?;
        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| self.io_error(ORIGIN, &self.key_dir, e))?;
            let file_type = entry
                .file_type()
                .map_err(|e| self.io_error(ORIGIN, &entry.path(), e))?;
            if file_type.is_file() {
                paths.push(entry.path());
            }
        }
        Ok(paths)
    }

    fn content_digest(&self, path: &Path) -> Result<String> {
        let file = File::open(path)
            .map_err(|e| self.io_error("store::content_digest", path, e))?;
        digest::sha256_hex_reader(file)
            .map_err(|e| self.io_error("store::content_digest", path, e))
    }

    fn io_error(&self, origin: &str, path: &Path, err: io::Error) -> KeycryptError {
        self.logger.log(
            Severity::Error,
            origin,
            Some(path.display().to_string().as_str()),
            &[&err],
        );
        if err.kind() == io::ErrorKind::NotFound {
            KeycryptError::NotFound(path.display().to_string())
        } else {
            KeycryptError::Io(err)
        }
    }
}

/// Write `data` to a temporary file in `dir`, then move it to `path`.
///
/// `path` only ever appears with its full contents. On any failure the
/// temporary file is removed and an existing `path` is left untouched.
fn write_record(dir: &Path, path: &Path, data: &[u8]) -> io::Result<()> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist_noclobber(path).map_err(|e| e.error)?;
    Ok(())
}
