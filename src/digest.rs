//! SHA-256 helpers shared by the passphrase hasher and the key store.

use std::io::{self, Read};

use ring::digest::{self, Context, SHA256};

/// Length of a hex-encoded SHA-256 digest.
pub const DIGEST_HEX_LEN: usize = 64;

const READ_CHUNK: usize = 8 * 1024;

/// Hex-encoded SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(digest::digest(&SHA256, data))
}

/// Hex-encoded SHA-256 of everything readable from `reader`.
///
/// Reads in fixed-size chunks so large files are never held in memory.
pub fn sha256_hex_reader<R: Read>(mut reader: R) -> io::Result<String> {
    let mut ctx = Context::new(&SHA256);
    let mut buf = [0u8; READ_CHUNK];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        ctx.update(&buf[..n]);
    }
    Ok(hex::encode(ctx.finish()))
}

/// True if `s` looks like a hex SHA-256 digest (either case).
pub fn is_digest_hex(s: &str) -> bool {
    s.len() == DIGEST_HEX_LEN && s.bytes().all(|b| b.is_ascii_hexdigit())
}
