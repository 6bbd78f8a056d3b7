//! BLAKE3 content digests
//!
//! Whole files and individual parts are hashed the same way, so a digest
//! computed from a reader always equals the one-shot digest of the same
//! bytes.

use crate::error::Result;
use blake3::Hasher;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Hex digest of a byte buffer
pub fn digest(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

/// Hex digest of everything a reader yields
pub fn digest_reader<R: Read>(mut reader: R) -> std::io::Result<String> {
    let mut hasher = Hasher::new();
    std::io::copy(&mut reader, &mut hasher)?;
    Ok(hasher.finalize().to_hex().to_string())
}

/// Hex digest of a file's full contents
pub fn digest_file<P: AsRef<Path>>(path: P) -> Result<String> {
    Ok(digest_reader(File::open(path)?)?)
}
