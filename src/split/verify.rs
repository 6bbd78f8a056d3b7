//! Post-split integrity checks
//!
//! The whole-file check streams every part, in order, through one hasher
//! and compares against the digest taken before splitting. The per-part
//! check re-hashes each part on its own so a failure can be pinned to a
//! specific file.

use super::hasher::digest_reader;
use crate::error::{Error, Result};
use blake3::Hasher;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// A part file as seen by the verifier
pub trait PartFile {
    /// Position in the reconstructed file
    fn order(&self) -> u64;
    /// File name relative to the parts directory
    fn file_name(&self) -> &str;
    /// Digest recorded when the part was written
    fn digest(&self) -> &str;
}

/// Check that the parts, concatenated in order, hash to `expected`
///
/// `parts` must already be sorted by order. `name` identifies the job in
/// the error.
pub fn verify_split<P: PartFile>(
    name: &str,
    parts: &[P],
    dir: &Path,
    expected: &str,
) -> Result<()> {
    let mut hasher = Hasher::new();
    for part in parts {
        File::open(dir.join(part.file_name()))
            .and_then(|mut file| std::io::copy(&mut file, &mut hasher))
            .map_err(|source| unreadable(part, source))?;
    }

    let actual = hasher.finalize().to_hex().to_string();
    if actual != expected {
        return Err(Error::IntegrityMismatch {
            file: name.to_string(),
            expected: expected.to_string(),
            actual,
        });
    }

    debug!(file = name, parts = parts.len(), "Split verified");
    Ok(())
}

/// Re-hash every part and compare with its recorded digest
///
/// Fails on the first part that does not match.
pub fn verify_parts<P: PartFile>(parts: &[P], dir: &Path) -> Result<()> {
    match corrupt_parts(parts, dir)?.into_iter().next() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Every part whose contents no longer match its digest
pub fn corrupt_parts<P: PartFile>(parts: &[P], dir: &Path) -> Result<Vec<Error>> {
    let mut corrupt = Vec::new();
    for part in parts {
        let actual = File::open(dir.join(part.file_name()))
            .and_then(digest_reader)
            .map_err(|source| unreadable(part, source))?;
        if actual != part.digest() {
            corrupt.push(Error::CorruptPart {
                order: part.order(),
                file_name: part.file_name().to_string(),
                expected: part.digest().to_string(),
                actual,
            });
        }
    }
    Ok(corrupt)
}

fn unreadable<P: PartFile>(part: &P, source: std::io::Error) -> Error {
    Error::PartUnreadable {
        file_name: part.file_name().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Stage;
    use crate::split::digest;
    use tempfile::tempdir;

    struct TestPart {
        order: u64,
        name: String,
        digest: String,
    }

    impl PartFile for TestPart {
        fn order(&self) -> u64 {
            self.order
        }
        fn file_name(&self) -> &str {
            &self.name
        }
        fn digest(&self) -> &str {
            &self.digest
        }
    }

    fn write_parts(dir: &Path, chunks: &[&[u8]]) -> Vec<TestPart> {
        chunks
            .iter()
            .enumerate()
            .map(|(i, data)| {
                let name = format!("p{}", i);
                std::fs::write(dir.join(&name), data).unwrap();
                TestPart {
                    order: i as u64,
                    name,
                    digest: digest(data),
                }
            })
            .collect()
    }

    #[test]
    fn test_verify_split_ok() {
        let dir = tempdir().unwrap();
        let parts = write_parts(dir.path(), &[b"hello ", b"world"]);

        verify_split("f", &parts, dir.path(), &digest(b"hello world")).unwrap();
    }

    #[test]
    fn test_verify_split_order_matters() {
        let dir = tempdir().unwrap();
        let mut parts = write_parts(dir.path(), &[b"hello ", b"world"]);
        parts.reverse();

        let err = verify_split("f", &parts, dir.path(), &digest(b"hello world")).unwrap_err();
        assert!(matches!(err, Error::IntegrityMismatch { .. }));
    }

    #[test]
    fn test_verify_empty() {
        let dir = tempdir().unwrap();
        let parts: Vec<TestPart> = Vec::new();

        verify_split("empty", &parts, dir.path(), &digest(&[])).unwrap();
    }

    #[test]
    fn test_locate_corrupt_part() {
        let dir = tempdir().unwrap();
        let parts = write_parts(dir.path(), &[b"aaaa", b"bbbb", b"cccc"]);
        std::fs::write(dir.path().join("p1"), b"bbbB").unwrap();

        assert_eq!(corrupt_parts(&parts, dir.path()).unwrap().len(), 1);
        match verify_parts(&parts, dir.path()).unwrap_err() {
            Error::CorruptPart {
                order, file_name, ..
            } => {
                assert_eq!(order, 1);
                assert_eq!(file_name, "p1");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_missing_part() {
        let dir = tempdir().unwrap();
        let parts = write_parts(dir.path(), &[b"aaaa"]);
        std::fs::remove_file(dir.path().join("p0")).unwrap();

        let err = verify_split("f", &parts, dir.path(), &digest(b"aaaa")).unwrap_err();
        assert!(matches!(err, Error::PartUnreadable { ref file_name, .. } if file_name == "p0"));
        assert_eq!(err.stage(), Stage::Verification);

        let err = verify_parts(&parts, dir.path()).unwrap_err();
        assert_eq!(err.stage(), Stage::Verification);
    }
}
