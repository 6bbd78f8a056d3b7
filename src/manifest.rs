//! Split manifest
//!
//! Describes how to put a split file back together: the original name and
//! digest, the block size used, and every part in order. Stored as JSON
//! next to the parts.

use crate::config::SplitJob;
use crate::error::{Error, Result};
use crate::split::{digest, verify_parts, verify_split, PartFile, SplitOutcome};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// One entry of the manifest's part list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestPart {
    /// Digest of the part's bytes
    pub hash: String,
    /// Part file name, relative to the manifest's directory
    pub file_name: String,
    /// Position in the reconstructed file
    pub order: u64,
}

impl PartFile for ManifestPart {
    fn order(&self) -> u64 {
        self.order
    }

    fn file_name(&self) -> &str {
        &self.file_name
    }

    fn digest(&self) -> &str {
        &self.hash
    }
}

/// Manifest of a completed split
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Base name of the split file
    pub original_file_name: String,
    /// Whole-file digest, empty when integrity checking was skipped
    #[serde(default)]
    pub original_file_hash: String,
    /// Block size the split was made with
    pub block_size: u64,
    /// Parts sorted by order
    pub parts: Vec<ManifestPart>,
}

impl Manifest {
    /// Build the manifest for a finished split
    pub fn build(job: &SplitJob, outcome: &SplitOutcome) -> Self {
        let mut parts: Vec<ManifestPart> = outcome
            .parts
            .iter()
            .map(|p| ManifestPart {
                hash: p.digest.clone(),
                file_name: p.file_name.clone(),
                order: p.order,
            })
            .collect();
        parts.sort_by_key(|p| p.order);

        Manifest {
            original_file_name: job.base_name().to_string(),
            original_file_hash: outcome.file_digest.clone().unwrap_or_default(),
            block_size: job.block_size(),
            parts,
        }
    }

    /// Number of parts
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// Whether a whole-file digest was recorded
    pub fn has_file_hash(&self) -> bool {
        !self.original_file_hash.is_empty()
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Parse from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let mut manifest: Manifest =
            serde_json::from_str(json).map_err(|e| Error::Deserialization(e.to_string()))?;
        manifest.parts.sort_by_key(|p| p.order);
        Ok(manifest)
    }

    /// Write to `<dir>/<name>.<digest>.manifest.json` and return the path
    ///
    /// The digest is taken over the JSON itself.
    pub fn write_to<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        let json = self.to_json()?;
        let file_name = format!(
            "{}.{}.manifest.json",
            self.original_file_name,
            digest(json.as_bytes())
        );
        let path = dir.as_ref().join(file_name);

        std::fs::write(&path, json)?;
        info!(manifest = %path.display(), parts = self.parts.len(), "Wrote manifest");
        Ok(path)
    }

    /// Load a manifest file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Check the parts in `dir` against this manifest
    ///
    /// Every part is checked against its own hash first, so a corrupt part
    /// is reported by name; then the whole reconstruction is checked if a
    /// file hash was recorded.
    pub fn verify<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        verify_parts(&self.parts, dir)?;

        if self.has_file_hash() {
            verify_split(
                &self.original_file_name,
                &self.parts,
                dir,
                &self.original_file_hash,
            )?;
        }

        Ok(())
    }
}
