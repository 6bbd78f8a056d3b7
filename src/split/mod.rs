//! Parallel file splitting
//!
//! Plans one byte range per worker, extracts each range into part files
//! concurrently, merges the per-worker results into a single ordered part
//! list and optionally verifies the result against a whole-file digest.

mod coordinator;
mod extractor;
mod hasher;
mod planner;
mod verify;

pub use coordinator::{CancelHandle, SplitOutcome, Splitter};
pub use extractor::{part_file_name, BlockCursor, BlockExtractor, BlockRead, ExtractedBlock};
pub use hasher::{digest, digest_file, digest_reader};
pub use planner::{plan_ranges, WorkerRange};
pub use verify::{corrupt_parts, verify_parts, verify_split, PartFile};

use serde::{Deserialize, Serialize};

/// One part file in the final, globally ordered split
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    /// Worker that wrote the part
    pub worker: usize,
    /// Sequence number within the worker, starting at 1
    pub block: u64,
    /// Position in the reconstructed file, starting at 0
    pub order: u64,
    /// File name relative to the output directory
    pub file_name: String,
    /// BLAKE3 hex digest of the part's bytes
    pub digest: String,
    /// Part length in bytes
    pub len: u64,
}

impl PartFile for Part {
    fn order(&self) -> u64 {
        self.order
    }

    fn file_name(&self) -> &str {
        &self.file_name
    }

    fn digest(&self) -> &str {
        &self.digest
    }
}

/// Flatten per-worker block lists into one ordered part list
///
/// `per_worker` must be indexed by worker. Ranges are contiguous in worker
/// order, so worker order then block order is byte order.
pub fn merge_parts(per_worker: Vec<Vec<ExtractedBlock>>) -> Vec<Part> {
    per_worker
        .into_iter()
        .flatten()
        .enumerate()
        .map(|(order, block)| Part {
            worker: block.worker,
            block: block.block,
            order: order as u64,
            file_name: block.file_name,
            digest: block.digest,
            len: block.len,
        })
        .collect()
}
