//! Byte range assignment across workers

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Contiguous slice of the source assigned to one worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerRange {
    /// Worker that owns this range
    pub worker: usize,
    /// First byte of the range
    pub offset: u64,
    /// Number of bytes in the range
    pub len: u64,
}

impl WorkerRange {
    /// One past the last byte of the range
    pub fn end(&self) -> u64 {
        self.offset + self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Split `total` bytes into `workers` contiguous ranges
///
/// Every worker gets `total / workers` bytes; the last one also takes the
/// remainder. Ranges are returned in worker order and cover `[0, total)`
/// exactly. Zero workers is an `InvalidConfig` error.
pub fn plan_ranges(total: u64, workers: usize) -> Result<Vec<WorkerRange>> {
    if workers == 0 {
        return Err(Error::InvalidConfig(
            "Worker count must be at least 1".to_string(),
        ));
    }

    let count = workers as u64;
    let base = total / count;
    let remainder = total % count;

    Ok((0..workers)
        .map(|worker| {
            let last = worker + 1 == workers;
            WorkerRange {
                worker,
                offset: worker as u64 * base,
                len: if last { base + remainder } else { base },
            }
        })
        .collect())
}
