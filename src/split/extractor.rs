//! Per-worker block extraction
//!
//! Each worker opens its own handle on the source, seeks to the start of
//! its range and copies the range out block by block. Reads loop until a
//! block is full, so short reads from the OS never produce short parts.

use super::hasher::digest;
use super::planner::WorkerRange;
use crate::config::SplitJob;
use crate::error::{Error, Result};
use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// A part written by a worker, before global ordering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedBlock {
    /// Worker that wrote the block
    pub worker: usize,
    /// Sequence number within the worker, starting at 1
    pub block: u64,
    /// Part file name, relative to the output directory
    pub file_name: String,
    /// Digest of the block's bytes
    pub digest: String,
    /// Block length in bytes
    pub len: u64,
}

/// Outcome of asking a range for its next block
#[derive(Debug, PartialEq, Eq)]
pub enum BlockRead {
    /// A full block of the requested length
    Block(Vec<u8>),
    /// Nothing left in the range
    Exhausted,
}

/// Sequential block reader bounded to a byte count
pub struct BlockCursor<R> {
    reader: R,
    remaining: u64,
    block_size: u64,
}

impl<R: Read> BlockCursor<R> {
    /// Wrap a reader already positioned at the start of the range
    pub fn new(reader: R, len: u64, block_size: u64) -> Self {
        BlockCursor {
            reader,
            remaining: len,
            block_size,
        }
    }

    /// Bytes not yet handed out
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Read the next `min(block_size, remaining)` bytes
    ///
    /// Returns an `UnexpectedEof` error if the source ends before the
    /// block is filled.
    pub fn next_block(&mut self) -> std::io::Result<BlockRead> {
        if self.remaining == 0 {
            return Ok(BlockRead::Exhausted);
        }

        let len = self.block_size.min(self.remaining) as usize;
        let mut buffer = vec![0u8; len];
        let mut total_read = 0;

        while total_read < len {
            match self.reader.read(&mut buffer[total_read..]) {
                Ok(0) => {
                    return Err(std::io::Error::new(
                        ErrorKind::UnexpectedEof,
                        format!("source ended {} bytes into a {} byte block", total_read, len),
                    ))
                }
                Ok(n) => total_read += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        self.remaining -= len as u64;
        Ok(BlockRead::Block(buffer))
    }
}

/// Part file name: `<base>.<worker>.<block>.<digest>.part`
pub fn part_file_name(base_name: &str, worker: usize, block: u64, digest: &str) -> String {
    format!("{}.{}.{}.{}.part", base_name, worker, block, digest)
}

/// Copies one worker range out of the source into part files
pub struct BlockExtractor {
    job: Arc<SplitJob>,
    range: WorkerRange,
    cancelled: Arc<AtomicBool>,
}

impl BlockExtractor {
    /// Create an extractor for one range of a job
    pub fn new(job: Arc<SplitJob>, range: WorkerRange, cancelled: Arc<AtomicBool>) -> Self {
        BlockExtractor {
            job,
            range,
            cancelled,
        }
    }

    /// Run to completion, returning this worker's blocks in order
    ///
    /// Any failure is reported with the worker index and the last block
    /// that made it to disk.
    pub fn run(self) -> Result<Vec<ExtractedBlock>> {
        let worker = self.range.worker;
        let mut blocks = Vec::new();

        if self.range.is_empty() {
            debug!(worker, "Empty range, nothing to extract");
            return Ok(blocks);
        }

        let fail = |blocks: &[ExtractedBlock], source: std::io::Error| Error::Extraction {
            worker,
            last_block: blocks.last().map(|b: &ExtractedBlock| b.block),
            source,
        };

        let mut file = File::open(self.job.source()).map_err(|e| fail(&blocks, e))?;
        file.seek(SeekFrom::Start(self.range.offset))
            .map_err(|e| fail(&blocks, e))?;
        let mut cursor = BlockCursor::new(file, self.range.len, self.job.block_size());

        loop {
            if self.cancelled.load(Ordering::Relaxed) {
                return Err(Error::Cancelled {
                    worker,
                    last_block: blocks.last().map(|b| b.block),
                });
            }

            let data = match cursor.next_block().map_err(|e| fail(&blocks, e))? {
                BlockRead::Block(data) => data,
                BlockRead::Exhausted => break,
            };

            let block = blocks.len() as u64 + 1;
            let extracted = self
                .write_part(block, &data)
                .map_err(|e| fail(&blocks, e))?;
            debug!(
                worker,
                block,
                len = extracted.len,
                file = %extracted.file_name,
                "Wrote part"
            );
            blocks.push(extracted);
        }

        debug!(worker, parts = blocks.len(), "Range exhausted");
        Ok(blocks)
    }

    fn write_part(&self, block: u64, data: &[u8]) -> std::io::Result<ExtractedBlock> {
        let digest = digest(data);
        let file_name = part_file_name(self.job.base_name(), self.range.worker, block, &digest);
        write_file(&self.job.output_dir().join(&file_name), data)?;

        Ok(ExtractedBlock {
            worker: self.range.worker,
            block,
            file_name,
            digest,
            len: data.len() as u64,
        })
    }
}

fn write_file(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data)?;
    file.flush()
}
