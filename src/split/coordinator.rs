//! Split job orchestration
//!
//! Runs one extractor per worker range on the blocking thread pool, waits
//! for every one of them, and only then merges and verifies. A single
//! failed worker fails the whole job.

use super::extractor::{BlockExtractor, ExtractedBlock};
use super::hasher::digest_reader;
use super::planner::plan_ranges;
use super::verify::{corrupt_parts, verify_split};
use super::{merge_parts, Part};
use crate::config::SplitJob;
use crate::error::{Error, Result};
use futures::future::join_all;
use std::fs::File;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};

/// Result of a successful split
#[derive(Debug, Clone)]
pub struct SplitOutcome {
    /// Parts in reconstruction order
    pub parts: Vec<Part>,
    /// Whole-file digest, if verification was enabled
    pub file_digest: Option<String>,
}

impl SplitOutcome {
    /// Sum of all part lengths
    pub fn total_bytes(&self) -> u64 {
        self.parts.iter().map(|p| p.len).sum()
    }
}

/// Cooperative cancellation flag shared with running workers
///
/// Workers check it between blocks; a cancelled job fails like any other
/// worker failure.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Ask all workers to stop at their next block boundary
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Runs a [`SplitJob`] across its worker pool
pub struct Splitter {
    job: Arc<SplitJob>,
    cancel: CancelHandle,
}

impl Splitter {
    /// Create a splitter for a prepared job
    pub fn new(job: SplitJob) -> Self {
        Splitter {
            job: Arc::new(job),
            cancel: CancelHandle::default(),
        }
    }

    /// The job this splitter runs
    pub fn job(&self) -> &SplitJob {
        &self.job
    }

    /// Handle that can cancel a running split from another task
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Split the source into parts
    ///
    /// Part files already written are left in place when this fails.
    pub async fn split(&self) -> Result<SplitOutcome> {
        let job = self.job.clone();
        info!(
            file = %job.source().display(),
            size = job.size(),
            block_size = job.block_size(),
            workers = job.workers(),
            "Splitting file"
        );

        let file_digest = if job.verify() {
            let source = job.source().to_path_buf();
            let digest = tokio::task::spawn_blocking(move || source_digest(source))
                .await
                .map_err(|e| Error::Internal(format!("Digest task failed: {}", e)))??;
            debug!(digest = %digest, "Computed whole-file digest");
            Some(digest)
        } else {
            None
        };

        let parts = self.extract_all().await?;

        check_total(&parts, job.size())?;

        let parts = match &file_digest {
            Some(expected) => {
                let expected = expected.clone();
                let verify_job = job.clone();
                let (parts, verified) = tokio::task::spawn_blocking(move || {
                    let verified = verify_outcome(&verify_job, &parts, &expected);
                    (parts, verified)
                })
                .await
                .map_err(|e| Error::Internal(format!("Verification task failed: {}", e)))?;
                verified?;
                parts
            }
            None => parts,
        };

        info!(parts = parts.len(), "Split complete");
        Ok(SplitOutcome { parts, file_digest })
    }

    async fn extract_all(&self) -> Result<Vec<Part>> {
        let ranges = plan_ranges(self.job.size(), self.job.workers())?;

        let handles: Vec<_> = ranges
            .into_iter()
            .map(|range| {
                let extractor = BlockExtractor::new(self.job.clone(), range, self.cancel.0.clone());
                tokio::task::spawn_blocking(move || extractor.run())
            })
            .collect();

        // Barrier: every worker has finished before any result is looked at
        let results = join_all(handles).await;

        Ok(merge_parts(gather_workers(results)?))
    }
}

type WorkerResult = std::result::Result<Result<Vec<ExtractedBlock>>, JoinError>;

/// Collect per-worker block lists, or the failure of the lowest worker
///
/// `results` must be indexed by worker. Every failure is logged.
fn gather_workers(results: Vec<WorkerResult>) -> Result<Vec<Vec<ExtractedBlock>>> {
    let mut per_worker = Vec::with_capacity(results.len());
    let mut failure = None;
    for (worker, result) in results.into_iter().enumerate() {
        match result {
            Ok(Ok(blocks)) => per_worker.push(blocks),
            Ok(Err(e)) => {
                error!(worker, error = %e, "Worker failed");
                failure.get_or_insert(e);
            }
            Err(e) => {
                error!(worker, error = %e, "Worker task did not complete");
                failure.get_or_insert(Error::WorkerPanicked {
                    worker,
                    message: e.to_string(),
                });
            }
        }
    }

    match failure {
        Some(err) => Err(err),
        None => Ok(per_worker),
    }
}

/// Fail unless the parts add up to exactly `expected` bytes
fn check_total(parts: &[Part], expected: u64) -> Result<()> {
    let actual: u64 = parts.iter().map(|p| p.len).sum();
    if actual != expected {
        return Err(Error::SizeMismatch { expected, actual });
    }
    Ok(())
}

fn source_digest(path: PathBuf) -> Result<String> {
    File::open(&path)
        .and_then(digest_reader)
        .map_err(|source| Error::SourceUnreadable { path, source })
}

fn verify_outcome(job: &SplitJob, parts: &[Part], expected: &str) -> Result<()> {
    let result = verify_split(job.base_name(), parts, job.output_dir(), expected);

    if let Err(Error::IntegrityMismatch { .. }) = &result {
        match corrupt_parts(parts, job.output_dir()) {
            Ok(corrupt) => {
                for err in corrupt {
                    warn!(error = %err, "Corrupt part");
                }
            }
            Err(e) => warn!(error = %e, "Could not check individual parts"),
        }
    }

    result
}
