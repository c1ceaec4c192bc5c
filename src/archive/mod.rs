//! Archive reading.
//!
//! An [`ArchiveSource`] hands out raw message blobs oldest first; this module
//! parses them in parallel into [`RawMessage`] records.
//!
//! # Parallelism
//!
//! Parsing is CPU bound (MIME decoding, charset conversion) and shares no
//! state, so it runs on a rayon pool sized by `num_cpus`. The output keeps
//! the delivery order of the source; blobs that fail to parse are logged,
//! counted and dropped.

pub mod files;
pub mod git;
pub mod parser;

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use thiserror::Error;

use crate::history::GitError;
use crate::models::RawMessage;

pub use files::MessageDir;
pub use git::PublicInboxMirror;
pub use parser::{ParseMessageError, parse_message};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error(transparent)]
    Git(#[from] GitError),
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("message file {path} is missing")]
    Missing { path: PathBuf },
    #[error("cached messages in {path} look stale (file {index} differs from the mirror)")]
    Stale { path: PathBuf, index: usize },
    #[error("failed to create thread pool: {0}")]
    Pool(String),
}

/// Somewhere raw messages come from.
pub trait ArchiveSource {
    fn describe(&self) -> String;

    /// The `count` most recent message blobs, oldest first.
    fn read_blobs(&self, count: usize) -> Result<Vec<Vec<u8>>, ArchiveError>;
}

/// Outcome counters of a parse run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseSummary {
    pub ok: usize,
    pub errors: usize,
}

/// Parse blobs on a rayon pool, preserving their order.
pub fn parse_all_parallel(
    blobs: &[Vec<u8>],
) -> Result<(Vec<RawMessage>, ParseSummary), ArchiveError> {
    log::info!("parsing {} messages with {} threads", blobs.len(), num_cpus::get());

    let thread_pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_cpus::get())
        .build()
        .map_err(|e| ArchiveError::Pool(e.to_string()))?;

    let parse_success = AtomicUsize::new(0);
    let parse_errors = AtomicUsize::new(0);

    let parsed: Vec<RawMessage> = thread_pool.install(|| {
        blobs
            .par_iter()
            .enumerate()
            .filter_map(|(position, blob)| match parse_message(blob) {
                Ok(message) => {
                    parse_success.fetch_add(1, Ordering::Relaxed);
                    Some(message)
                }
                Err(e) => {
                    parse_errors.fetch_add(1, Ordering::Relaxed);
                    log::warn!("parse error for message #{}: {}", position, e);
                    None
                }
            })
            .collect()
    });

    let summary = ParseSummary {
        ok: parse_success.load(Ordering::Relaxed),
        errors: parse_errors.load(Ordering::Relaxed),
    };
    log::info!("parsing complete: {} ok, {} errors", summary.ok, summary.errors);

    Ok((parsed, summary))
}

/// Read and parse the `count` most recent messages of `source`.
///
/// Blobs that fail to parse are dropped; the summary tells how many.
pub fn read_messages(
    source: &dyn ArchiveSource,
    count: usize,
) -> Result<(Vec<RawMessage>, ParseSummary), ArchiveError> {
    log::info!("reading {} messages from {}", count, source.describe());
    let blobs = source.read_blobs(count)?;
    parse_all_parallel(&blobs)
}
