#![forbid(unsafe_code)]

//! Linear-scan query layer.
//!
//! The ledger has no bulk query: a view snapshot is produced by reading the
//! job count once and issuing one point-lookup per key, in increasing key
//! order, strictly sequentially. Sequential awaits bound outstanding remote
//! calls to one and keep accumulation order deterministic, so a stable sort
//! afterwards orders ties by key.
//!
//! The count is read exactly once per scan. Jobs posted while the scan is
//! running are not retroactively included; they land in the next scan. This
//! keeps the loop bound finite and the staleness at most one scan behind.
//!
//! [`scan_bids`] is the one scan variant without a known upper bound: it
//! probes a job's bid list slot by slot and stops at the first absent
//! sentinel.

use std::fmt;

use crate::record::{Bid, Job, JobKey};
use crate::source::{LookupError, RecordSource};
use crate::view::ViewSpec;

/// A scan aborted. The previous view snapshot is left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// The count accessor failed before any key was visited.
    Count(LookupError),
    /// A job lookup failed; the scan stopped at this key.
    Lookup { key: JobKey, error: LookupError },
    /// A bid-slot probe failed; the scan stopped at this slot.
    BidLookup {
        key: JobKey,
        slot: u64,
        error: LookupError,
    },
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(err) => write!(f, "job count read failed: {err}"),
            Self::Lookup { key, error } => write!(f, "scan aborted at job {key}: {error}"),
            Self::BidLookup { key, slot, error } => {
                write!(f, "bid scan aborted at job {key} slot {slot}: {error}")
            }
        }
    }
}

impl std::error::Error for ScanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Count(err) | Self::Lookup { error: err, .. } => Some(err),
            Self::BidLookup { error, .. } => Some(error),
        }
    }
}

/// Produce a fresh, ordered snapshot of the jobs matching a view spec.
///
/// Reads the count once, visits every key from 1 up to it, keeps the jobs the
/// spec's predicate accepts, and sorts the result with the spec's comparator.
/// Any failed lookup aborts the whole scan; partial results are never
/// returned.
pub async fn scan_jobs<S: RecordSource>(
    source: &S,
    spec: &ViewSpec,
) -> Result<Vec<Job>, ScanError> {
    let count = source.job_count().await.map_err(ScanError::Count)?;
    tracing::trace!(count, "job scan started");

    let mut matches = Vec::new();
    for raw in 1..=count {
        let key = JobKey::new(raw).expect("scan keys start at 1");
        let job = source
            .job(key)
            .await
            .map_err(|error| ScanError::Lookup { key, error })?;
        if spec.matches(&job) {
            matches.push(job);
        }
    }

    matches.sort_by(|a, b| spec.compare(a, b));
    tracing::trace!(scanned = count, matched = matches.len(), "job scan finished");
    Ok(matches)
}

/// Read a job's full bid list by probing slots until the absent sentinel.
///
/// The bid list has no count accessor; the first sentinel marks the end of
/// the list and is not included in the result.
pub async fn scan_bids<S: RecordSource>(source: &S, key: JobKey) -> Result<Vec<Bid>, ScanError> {
    let mut bids = Vec::new();
    let mut slot = 0u64;
    loop {
        let bid = source
            .bid(key, slot)
            .await
            .map_err(|error| ScanError::BidLookup { key, slot, error })?;
        if bid.is_absent() {
            break;
        }
        bids.push(bid);
        slot += 1;
    }
    tracing::trace!(job = %key, bids = bids.len(), "bid scan finished");
    Ok(bids)
}
