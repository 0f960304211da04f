#![forbid(unsafe_code)]

//! Record-store boundary.
//!
//! The ledger exposes nothing richer than sequential point-lookups: a count
//! accessor, a lookup-by-key, a per-job bid-slot probe, and typed change
//! feeds. [`RecordSource`] models exactly that capability so the scan engine
//! and the coordinator can be exercised against an in-memory fake.
//!
//! The trait uses return-position `impl Trait` for zero-overhead async — no
//! boxing at the boundary.

use std::fmt;
use std::future::Future;

use tokio::sync::mpsc;

use crate::record::{Bid, ChangeNotice, Job, JobKey, NoticeKind};

/// A single point-lookup failed at the transport or the remote end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The transport to the ledger failed.
    Transport(String),
    /// The ledger rejected the call.
    Rejected(String),
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(msg) => write!(f, "transport failure: {msg}"),
            Self::Rejected(msg) => write!(f, "ledger rejected call: {msg}"),
        }
    }
}

impl std::error::Error for LookupError {}

/// A notice feed could not be opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeError {
    /// The feed that failed to open.
    pub kind: NoticeKind,
    /// Transport-level reason.
    pub reason: String,
}

impl SubscribeError {
    /// Create a subscribe error for a feed.
    #[must_use]
    pub fn new(kind: NoticeKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SubscribeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "could not open {} feed: {}", self.kind, self.reason)
    }
}

impl std::error::Error for SubscribeError {}

/// Opaque handle identifying one open notice feed at the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeedHandle(pub u64);

/// An open notice feed: the source-side handle plus the delivery channel.
///
/// Dropping the receiver alone does not release the source-side registration;
/// callers pass `handle` back through [`RecordSource::unsubscribe`].
#[derive(Debug)]
pub struct NoticeFeed {
    pub handle: FeedHandle,
    pub notices: mpsc::UnboundedReceiver<ChangeNotice>,
}

/// Asynchronous point-lookup capability over the ledger.
///
/// All calls may suspend and may fail with a transport error. Keys
/// `1..=job_count()` always resolve to a job; bid slots past the end of a
/// job's bid list resolve to the absent sentinel rather than an error.
pub trait RecordSource: Send + Sync {
    /// Number of jobs ever posted. Keys `1..=count` are all live.
    fn job_count(&self) -> impl Future<Output = Result<u64, LookupError>> + Send;

    /// Look up one job by key.
    fn job(&self, key: JobKey) -> impl Future<Output = Result<Job, LookupError>> + Send;

    /// Probe one slot of a job's bid list.
    ///
    /// Returns the absent sentinel for slots past the end of the list.
    fn bid(&self, key: JobKey, slot: u64) -> impl Future<Output = Result<Bid, LookupError>> + Send;

    /// Open a feed of change notices of one kind.
    fn subscribe(
        &self,
        kind: NoticeKind,
    ) -> impl Future<Output = Result<NoticeFeed, SubscribeError>> + Send;

    /// Release a feed previously opened with [`subscribe`](Self::subscribe).
    ///
    /// Unknown handles are ignored.
    fn unsubscribe(&self, handle: FeedHandle) -> impl Future<Output = ()> + Send;
}
