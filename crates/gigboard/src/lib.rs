#![forbid(unsafe_code)]

//! Gigboard public facade crate.
//!
//! This crate provides the stable surface area for embedders: it re-exports
//! the record model, the store boundary, the coordinator, and the session
//! manager from the internal crates, and offers a lightweight prelude for
//! day-to-day usage.
//!
//! An embedder wires three things together:
//!
//! 1. a [`RecordSource`] implementation over the real ledger transport,
//! 2. a [`SessionManager`] driven from the login/logout edge,
//! 3. a presentation layer reading pages from the session's
//!    [`RefreshCoordinator`].

use std::fmt;

// --- Record model re-exports -----------------------------------------------

pub use gigboard_core::record::{
    AccountId, Bid, ChangeNotice, Job, JobKey, JobStatus, NoticeKind, Role,
};

// --- Store boundary re-exports ---------------------------------------------

pub use gigboard_core::source::{
    FeedHandle, LookupError, NoticeFeed, RecordSource, SubscribeError,
};

// --- Scan/view re-exports --------------------------------------------------

pub use gigboard_core::scan::{ScanError, scan_bids, scan_jobs};
pub use gigboard_core::view::{DEFAULT_PAGE_SIZE, Page, ViewName, ViewSpec, ViewState};

// --- Runtime re-exports ----------------------------------------------------

pub use gigboard_runtime::{
    Coalescer, DEFAULT_COALESCE_WINDOW, RefreshCoordinator, SessionManager, StartReport,
    ViewRegistry, invalidated_views,
};

// --- Errors ----------------------------------------------------------------

/// Top-level error type for gigboard embedders.
#[derive(Debug)]
pub enum Error {
    /// A point-lookup at the ledger failed.
    Lookup(LookupError),
    /// A scan aborted.
    Scan(ScanError),
    /// A notice feed could not be opened.
    Subscribe(SubscribeError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lookup(err) => write!(f, "{err}"),
            Self::Scan(err) => write!(f, "{err}"),
            Self::Subscribe(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Lookup(err) => Some(err),
            Self::Scan(err) => Some(err),
            Self::Subscribe(err) => Some(err),
        }
    }
}

impl From<LookupError> for Error {
    fn from(err: LookupError) -> Self {
        Self::Lookup(err)
    }
}

impl From<ScanError> for Error {
    fn from(err: ScanError) -> Self {
        Self::Scan(err)
    }
}

impl From<SubscribeError> for Error {
    fn from(err: SubscribeError) -> Self {
        Self::Subscribe(err)
    }
}

/// Standard result type for gigboard APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude ---------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        AccountId, ChangeNotice, Error, Job, JobKey, JobStatus, NoticeKind, Page,
        RecordSource, RefreshCoordinator, Result, Role, SessionManager, ViewName,
    };
}
