#![forbid(unsafe_code)]

//! Per-view state and pagination.
//!
//! A view is a named, independently paginated projection (filter + sort) over
//! the full record set. View state is only ever replaced wholesale by a
//! completed scan — never patched incrementally from a notification payload —
//! and pagination is a pure projection of the last snapshot: moving pages is
//! instantaneous and never touches the ledger.
//!
//! # Invariants
//!
//! - `1 ≤ current_page ≤ total_pages` at all times.
//! - `total_pages = max(1, ceil(total_items / page_size))`; an empty view has
//!   one (empty) page, not zero.
//! - A snapshot that shrinks the item count below the previous page's range
//!   clamps `current_page` into range.

use std::cmp::Ordering;
use std::fmt;
use std::num::NonZeroUsize;

use crate::record::Job;

/// Default page size for dashboard views.
pub const DEFAULT_PAGE_SIZE: usize = 8;

/// Names of the dashboard views a session can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewName {
    /// Jobs posted by the active client.
    ClientJobs,
    /// Open jobs a freelancer can bid on.
    Marketplace,
    /// Jobs the active freelancer is hired on.
    MyContracts,
    /// Jobs under arbitration.
    DisputedJobs,
}

impl ViewName {
    /// Stable name for logging.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ClientJobs => "client-jobs",
            Self::Marketplace => "marketplace",
            Self::MyContracts => "my-contracts",
            Self::DisputedJobs => "disputed-jobs",
        }
    }
}

impl fmt::Display for ViewName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filter, order, and page size of one view. Fixed for a session's lifetime.
pub struct ViewSpec {
    predicate: Box<dyn Fn(&Job) -> bool + Send + Sync>,
    comparator: Box<dyn Fn(&Job, &Job) -> Ordering + Send + Sync>,
    page_size: NonZeroUsize,
}

impl ViewSpec {
    /// Create a spec that matches everything, ordered by key ascending.
    #[must_use]
    pub fn new(page_size: NonZeroUsize) -> Self {
        Self {
            predicate: Box::new(|_| true),
            comparator: Box::new(|a, b| a.key.cmp(&b.key)),
            page_size,
        }
    }

    /// Create a spec with the default page size.
    #[must_use]
    pub fn with_default_page_size() -> Self {
        Self::new(NonZeroUsize::new(DEFAULT_PAGE_SIZE).unwrap())
    }

    /// Replace the inclusion predicate.
    #[must_use]
    pub fn filter(mut self, predicate: impl Fn(&Job) -> bool + Send + Sync + 'static) -> Self {
        self.predicate = Box::new(predicate);
        self
    }

    /// Replace the ordering comparator.
    ///
    /// Matches are accumulated in key order and sorted stably, so comparators
    /// without a tie-break still order ties deterministically (by key).
    #[must_use]
    pub fn order_by(
        mut self,
        comparator: impl Fn(&Job, &Job) -> Ordering + Send + Sync + 'static,
    ) -> Self {
        self.comparator = Box::new(comparator);
        self
    }

    /// Whether a job belongs to this view.
    #[must_use]
    pub fn matches(&self, job: &Job) -> bool {
        (self.predicate)(job)
    }

    /// Order two jobs within this view.
    #[must_use]
    pub fn compare(&self, a: &Job, b: &Job) -> Ordering {
        (self.comparator)(a, b)
    }

    /// Items per page.
    #[must_use]
    pub const fn page_size(&self) -> NonZeroUsize {
        self.page_size
    }
}

impl fmt::Debug for ViewSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewSpec")
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

/// One page of a view, as handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Items of the current page, in view order.
    pub items: Vec<Job>,
    /// Current page number (1-based).
    pub page: usize,
    /// Total number of pages (at least 1).
    pub total_pages: usize,
    /// Total matching items across all pages.
    pub total_items: usize,
}

/// The last completed snapshot of a view plus the pagination cursor.
#[derive(Debug)]
pub struct ViewState {
    items: Vec<Job>,
    current_page: usize,
    page_size: NonZeroUsize,
}

impl ViewState {
    /// Create an empty state on page 1.
    #[must_use]
    pub fn new(page_size: NonZeroUsize) -> Self {
        Self {
            items: Vec::new(),
            current_page: 1,
            page_size,
        }
    }

    /// Total matching items in the last snapshot.
    #[must_use]
    pub fn total_items(&self) -> usize {
        self.items.len()
    }

    /// The full ordered snapshot, across all pages.
    #[must_use]
    pub fn items(&self) -> &[Job] {
        &self.items
    }

    /// Total pages; an empty view still has one page.
    #[must_use]
    pub fn total_pages(&self) -> usize {
        self.items.len().div_ceil(self.page_size.get()).max(1)
    }

    /// Current page number (1-based, always in range).
    #[must_use]
    pub const fn current_page(&self) -> usize {
        self.current_page
    }

    /// Replace the snapshot wholesale with a completed scan's output.
    ///
    /// Clamps the pagination cursor when the new snapshot no longer reaches
    /// the previous page.
    pub fn replace(&mut self, items: Vec<Job>) {
        self.items = items;
        self.current_page = self.current_page.clamp(1, self.total_pages());
    }

    /// Move the pagination cursor, clamped to `[1, total_pages]`.
    ///
    /// Purely a cursor move over the last snapshot; never triggers a rescan.
    pub fn go_to_page(&mut self, page: usize) {
        self.current_page = page.clamp(1, self.total_pages());
    }

    /// The current page's slice of the snapshot.
    #[must_use]
    pub fn page(&self) -> Page {
        let size = self.page_size.get();
        let start = (self.current_page - 1) * size;
        let end = (start + size).min(self.items.len());
        let items = if start < self.items.len() {
            self.items[start..end].to_vec()
        } else {
            Vec::new()
        };
        Page {
            items,
            page: self.current_page,
            total_pages: self.total_pages(),
            total_items: self.items.len(),
        }
    }
}
