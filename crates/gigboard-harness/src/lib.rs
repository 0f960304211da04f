#![forbid(unsafe_code)]

//! In-memory ledger fake for tests and benches.
//!
//! [`MemoryLedger`] implements the full [`RecordSource`] capability against a
//! plain `Vec`, plus the knobs tests need to provoke the coordinator's failure
//! and concurrency paths:
//!
//! - **Failure injection**: make lookups at chosen keys fail, or make the
//!   count accessor fail, to exercise scan-abort handling.
//! - **Lookup gate**: hold every job/bid lookup suspended, so a scan can be
//!   kept in flight while the test mutates the ledger or fires more refresh
//!   triggers, then release them all at once.
//! - **Notice feeds**: per-kind broadcast of [`ChangeNotice`] values with
//!   explicit handles, failure injection for `subscribe`, and a live-feed
//!   count for lifecycle assertions.
//! - **Call counting**: every remote call increments a counter, so tests can
//!   assert that pagination never touches the ledger.
//!
//! The fake is cheaply cloneable; clones share the same ledger.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{mpsc, watch};

use gigboard_core::record::{Bid, ChangeNotice, Job, JobKey, JobStatus, NoticeKind};
use gigboard_core::source::{
    FeedHandle, LookupError, NoticeFeed, RecordSource, SubscribeError,
};

/// Shared in-memory ledger implementing [`RecordSource`].
#[derive(Clone)]
pub struct MemoryLedger {
    inner: std::sync::Arc<Inner>,
}

struct Inner {
    jobs: Mutex<Vec<Job>>,
    bids: Mutex<HashMap<JobKey, Vec<Bid>>>,
    feeds: Mutex<HashMap<FeedHandle, Feed>>,
    next_handle: AtomicU64,
    remote_calls: AtomicU64,
    fail_keys: Mutex<HashSet<JobKey>>,
    fail_count: Mutex<bool>,
    fail_subscribe: Mutex<HashSet<NoticeKind>>,
    gate_tx: watch::Sender<bool>,
    gate_rx: watch::Receiver<bool>,
}

struct Feed {
    kind: NoticeKind,
    sender: mpsc::UnboundedSender<ChangeNotice>,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedger {
    /// Create an empty ledger with the lookup gate open.
    #[must_use]
    pub fn new() -> Self {
        let (gate_tx, gate_rx) = watch::channel(true);
        Self {
            inner: std::sync::Arc::new(Inner {
                jobs: Mutex::new(Vec::new()),
                bids: Mutex::new(HashMap::new()),
                feeds: Mutex::new(HashMap::new()),
                next_handle: AtomicU64::new(1),
                remote_calls: AtomicU64::new(0),
                fail_keys: Mutex::new(HashSet::new()),
                fail_count: Mutex::new(false),
                fail_subscribe: Mutex::new(HashSet::new()),
                gate_tx,
                gate_rx,
            }),
        }
    }

    // --- Ledger mutation ---------------------------------------------------

    /// Append a job; the ledger allocates the next dense key.
    ///
    /// The builder receives the allocated key so records stay internally
    /// consistent.
    pub fn post(&self, build: impl FnOnce(JobKey) -> Job) -> JobKey {
        let mut jobs = self.inner.jobs.lock().unwrap();
        let key = JobKey::new(jobs.len() as u64 + 1).unwrap();
        let mut job = build(key);
        job.key = key;
        jobs.push(job);
        key
    }

    /// Overwrite one job's status in place.
    pub fn set_status(&self, key: JobKey, status: JobStatus) {
        self.update_job(key, |job| job.status = status);
    }

    /// Mutate one job in place.
    ///
    /// # Panics
    ///
    /// Panics if the key was never allocated; tests should only touch jobs
    /// they posted.
    pub fn update_job(&self, key: JobKey, mutate: impl FnOnce(&mut Job)) {
        let mut jobs = self.inner.jobs.lock().unwrap();
        let slot = (key.get() - 1) as usize;
        mutate(jobs.get_mut(slot).expect("unknown job key"));
    }

    /// Append a bid to a job's bid list.
    pub fn push_bid(&self, key: JobKey, bid: Bid) {
        self.inner
            .bids
            .lock()
            .unwrap()
            .entry(key)
            .or_default()
            .push(bid);
    }

    // --- Notices -----------------------------------------------------------

    /// Deliver a notice to every live feed of its kind.
    pub fn emit(&self, notice: ChangeNotice) {
        let mut feeds = self.inner.feeds.lock().unwrap();
        feeds.retain(|_, feed| {
            if feed.kind != notice.kind {
                return true;
            }
            feed.sender.send(notice.clone()).is_ok()
        });
    }

    /// Number of feeds currently registered at the source.
    #[must_use]
    pub fn live_feeds(&self) -> usize {
        self.inner.feeds.lock().unwrap().len()
    }

    /// Make future `subscribe` calls for a kind fail.
    pub fn fail_subscribe(&self, kind: NoticeKind) {
        self.inner.fail_subscribe.lock().unwrap().insert(kind);
    }

    // --- Failure injection and gating --------------------------------------

    /// Make job lookups at this key fail with a transport error.
    pub fn fail_lookups_at(&self, key: JobKey) {
        self.inner.fail_keys.lock().unwrap().insert(key);
    }

    /// Stop failing lookups at this key.
    pub fn heal_lookups_at(&self, key: JobKey) {
        self.inner.fail_keys.lock().unwrap().remove(&key);
    }

    /// Make the count accessor fail with a transport error.
    pub fn fail_job_count(&self, fail: bool) {
        *self.inner.fail_count.lock().unwrap() = fail;
    }

    /// Suspend every subsequent job/bid lookup until the gate reopens.
    ///
    /// The count accessor is not gated, so a gated scan suspends on its first
    /// keyed lookup with its loop bound already fixed.
    pub fn hold_lookups(&self) {
        self.inner.gate_tx.send_replace(false);
    }

    /// Reopen the gate, releasing every suspended lookup.
    pub fn release_lookups(&self) {
        self.inner.gate_tx.send_replace(true);
    }

    /// Total remote calls served (count reads, job lookups, bid probes).
    #[must_use]
    pub fn remote_calls(&self) -> u64 {
        self.inner.remote_calls.load(Ordering::Relaxed)
    }

    async fn pass_gate(&self) {
        let mut rx = self.inner.gate_rx.clone();
        loop {
            let open = *rx.borrow_and_update();
            if open {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl RecordSource for MemoryLedger {
    fn job_count(&self) -> impl Future<Output = Result<u64, LookupError>> + Send {
        async move {
            self.inner.remote_calls.fetch_add(1, Ordering::Relaxed);
            if *self.inner.fail_count.lock().unwrap() {
                return Err(LookupError::Transport("count unavailable".into()));
            }
            Ok(self.inner.jobs.lock().unwrap().len() as u64)
        }
    }

    fn job(&self, key: JobKey) -> impl Future<Output = Result<Job, LookupError>> + Send {
        async move {
            self.inner.remote_calls.fetch_add(1, Ordering::Relaxed);
            self.pass_gate().await;
            if self.inner.fail_keys.lock().unwrap().contains(&key) {
                return Err(LookupError::Transport(format!("lookup of {key} failed")));
            }
            let jobs = self.inner.jobs.lock().unwrap();
            jobs.get((key.get() - 1) as usize)
                .cloned()
                .ok_or_else(|| LookupError::Rejected(format!("no job at {key}")))
        }
    }

    fn bid(&self, key: JobKey, slot: u64) -> impl Future<Output = Result<Bid, LookupError>> + Send {
        async move {
            self.inner.remote_calls.fetch_add(1, Ordering::Relaxed);
            self.pass_gate().await;
            let bids = self.inner.bids.lock().unwrap();
            let bid = bids
                .get(&key)
                .and_then(|list| list.get(slot as usize))
                .cloned()
                .unwrap_or_else(Bid::absent);
            Ok(bid)
        }
    }

    fn subscribe(
        &self,
        kind: NoticeKind,
    ) -> impl Future<Output = Result<NoticeFeed, SubscribeError>> + Send {
        async move {
            if self.inner.fail_subscribe.lock().unwrap().contains(&kind) {
                return Err(SubscribeError::new(kind, "feed refused"));
            }
            let (sender, notices) = mpsc::unbounded_channel();
            let handle = FeedHandle(self.inner.next_handle.fetch_add(1, Ordering::Relaxed));
            self.inner
                .feeds
                .lock()
                .unwrap()
                .insert(handle, Feed { kind, sender });
            Ok(NoticeFeed { handle, notices })
        }
    }

    fn unsubscribe(&self, handle: FeedHandle) -> impl Future<Output = ()> + Send {
        async move {
            self.inner.feeds.lock().unwrap().remove(&handle);
        }
    }
}
