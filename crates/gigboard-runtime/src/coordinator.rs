#![forbid(unsafe_code)]

//! Per-view refresh coordination.
//!
//! One coordinator owns the state of every view in a session. Refresh
//! requests are fire-and-forget: they arm the view's coalescing window, and
//! when the window settles the scan engine produces a fresh snapshot that
//! replaces the view's state wholesale. Two rules bound the work:
//!
//! 1. **Trailing-edge coalescing**: a burst of requests for one view becomes
//!    one scan, `window` after the latest request.
//! 2. **One scan in flight per view**: a fire that lands while that view's
//!    scan is still running is dropped — not queued. Under a sustained
//!    trigger stream a view converges to roughly one refresh per window
//!    rather than one per trigger. Tunable policy: queueing one trailing
//!    refresh here instead would tighten the staleness bound.
//!
//! Exclusion is per view: distinct views scan concurrently and
//! independently. Scan failures never wedge a view — the in-flight flag is
//! released on every completion path and the previous snapshot stays
//! readable.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use gigboard_core::record::Job;
use gigboard_core::scan::{ScanError, scan_jobs};
use gigboard_core::source::RecordSource;
use gigboard_core::view::{Page, ViewName, ViewSpec, ViewState};

use crate::coalescer::{Coalescer, DEFAULT_COALESCE_WINDOW};

/// Releases a view's in-flight flag on every exit path of a scan.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct ViewSlot {
    spec: ViewSpec,
    in_flight: AtomicBool,
    state: Mutex<ViewState>,
    last_error: Mutex<Option<ScanError>>,
}

struct Shared<S> {
    source: Arc<S>,
    views: HashMap<ViewName, ViewSlot>,
    closed: AtomicBool,
}

/// Coordinates scans, coalescing, and pagination for a session's views.
///
/// Constructed with a fixed view set at session start and torn down with
/// [`shutdown`](RefreshCoordinator::shutdown) at session end. All methods
/// take `&self`; the coordinator is shared behind an [`Arc`] between the
/// session manager, notification forwarders, and the presentation layer.
pub struct RefreshCoordinator<S>
where
    S: RecordSource + 'static,
{
    shared: Arc<Shared<S>>,
    coalescer: Coalescer<ViewName>,
}

impl<S> RefreshCoordinator<S>
where
    S: RecordSource + 'static,
{
    /// Create a coordinator with the default coalescing window.
    #[must_use]
    pub fn new(source: Arc<S>, views: Vec<(ViewName, ViewSpec)>) -> Self {
        Self::with_window(source, views, DEFAULT_COALESCE_WINDOW)
    }

    /// Create a coordinator with an explicit coalescing window.
    #[must_use]
    pub fn with_window(
        source: Arc<S>,
        views: Vec<(ViewName, ViewSpec)>,
        window: Duration,
    ) -> Self {
        let views = views
            .into_iter()
            .map(|(name, spec)| {
                let state = ViewState::new(spec.page_size());
                (
                    name,
                    ViewSlot {
                        spec,
                        in_flight: AtomicBool::new(false),
                        state: Mutex::new(state),
                        last_error: Mutex::new(None),
                    },
                )
            })
            .collect();

        let shared = Arc::new(Shared {
            source,
            views,
            closed: AtomicBool::new(false),
        });

        let fire_target = Arc::clone(&shared);
        let coalescer = Coalescer::new(window, move |view| {
            Self::launch(&fire_target, view);
        });

        Self { shared, coalescer }
    }

    /// Names of the registered views.
    #[must_use]
    pub fn view_names(&self) -> Vec<ViewName> {
        self.shared.views.keys().copied().collect()
    }

    /// Whether a view is registered with this coordinator.
    #[must_use]
    pub fn has_view(&self, view: ViewName) -> bool {
        self.shared.views.contains_key(&view)
    }

    /// Request a resynchronization of one view. Fire-and-forget.
    ///
    /// The request is coalesced: the scan starts one window after the latest
    /// request for the view, and is dropped entirely if that view's previous
    /// scan is still in flight at that point.
    pub fn request_refresh(&self, view: ViewName) {
        if self.shared.closed.load(Ordering::Acquire) {
            return;
        }
        if !self.shared.views.contains_key(&view) {
            tracing::debug!(view = %view, "refresh requested for unregistered view");
            return;
        }
        self.coalescer.trigger(view);
    }

    /// Start a scan for one view immediately, bypassing the coalescing
    /// window but still honoring the in-flight gate.
    ///
    /// Used for the initial population at session start.
    pub fn refresh_now(&self, view: ViewName) {
        Self::launch(&self.shared, view);
    }

    /// Whether a scan for this view is currently in flight.
    #[must_use]
    pub fn is_refreshing(&self, view: ViewName) -> bool {
        self.shared
            .views
            .get(&view)
            .is_some_and(|slot| slot.in_flight.load(Ordering::Acquire))
    }

    /// The error that failed the view's most recent scan, if any.
    ///
    /// Cleared by the next successful scan.
    #[must_use]
    pub fn last_refresh_error(&self, view: ViewName) -> Option<ScanError> {
        self.shared
            .views
            .get(&view)
            .and_then(|slot| slot.last_error.lock().unwrap().clone())
    }

    /// Read the current page of a view. `None` for unregistered views.
    #[must_use]
    pub fn page(&self, view: ViewName) -> Option<Page> {
        self.shared
            .views
            .get(&view)
            .map(|slot| slot.state.lock().unwrap().page())
    }

    /// All items of the view's last snapshot, in view order.
    ///
    /// `None` for unregistered views.
    #[must_use]
    pub fn snapshot(&self, view: ViewName) -> Option<Vec<Job>> {
        self.shared
            .views
            .get(&view)
            .map(|slot| slot.state.lock().unwrap().items().to_vec())
    }

    /// Move a view's pagination cursor, clamped into range.
    ///
    /// Purely a cursor move over the last snapshot; never issues a remote
    /// lookup and never triggers a rescan.
    pub fn go_to_page(&self, view: ViewName, page: usize) {
        match self.shared.views.get(&view) {
            Some(slot) => slot.state.lock().unwrap().go_to_page(page),
            None => tracing::debug!(view = %view, "page move on unregistered view"),
        }
    }

    /// Tear the coordinator down: discard pending coalescing timers without
    /// running them and refuse any further refresh work.
    ///
    /// Scans already in flight run to completion; their snapshots land in
    /// state that nothing will read again. Idempotent.
    pub fn shutdown(&self) {
        self.shared.closed.store(true, Ordering::Release);
        self.coalescer.cancel_all();
    }

    /// Claim the view's in-flight slot and spawn its scan task.
    fn launch(shared: &Arc<Shared<S>>, view: ViewName) {
        if shared.closed.load(Ordering::Acquire) {
            return;
        }
        let Some(slot) = shared.views.get(&view) else {
            return;
        };
        if slot.in_flight.swap(true, Ordering::AcqRel) {
            tracing::debug!(view = %view, "refresh dropped, scan already in flight");
            return;
        }

        let shared = Arc::clone(shared);
        tokio::spawn(async move {
            shared.run_scan(view).await;
        });
    }
}

impl<S> Shared<S>
where
    S: RecordSource + 'static,
{
    /// Run one scan for a view and publish its outcome.
    ///
    /// The caller has already claimed the in-flight slot; the guard releases
    /// it on every exit path.
    async fn run_scan(&self, view: ViewName) {
        let slot = &self.views[&view];
        let _guard = InFlightGuard(&slot.in_flight);

        match scan_jobs(self.source.as_ref(), &slot.spec).await {
            Ok(snapshot) => {
                let total = snapshot.len();
                let mut state = slot.state.lock().unwrap();
                state.replace(snapshot);
                drop(state);
                *slot.last_error.lock().unwrap() = None;
                tracing::debug!(view = %view, total, "view refreshed");
            }
            Err(err) => {
                tracing::warn!(view = %view, error = %err, "refresh failed");
                *slot.last_error.lock().unwrap() = Some(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use gigboard_core::record::{AccountId, Job, JobStatus};
    use gigboard_harness::MemoryLedger;

    fn client() -> AccountId {
        AccountId::new("0xc1")
    }

    fn open_jobs_view() -> Vec<(ViewName, ViewSpec)> {
        vec![(
            ViewName::Marketplace,
            ViewSpec::with_default_page_size().filter(|job| job.status == JobStatus::Open),
        )]
    }

    fn coordinator(ledger: &MemoryLedger) -> RefreshCoordinator<MemoryLedger> {
        RefreshCoordinator::new(Arc::new(ledger.clone()), open_jobs_view())
    }

    /// Yield until the view's scan (if any) has completed.
    async fn settle(coordinator: &RefreshCoordinator<MemoryLedger>, view: ViewName) {
        while coordinator.is_refreshing(view) {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn burst_coalesces_into_one_trailing_scan() {
        let ledger = MemoryLedger::new();
        for i in 0..3 {
            ledger.post(|k| Job::open(k, client(), format!("job {i}")));
        }
        let coordinator = coordinator(&ledger);

        // Five requests inside 100ms; the window restarts on each one.
        for _ in 0..5 {
            coordinator.request_refresh(ViewName::Marketplace);
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        let after_last = ledger.remote_calls();

        // 499ms after the last request: still inside the window, no scan.
        tokio::time::sleep(Duration::from_millis(474)).await;
        assert_eq!(ledger.remote_calls(), after_last);
        assert!(!coordinator.is_refreshing(ViewName::Marketplace));

        // 501ms after the last request: exactly one scan ran.
        tokio::time::sleep(Duration::from_millis(2)).await;
        settle(&coordinator, ViewName::Marketplace).await;
        assert_eq!(ledger.remote_calls(), after_last + 4); // 1 count + 3 lookups
        assert_eq!(
            coordinator.page(ViewName::Marketplace).unwrap().total_items,
            3
        );
    }

    #[tokio::test(start_paused = true)]
    async fn fire_during_in_flight_scan_is_dropped() {
        let ledger = MemoryLedger::new();
        ledger.post(|k| Job::open(k, client(), "a"));
        ledger.post(|k| Job::open(k, client(), "b"));
        let coordinator = coordinator(&ledger);

        ledger.hold_lookups();
        coordinator.refresh_now(ViewName::Marketplace);
        tokio::task::yield_now().await;
        assert!(coordinator.is_refreshing(ViewName::Marketplace));

        // The window elapses while the scan is still gated: the fire is
        // dropped rather than queued.
        coordinator.request_refresh(ViewName::Marketplace);
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(coordinator.is_refreshing(ViewName::Marketplace));

        ledger.release_lookups();
        settle(&coordinator, ViewName::Marketplace).await;

        // One scan total: one count read plus one lookup per job.
        assert_eq!(ledger.remote_calls(), 3);
        assert_eq!(
            coordinator.page(ViewName::Marketplace).unwrap().total_items,
            2
        );
    }

    #[tokio::test(start_paused = true)]
    async fn distinct_views_scan_concurrently() {
        let ledger = MemoryLedger::new();
        let key = ledger.post(|k| Job::open(k, client(), "a"));
        ledger.set_status(key, JobStatus::Disputed);
        ledger.post(|k| Job::open(k, client(), "b"));

        let views = vec![
            (
                ViewName::Marketplace,
                ViewSpec::with_default_page_size().filter(|job| job.status == JobStatus::Open),
            ),
            (
                ViewName::DisputedJobs,
                ViewSpec::with_default_page_size().filter(|job| job.status == JobStatus::Disputed),
            ),
        ];
        let coordinator = RefreshCoordinator::new(Arc::new(ledger.clone()), views);

        ledger.hold_lookups();
        coordinator.refresh_now(ViewName::Marketplace);
        coordinator.refresh_now(ViewName::DisputedJobs);
        tokio::task::yield_now().await;
        assert!(coordinator.is_refreshing(ViewName::Marketplace));
        assert!(coordinator.is_refreshing(ViewName::DisputedJobs));

        ledger.release_lookups();
        settle(&coordinator, ViewName::Marketplace).await;
        settle(&coordinator, ViewName::DisputedJobs).await;

        assert_eq!(
            coordinator.page(ViewName::Marketplace).unwrap().total_items,
            1
        );
        assert_eq!(
            coordinator.page(ViewName::DisputedJobs).unwrap().total_items,
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failed_scan_keeps_previous_snapshot() {
        let ledger = MemoryLedger::new();
        ledger.post(|k| Job::open(k, client(), "a"));
        let bad = ledger.post(|k| Job::open(k, client(), "b"));
        let coordinator = coordinator(&ledger);

        coordinator.refresh_now(ViewName::Marketplace);
        settle(&coordinator, ViewName::Marketplace).await;
        let before = coordinator.snapshot(ViewName::Marketplace).unwrap();
        assert_eq!(before.len(), 2);

        ledger.fail_lookups_at(bad);
        coordinator.refresh_now(ViewName::Marketplace);
        settle(&coordinator, ViewName::Marketplace).await;

        assert_eq!(coordinator.snapshot(ViewName::Marketplace).unwrap(), before);
        assert!(coordinator.last_refresh_error(ViewName::Marketplace).is_some());
        assert!(!coordinator.is_refreshing(ViewName::Marketplace));

        // The view recovers on the next refresh.
        ledger.heal_lookups_at(bad);
        coordinator.refresh_now(ViewName::Marketplace);
        settle(&coordinator, ViewName::Marketplace).await;
        assert!(coordinator.last_refresh_error(ViewName::Marketplace).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn shrinking_rescan_clamps_the_cursor() {
        let ledger = MemoryLedger::new();
        let mut keys = Vec::new();
        for i in 0..17 {
            keys.push(ledger.post(|k| Job::open(k, client(), format!("job {i}"))));
        }
        let coordinator = coordinator(&ledger);

        coordinator.refresh_now(ViewName::Marketplace);
        settle(&coordinator, ViewName::Marketplace).await;
        coordinator.go_to_page(ViewName::Marketplace, 3);
        assert_eq!(coordinator.page(ViewName::Marketplace).unwrap().page, 3);

        // Nine jobs stay open: two pages. Page 3 is now out of range.
        for key in &keys[..8] {
            ledger.set_status(*key, JobStatus::InProgress);
        }
        coordinator.refresh_now(ViewName::Marketplace);
        settle(&coordinator, ViewName::Marketplace).await;

        let page = coordinator.page(ViewName::Marketplace).unwrap();
        assert_eq!(page.total_items, 9);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.page, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn page_moves_never_touch_the_ledger() {
        let ledger = MemoryLedger::new();
        for i in 0..17 {
            ledger.post(|k| Job::open(k, client(), format!("job {i}")));
        }
        let coordinator = coordinator(&ledger);
        coordinator.refresh_now(ViewName::Marketplace);
        settle(&coordinator, ViewName::Marketplace).await;

        let calls = ledger.remote_calls();
        coordinator.go_to_page(ViewName::Marketplace, 2);
        let page = coordinator.page(ViewName::Marketplace).unwrap();
        coordinator.go_to_page(ViewName::Marketplace, 3);
        let last = coordinator.page(ViewName::Marketplace).unwrap();

        assert_eq!(ledger.remote_calls(), calls);
        assert_eq!(page.items[0].key.get(), 9);
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.items[0].key.get(), 17);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_view_is_one_empty_page() {
        let ledger = MemoryLedger::new();
        let coordinator = coordinator(&ledger);
        coordinator.refresh_now(ViewName::Marketplace);
        settle(&coordinator, ViewName::Marketplace).await;

        let page = coordinator.page(ViewName::Marketplace).unwrap();
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.page, 1);
        assert!(page.items.is_empty());
        assert!(coordinator.last_refresh_error(ViewName::Marketplace).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn unregistered_view_refreshes_nothing() {
        let ledger = MemoryLedger::new();
        ledger.post(|k| Job::open(k, client(), "a"));
        let coordinator = coordinator(&ledger);

        coordinator.request_refresh(ViewName::DisputedJobs);
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(ledger.remote_calls(), 0);
        assert!(coordinator.page(ViewName::DisputedJobs).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_discards_pending_window() {
        let ledger = MemoryLedger::new();
        ledger.post(|k| Job::open(k, client(), "a"));
        let coordinator = coordinator(&ledger);

        coordinator.request_refresh(ViewName::Marketplace);
        coordinator.shutdown();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(ledger.remote_calls(), 0);

        // Refreshes after shutdown are refused outright.
        coordinator.request_refresh(ViewName::Marketplace);
        coordinator.refresh_now(ViewName::Marketplace);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(ledger.remote_calls(), 0);
    }
}
