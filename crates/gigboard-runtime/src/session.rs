#![forbid(unsafe_code)]

//! Session lifecycle: subscriptions in, refreshes out.
//!
//! A session binds the coordinator and a set of notice feeds to one viewer.
//! Starting a session registers the role's views, opens one feed per notice
//! kind, and kicks an immediate first population of every view. Each feed
//! gets a forwarder task that routes notices through the static table into
//! refresh requests — nothing else; payloads never touch view state.
//!
//! Ending a session tears everything down in one pass: the coordinator stops
//! accepting work and discards pending coalescing timers, forwarders are
//! aborted, and every feed handle is released at the source. `end` is safe
//! to call when no session is active, and `start` while active is a no-op —
//! account switches go through end-then-start.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use gigboard_core::record::{AccountId, NoticeKind, Role};
use gigboard_core::source::{FeedHandle, RecordSource, SubscribeError};
use gigboard_core::view::ViewName;

use crate::coalescer::DEFAULT_COALESCE_WINDOW;
use crate::coordinator::RefreshCoordinator;
use crate::registry::ViewRegistry;
use crate::routes::invalidated_views;

/// Outcome of a session start, surfaced once to the caller.
#[derive(Debug)]
pub struct StartReport {
    /// Whether this call was a no-op because a session was already active.
    pub already_started: bool,
    /// Views registered for the session's role.
    pub views: Vec<ViewName>,
    /// Feeds that could not be opened. Other feeds still deliver.
    pub failures: Vec<SubscribeError>,
}

struct ActiveSession<S>
where
    S: RecordSource + 'static,
{
    coordinator: Arc<RefreshCoordinator<S>>,
    feeds: Vec<FeedHandle>,
    forwarders: Vec<JoinHandle<()>>,
}

/// Owns the coordinator and notice feeds for at most one active session.
pub struct SessionManager<S>
where
    S: RecordSource + 'static,
{
    source: Arc<S>,
    window: Duration,
    active: Option<ActiveSession<S>>,
}

impl<S> SessionManager<S>
where
    S: RecordSource + 'static,
{
    /// Create a manager with the default coalescing window.
    #[must_use]
    pub fn new(source: Arc<S>) -> Self {
        Self::with_window(source, DEFAULT_COALESCE_WINDOW)
    }

    /// Create a manager with an explicit coalescing window.
    #[must_use]
    pub fn with_window(source: Arc<S>, window: Duration) -> Self {
        Self {
            source,
            window,
            active: None,
        }
    }

    /// Whether a session is currently active.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.active.is_some()
    }

    /// The active session's coordinator, for the presentation layer.
    #[must_use]
    pub fn coordinator(&self) -> Option<&Arc<RefreshCoordinator<S>>> {
        self.active.as_ref().map(|session| &session.coordinator)
    }

    /// Start a session: register views, open feeds, populate every view.
    ///
    /// Re-entry while a session is active is a no-op; callers switching
    /// accounts end the old session first. Feed failures are collected in
    /// the report and do not prevent the remaining feeds from opening.
    pub async fn on_session_start(&mut self, identity: AccountId, role: Role) -> StartReport {
        self.start_with_registry(ViewRegistry::new(identity, role))
            .await
    }

    /// Start a session from a pre-configured registry (category filter,
    /// non-default page size). Same lifecycle rules as
    /// [`on_session_start`](Self::on_session_start).
    pub async fn start_with_registry(&mut self, registry: ViewRegistry) -> StartReport {
        if self.active.is_some() {
            tracing::debug!("session start while already started, ignoring");
            return StartReport {
                already_started: true,
                views: Vec::new(),
                failures: Vec::new(),
            };
        }
        let role = registry.role();
        tracing::info!(identity = %registry.identity(), role = %role, "session starting");

        let views = registry.build();
        let view_names: Vec<ViewName> = views.iter().map(|(name, _)| *name).collect();
        let coordinator = Arc::new(RefreshCoordinator::with_window(
            Arc::clone(&self.source),
            views,
            self.window,
        ));

        let mut feeds = Vec::new();
        let mut forwarders = Vec::new();
        let mut failures = Vec::new();
        for kind in NoticeKind::ALL {
            match self.source.subscribe(kind).await {
                Ok(mut feed) => {
                    feeds.push(feed.handle);
                    let coordinator = Arc::clone(&coordinator);
                    forwarders.push(tokio::spawn(async move {
                        while let Some(notice) = feed.notices.recv().await {
                            for view in invalidated_views(notice.kind, role) {
                                coordinator.request_refresh(*view);
                            }
                        }
                    }));
                }
                Err(err) => {
                    tracing::warn!(kind = %kind, error = %err, "notice feed failed to open");
                    failures.push(err);
                }
            }
        }

        // First population bypasses the coalescing window: a fresh dashboard
        // should not sit empty for one window after login.
        for view in &view_names {
            coordinator.refresh_now(*view);
        }

        self.active = Some(ActiveSession {
            coordinator,
            feeds,
            forwarders,
        });
        StartReport {
            already_started: false,
            views: view_names,
            failures,
        }
    }

    /// End the active session, if any.
    ///
    /// Pending coalescing timers are discarded without running; forwarders
    /// stop; every feed opened by the last start is released at the source.
    pub async fn on_session_end(&mut self) {
        let Some(session) = self.active.take() else {
            return;
        };
        tracing::info!("session ending");

        session.coordinator.shutdown();
        for forwarder in session.forwarders {
            forwarder.abort();
        }
        for handle in session.feeds {
            self.source.unsubscribe(handle).await;
        }
    }
}
