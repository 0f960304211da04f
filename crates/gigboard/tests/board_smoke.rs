//! Facade smoke test: the whole stack wired through the prelude.

use std::sync::Arc;
use std::time::Duration;

use gigboard::prelude::*;
use gigboard_harness::MemoryLedger;

#[tokio::test(start_paused = true)]
async fn a_client_dashboard_stays_live_end_to_end() {
    let ledger = MemoryLedger::new();
    let me = AccountId::new("0xc1");
    ledger.post(|k| Job::open(k, AccountId::new("0xc1"), "first post"));

    let mut manager = SessionManager::new(Arc::new(ledger.clone()));
    let report = manager.on_session_start(me, Role::Client).await;
    assert_eq!(report.views, vec![ViewName::ClientJobs]);

    let coordinator = Arc::clone(manager.coordinator().unwrap());
    while coordinator.is_refreshing(ViewName::ClientJobs) {
        tokio::task::yield_now().await;
    }
    assert_eq!(coordinator.page(ViewName::ClientJobs).unwrap().total_items, 1);

    // A live notice lands and the dashboard follows the ledger.
    ledger.post(|k| Job::open(k, AccountId::new("0xc1"), "second post"));
    ledger.emit(ChangeNotice::new(NoticeKind::JobPosted));
    tokio::time::sleep(Duration::from_millis(600)).await;
    while coordinator.is_refreshing(ViewName::ClientJobs) {
        tokio::task::yield_now().await;
    }

    let page: Page = coordinator.page(ViewName::ClientJobs).unwrap();
    assert_eq!(page.total_items, 2);

    manager.on_session_end().await;
    assert_eq!(ledger.live_feeds(), 0);
}
