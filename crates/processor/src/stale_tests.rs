// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use manman_bus::FakePublisher;
use manman_core::{FakeClock, SessionId, SgcId};
use manman_storage::MemoryProjectionStore;

struct Fixture {
    store: Arc<MemoryProjectionStore>,
    projector: Projector<FakeClock>,
    internal: Arc<FakePublisher>,
    external: Arc<FakePublisher>,
    clock: FakeClock,
}

fn fixture() -> Fixture {
    let store = Arc::new(MemoryProjectionStore::new());
    let internal = Arc::new(FakePublisher::new());
    let external = Arc::new(FakePublisher::new());
    let clock = FakeClock::new();
    clock.set_utc("2026-02-10T15:00:00Z");
    let projector = Projector::new(
        Arc::clone(&store) as Arc<dyn ProjectionStore>,
        Arc::clone(&external) as Arc<dyn Publisher>,
        clock.clone(),
    );
    Fixture {
        store,
        projector,
        internal,
        external,
        clock,
    }
}

async fn tick(f: &Fixture) {
    stale_tick(
        &(Arc::clone(&f.store) as Arc<dyn ProjectionStore>),
        &f.projector,
        &(Arc::clone(&f.internal) as Arc<dyn Publisher>),
        &(Arc::clone(&f.external) as Arc<dyn Publisher>),
        &f.clock,
        Duration::from_secs(10),
    )
    .await;
}

#[tokio::test]
async fn silent_host_goes_offline_and_sessions_go_lost() {
    let f = fixture();
    f.store.seed_server(
        ServerId::new(7),
        HostStatus::Online,
        "2026-02-10T14:59:30Z".parse().unwrap(),
    );
    f.store.seed_sgc(SgcId::new(55), ServerId::new(7));
    f.projector
        .project_session_status(SessionStatusUpdate {
            session_id: SessionId::new(102),
            sgc_id: SgcId::new(55),
            status: SessionStatus::Running,
            exit_code: None,
        })
        .await
        .unwrap();
    f.external.clear();

    tick(&f).await;

    let server = f.store.server(ServerId::new(7)).unwrap();
    assert_eq!(server.status, HostStatus::Offline);
    // last_seen untouched by the stale marking.
    assert_eq!(
        server.last_seen,
        Some("2026-02-10T14:59:30Z".parse().unwrap())
    );

    assert_eq!(
        f.store.session(SessionId::new(102)).unwrap().status,
        SessionStatus::Lost
    );

    let stale = f.external.with_key("manman.host.stale");
    assert_eq!(stale.len(), 1);
    assert_eq!(stale[0].json()["status"], "stale");
    assert_eq!(f.internal.with_key("status.host.7").len(), 1);
}

#[tokio::test]
async fn fresh_host_is_left_alone() {
    let f = fixture();
    f.store.seed_server(
        ServerId::new(7),
        HostStatus::Online,
        "2026-02-10T14:59:55Z".parse().unwrap(),
    );

    tick(&f).await;

    assert_eq!(
        f.store.server(ServerId::new(7)).unwrap().status,
        HostStatus::Online
    );
    assert!(f.external.messages().is_empty());
}

#[tokio::test]
async fn gap_exactly_at_threshold_is_not_stale() {
    let f = fixture();
    f.store.seed_server(
        ServerId::new(7),
        HostStatus::Online,
        "2026-02-10T14:59:50Z".parse().unwrap(),
    );

    // Exactly 10s: not stale yet.
    tick(&f).await;
    assert_eq!(
        f.store.server(ServerId::new(7)).unwrap().status,
        HostStatus::Online
    );

    // One second later: stale.
    f.clock.set_utc("2026-02-10T15:00:01Z");
    tick(&f).await;
    assert_eq!(
        f.store.server(ServerId::new(7)).unwrap().status,
        HostStatus::Offline
    );
}

#[tokio::test]
async fn lost_session_accepts_late_stop_from_recovered_host() {
    let f = fixture();
    f.store.seed_server(
        ServerId::new(7),
        HostStatus::Online,
        "2026-02-10T14:59:00Z".parse().unwrap(),
    );
    f.store.seed_sgc(SgcId::new(55), ServerId::new(7));
    f.projector
        .project_session_status(SessionStatusUpdate {
            session_id: SessionId::new(102),
            sgc_id: SgcId::new(55),
            status: SessionStatus::Running,
            exit_code: None,
        })
        .await
        .unwrap();

    tick(&f).await;
    assert_eq!(
        f.store.session(SessionId::new(102)).unwrap().status,
        SessionStatus::Lost
    );

    // The host comes back and reports the session stopped.
    let accepted = f
        .projector
        .project_session_status(SessionStatusUpdate {
            session_id: SessionId::new(102),
            sgc_id: SgcId::new(55),
            status: SessionStatus::Stopped,
            exit_code: Some(0),
        })
        .await
        .unwrap();
    assert!(accepted);
    assert_eq!(
        f.store.session(SessionId::new(102)).unwrap().status,
        SessionStatus::Stopped
    );
}
