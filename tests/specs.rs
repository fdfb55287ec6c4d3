// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace-level specs exercising the cores together against the
//! in-memory fakes: the archiver's append contract across restarts, and
//! the host-to-processor status flow with state-machine validation.

use std::sync::Arc;
use std::time::Duration;

use manman_archiver::{gunzip, ArchiverConfig, LogArchiver, LogLine};
use manman_bus::{FakePublisher, MessageHandler, Publisher};
use manman_core::{
    FakeClock, HostStatus, LogSource, ServerId, SessionId, SessionStatus, SgcId,
};
use manman_processor::Projector;
use manman_storage::{
    MemoryLogReferenceStore, MemoryObjectStore, MemoryProjectionStore, ProjectionStore,
};

fn line(ts: &str, message: &str) -> LogLine {
    LogLine {
        sgc_id: SgcId::new(55),
        session_id: SessionId::new(100),
        timestamp: ts.parse().unwrap(),
        source: LogSource::Stdout,
        message: message.to_string(),
    }
}

fn fast_archiver_config() -> ArchiverConfig {
    ArchiverConfig {
        closure_delay: Duration::from_secs(120),
        check_interval: Duration::from_millis(10),
        upload_workers: 2,
        protection_window: Duration::from_secs(15),
        queue_capacity: 16,
    }
}

/// Two ingest batches for the same minute, separated by a host restart:
/// one object, all five lines in order, exactly one append separator,
/// and a LogReference row with appended_at set.
#[tokio::test]
async fn log_append_survives_host_restart() {
    let store = Arc::new(MemoryObjectStore::new());
    let refs = Arc::new(MemoryLogReferenceStore::new());

    let clock = FakeClock::new();
    clock.set_utc("2026-02-10T15:30:40Z");
    let archiver = LogArchiver::spawn(
        Arc::clone(&store) as Arc<dyn manman_storage::ObjectStore>,
        Arc::clone(&refs) as Arc<dyn manman_storage::LogReferenceStore>,
        clock.clone(),
        fast_archiver_config(),
    );
    archiver.ingest(line("2026-02-10T15:30:05Z", "alpha"));
    archiver.ingest(line("2026-02-10T15:30:15Z", "bravo"));
    archiver.ingest(line("2026-02-10T15:30:30Z", "charlie"));
    archiver.close().await;

    // Host restarts; late lines for the already-uploaded minute arrive.
    let clock = FakeClock::new();
    clock.set_utc("2026-02-10T15:35:00Z");
    let archiver = LogArchiver::spawn(
        Arc::clone(&store) as Arc<dyn manman_storage::ObjectStore>,
        Arc::clone(&refs) as Arc<dyn manman_storage::LogReferenceStore>,
        clock.clone(),
        fast_archiver_config(),
    );
    archiver.ingest(line("2026-02-10T15:30:45Z", "delta"));
    archiver.ingest(line("2026-02-10T15:30:55Z", "echo"));
    archiver.close().await;

    let keys = store.keys();
    assert_eq!(
        keys,
        vec!["logs/sgc-55/session-100/2026/02/10/15/30.log.gz".to_string()]
    );
    let object = store.get(&keys[0]).unwrap();
    let text = String::from_utf8(gunzip(&object.bytes).unwrap()).unwrap();

    let positions: Vec<usize> = ["alpha", "bravo", "charlie", "delta", "echo"]
        .iter()
        .map(|needle| text.find(needle).unwrap())
        .collect();
    assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(text.matches("--- APPENDED AT").count(), 1);

    let row = refs
        .row(SgcId::new(55), "2026-02-10T15:30:00Z".parse().unwrap())
        .unwrap();
    assert_eq!(row.line_count, 5);
    assert!(row.appended_at.is_some());
}

/// The full happy-path status flow projected end to end: host comes
/// online, session walks pending -> starting -> running -> stopping ->
/// stopped, external subscribers see exactly the events they are
/// promised.
#[tokio::test]
async fn session_lifecycle_projects_end_to_end() {
    let store = Arc::new(MemoryProjectionStore::new());
    let external = Arc::new(FakePublisher::new());
    let clock = FakeClock::new();
    clock.set_utc("2026-02-10T15:00:00Z");
    store.seed_server(
        ServerId::new(7),
        HostStatus::Offline,
        "2026-02-10T14:00:00Z".parse().unwrap(),
    );

    let projector = Projector::new(
        Arc::clone(&store) as Arc<dyn ProjectionStore>,
        Arc::clone(&external) as Arc<dyn Publisher>,
        clock.clone(),
    );

    projector
        .handle("status.host.7", br#"{"server_id":7,"status":"online"}"#)
        .await;

    for status in ["pending", "starting", "running"] {
        projector
            .handle(
                "status.session.100",
                format!(r#"{{"session_id":100,"sgc_id":55,"status":"{status}"}}"#).as_bytes(),
            )
            .await;
    }
    clock.set_utc("2026-02-10T15:00:30Z");
    projector
        .handle(
            "status.session.100",
            br#"{"session_id":100,"sgc_id":55,"status":"stopping"}"#,
        )
        .await;
    projector
        .handle(
            "status.session.100",
            br#"{"session_id":100,"sgc_id":55,"status":"stopped","exit_code":0}"#,
        )
        .await;

    let session = store.session(SessionId::new(100)).unwrap();
    assert_eq!(session.status, SessionStatus::Stopped);
    assert_eq!(session.exit_code, Some(0));
    assert_eq!(
        session.started_at,
        Some("2026-02-10T15:00:00Z".parse().unwrap())
    );
    assert_eq!(
        session.ended_at,
        Some("2026-02-10T15:00:30Z".parse().unwrap())
    );

    // External fan-out: online, running, stopped; never pending/starting.
    assert_eq!(external.with_key("manman.host.online").len(), 1);
    assert_eq!(external.with_key("manman.session.running").len(), 1);
    assert_eq!(external.with_key("manman.session.stopped").len(), 1);
    assert!(external.with_key("manman.session.pending").is_empty());
    assert!(external.with_key("manman.session.starting").is_empty());
}

/// Every consecutive pair of stored statuses satisfies the transition
/// table, no matter what garbage sequence arrives.
#[tokio::test]
async fn stored_statuses_always_follow_the_state_machine() {
    let store = Arc::new(MemoryProjectionStore::new());
    let external = Arc::new(FakePublisher::new());
    let clock = FakeClock::new();
    clock.set_utc("2026-02-10T15:00:00Z");
    let projector = Projector::new(
        Arc::clone(&store) as Arc<dyn ProjectionStore>,
        Arc::clone(&external) as Arc<dyn Publisher>,
        clock.clone(),
    );

    // An adversarial arrival order, including replays and regressions.
    let arrivals = [
        "running", "pending", "running", "starting", "crashed", "running", "stopped", "crashed",
    ];
    let mut stored = Vec::new();
    for status in arrivals {
        projector
            .handle(
                "status.session.9",
                format!(r#"{{"session_id":9,"sgc_id":1,"status":"{status}"}}"#).as_bytes(),
            )
            .await;
        stored.push(store.session(SessionId::new(9)).unwrap().status);
    }

    for pair in stored.windows(2) {
        assert!(
            pair[0] == pair[1] || pair[0].can_transition(pair[1]),
            "stored sequence violated the table: {:?} -> {:?}",
            pair[0],
            pair[1]
        );
    }
    // And the terminal result sticks.
    assert_eq!(
        store.session(SessionId::new(9)).unwrap().status,
        SessionStatus::Crashed
    );
}
