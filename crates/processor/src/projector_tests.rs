// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use manman_bus::FakePublisher;
use manman_core::{FakeClock, ServerId, SessionId, SessionStatus};
use manman_storage::MemoryProjectionStore;

struct Fixture {
    store: Arc<MemoryProjectionStore>,
    external: Arc<FakePublisher>,
    clock: FakeClock,
    projector: Projector<FakeClock>,
}

fn fixture() -> Fixture {
    let store = Arc::new(MemoryProjectionStore::new());
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
        external,
        clock,
        projector,
    }
}

fn session_payload(session_id: i64, status: &str) -> Vec<u8> {
    format!(r#"{{"session_id":{session_id},"sgc_id":55,"status":"{status}"}}"#).into_bytes()
}

#[yare::parameterized(
    host         = { "status.host.7", Some(StatusFamily::Host) },
    health       = { "health.host.7", Some(StatusFamily::Health) },
    session      = { "status.session.100", Some(StatusFamily::Session) },
    installation = { "status.workshop.installation.3", Some(StatusFamily::Installation) },
    command      = { "command.host.7.session.start", None },
    logs         = { "logs.session.100", None },
)]
fn key_classification(key: &str, expected: Option<StatusFamily>) {
    assert_eq!(classify_key(key), expected);
}

#[tokio::test]
async fn host_online_updates_row_and_republishes_externally() {
    let f = fixture();
    f.store.seed_server(
        ServerId::new(7),
        manman_core::HostStatus::Offline,
        "2026-02-10T14:00:00Z".parse().unwrap(),
    );

    let outcome = f
        .projector
        .handle("status.host.7", br#"{"server_id":7,"status":"online"}"#)
        .await;
    assert_eq!(outcome, HandlerOutcome::Ack);

    let server = f.store.server(ServerId::new(7)).unwrap();
    assert_eq!(server.status, manman_core::HostStatus::Online);
    assert_eq!(
        server.last_seen,
        Some("2026-02-10T15:00:00Z".parse().unwrap())
    );
    assert!(f.store.has_capability(ServerId::new(7)));

    let external = f.external.with_key("manman.host.online");
    assert_eq!(external.len(), 1);
    assert_eq!(external[0].exchange, "external");
}

#[tokio::test]
async fn capability_row_only_created_once() {
    let f = fixture();
    f.store.seed_server(
        ServerId::new(7),
        manman_core::HostStatus::Offline,
        "2026-02-10T14:00:00Z".parse().unwrap(),
    );
    for _ in 0..2 {
        f.projector
            .handle("status.host.7", br#"{"server_id":7,"status":"online"}"#)
            .await;
    }
    assert!(f.store.has_capability(ServerId::new(7)));
}

#[tokio::test]
async fn heartbeat_touches_last_seen() {
    let f = fixture();
    f.store.seed_server(
        ServerId::new(7),
        manman_core::HostStatus::Online,
        "2026-02-10T14:59:00Z".parse().unwrap(),
    );
    f.clock.set_utc("2026-02-10T15:00:05Z");

    let payload = br#"{"server_id":7,"session_stats":{"total":1,"pending":0,"starting":0,"running":1,"stopping":0,"stopped":0,"crashed":0}}"#;
    let outcome = f.projector.handle("health.host.7", payload).await;
    assert_eq!(outcome, HandlerOutcome::Ack);

    let server = f.store.server(ServerId::new(7)).unwrap();
    assert_eq!(
        server.last_seen,
        Some("2026-02-10T15:00:05Z".parse().unwrap())
    );
}

#[tokio::test]
async fn valid_transition_chain_is_stored() {
    let f = fixture();
    for status in ["pending", "starting", "running"] {
        let outcome = f
            .projector
            .handle("status.session.200", &session_payload(200, status))
            .await;
        assert_eq!(outcome, HandlerOutcome::Ack);
    }
    let session = f.store.session(SessionId::new(200)).unwrap();
    assert_eq!(session.status, SessionStatus::Running);
    assert!(session.started_at.is_some());
}

#[tokio::test]
async fn invalid_transition_is_dropped_without_write() {
    let f = fixture();
    f.projector
        .handle("status.session.200", &session_payload(200, "running"))
        .await;
    // running -> pending is not in the table; row must stay at running.
    let outcome = f
        .projector
        .handle("status.session.200", &session_payload(200, "pending"))
        .await;
    assert_eq!(outcome, HandlerOutcome::Ack);

    let session = f.store.session(SessionId::new(200)).unwrap();
    assert_eq!(session.status, SessionStatus::Running);
    assert_eq!(
        f.projector.metrics().invalid_transitions.load(std::sync::atomic::Ordering::Relaxed),
        1
    );
}

#[tokio::test]
async fn crash_stores_exit_code_and_fans_out() {
    let f = fixture();
    f.projector
        .handle("status.session.101", &session_payload(101, "running"))
        .await;
    f.clock.set_utc("2026-02-10T15:01:00Z");
    f.projector
        .handle(
            "status.session.101",
            br#"{"session_id":101,"sgc_id":55,"status":"crashed","exit_code":37}"#,
        )
        .await;

    let session = f.store.session(SessionId::new(101)).unwrap();
    assert_eq!(session.status, SessionStatus::Crashed);
    assert_eq!(session.exit_code, Some(37));
    assert_eq!(
        session.ended_at,
        Some("2026-02-10T15:01:00Z".parse().unwrap())
    );

    let external = f.external.with_key("manman.session.crashed");
    assert_eq!(external.len(), 1);
    assert_eq!(external[0].json()["exit_code"], 37);
}

#[tokio::test]
async fn non_external_statuses_are_not_republished() {
    let f = fixture();
    f.projector
        .handle("status.session.300", &session_payload(300, "starting"))
        .await;
    assert!(f.external.messages().is_empty());
}

#[tokio::test]
async fn malformed_json_is_acked_and_counted() {
    let f = fixture();
    let outcome = f.projector.handle("status.session.1", b"not json").await;
    assert_eq!(outcome, HandlerOutcome::Ack);
    assert_eq!(
        f.projector.metrics().decode_failures.load(std::sync::atomic::Ordering::Relaxed),
        1
    );
    assert!(f.store.session(SessionId::new(1)).is_none());
}

#[tokio::test]
async fn installation_updates_are_projected() {
    let f = fixture();
    let payload =
        br#"{"installation_id":3,"status":"downloading","progress_percent":42}"#;
    let outcome = f
        .projector
        .handle("status.workshop.installation.3", payload)
        .await;
    assert_eq!(outcome, HandlerOutcome::Ack);

    let (status, progress, error) = f
        .store
        .installation(manman_core::InstallationId::new(3))
        .unwrap();
    assert_eq!(status, manman_core::InstallationStatus::Downloading);
    assert_eq!(progress, 42);
    assert_eq!(error, None);
}

#[tokio::test]
async fn unknown_session_first_status_is_accepted() {
    let f = fixture();
    // Host restarts can make `running` the first status the processor
    // ever sees for a session.
    let outcome = f
        .projector
        .handle("status.session.102", &session_payload(102, "running"))
        .await;
    assert_eq!(outcome, HandlerOutcome::Ack);
    assert_eq!(
        f.store.session(SessionId::new(102)).unwrap().status,
        SessionStatus::Running
    );
}
