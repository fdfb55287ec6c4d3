// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::session::SessionEntry;
use manman_bus::FakePublisher;
use manman_core::{ServerId, SessionId, SessionStatus, SgcId};

#[tokio::test]
async fn heartbeat_carries_session_stats() {
    let fake = Arc::new(FakePublisher::new());
    let publisher = Arc::new(HostPublisher::new(
        Arc::clone(&fake) as Arc<dyn manman_bus::Publisher>,
        ServerId::new(7),
    ));
    let table = Arc::new(SessionTable::new());
    table.insert(SessionEntry {
        session_id: SessionId::new(100),
        sgc_id: SgcId::new(55),
        container_id: None,
        network: None,
        status: SessionStatus::Running,
        stop_requested: false,
    });

    let cancel = CancellationToken::new();
    let handle = spawn_heartbeat(
        publisher,
        Arc::clone(&table),
        Duration::from_millis(10),
        cancel.clone(),
    );

    // First tick fires immediately; wait for at least one publish.
    for _ in 0..100 {
        if !fake.with_key("health.host.7").is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cancel.cancel();
    handle.await.unwrap();

    let messages = fake.with_key("health.host.7");
    assert!(!messages.is_empty());
    let payload = messages[0].json();
    assert_eq!(payload["server_id"], 7);
    assert_eq!(payload["session_stats"]["total"], 1);
    assert_eq!(payload["session_stats"]["running"], 1);
}
