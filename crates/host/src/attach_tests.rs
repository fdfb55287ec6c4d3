// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use manman_bus::FakePublisher;
use manman_core::ServerId;

#[yare::parameterized(
    stdout = { StreamKind::Stdout, LogSource::Stdout },
    stderr = { StreamKind::Stderr, LogSource::Stderr },
    stdin  = { StreamKind::Stdin, LogSource::Stdout },
)]
fn stream_kinds_map_to_sources(kind: StreamKind, expected: LogSource) {
    assert_eq!(source_for(kind), expected);
}

#[tokio::test]
async fn forwarder_publishes_lines_on_the_session_log_key() {
    let fake = Arc::new(FakePublisher::new());
    let publisher = Arc::new(HostPublisher::new(
        Arc::clone(&fake) as Arc<dyn manman_bus::Publisher>,
        ServerId::new(7),
    ));
    let (tx, rx) = mpsc::channel(8);
    let handle = spawn_log_forwarder(publisher, rx);

    tx.send(ForwardedLine {
        session_id: SessionId::new(100),
        line: SessionLogLine {
            timestamp: "2026-02-10T15:30:05Z".parse().unwrap(),
            source: LogSource::Stdout,
            message: "hi".to_string(),
        },
    })
    .await
    .unwrap();
    drop(tx);
    handle.await.unwrap();

    let messages = fake.with_key("logs.session.100");
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].json()["message"], "hi");
    assert_eq!(messages[0].json()["source"], "stdout");
}
