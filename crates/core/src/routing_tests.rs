// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    start      = { CommandKind::SessionStart, "command.host.7.session.start" },
    stop       = { CommandKind::SessionStop, "command.host.7.session.stop" },
    kill       = { CommandKind::SessionKill, "command.host.7.session.kill" },
    send_input = { CommandKind::SessionSendInput, "command.host.7.session.send_input" },
    download   = { CommandKind::WorkshopDownload, "command.host.7.workshop.download" },
)]
fn command_keys_round_trip(kind: CommandKind, expected: &str) {
    let key = RoutingKey::command(ServerId::new(7), kind);
    assert_eq!(key, expected);
    let (server_id, parsed) = RoutingKey::parse_command(&key).unwrap();
    assert_eq!(server_id, ServerId::new(7));
    assert_eq!(parsed, kind);
}

#[yare::parameterized(
    wrong_prefix  = { "status.host.7" },
    missing_verb  = { "command.host.7" },
    bad_server_id = { "command.host.seven.session.start" },
    unknown_verb  = { "command.host.7.session.reboot" },
)]
fn unparseable_command_keys(key: &str) {
    assert!(RoutingKey::parse_command(key).is_none());
}

#[test]
fn status_and_health_keys() {
    assert_eq!(RoutingKey::host_status(ServerId::new(7)), "status.host.7");
    assert_eq!(
        RoutingKey::session_status(SessionId::new(100)),
        "status.session.100"
    );
    assert_eq!(RoutingKey::host_health(ServerId::new(7)), "health.host.7");
    assert_eq!(
        RoutingKey::session_logs(SessionId::new(100)),
        "logs.session.100"
    );
    assert_eq!(
        RoutingKey::installation_status(InstallationId::new(3)),
        "status.workshop.installation.3"
    );
}

#[test]
fn queue_names() {
    assert_eq!(
        RoutingKey::command_queue(ServerId::new(7)),
        "host-7-commands"
    );
    assert_eq!(
        RoutingKey::command_binding(ServerId::new(7)),
        "command.host.7.#"
    );
}

#[test]
fn external_keys() {
    assert_eq!(
        RoutingKey::external_host(ExternalHostEvent::Stale),
        "manman.host.stale"
    );
    assert_eq!(
        RoutingKey::external_session(SessionStatus::Crashed).as_deref(),
        Some("manman.session.crashed")
    );
    assert_eq!(RoutingKey::external_session(SessionStatus::Starting), None);
    assert_eq!(RoutingKey::external_session(SessionStatus::Lost), None);
}
