// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn decodes_start_command_from_control_plane_shape() {
    let payload = br#"{
        "session_id": 100,
        "sgc_id": 55,
        "game_config": {"image": "alpine:3", "entrypoint": ["/bin/sh"], "command": ["-c", "echo hi; sleep 2"]},
        "server_game_config": {"port_bindings": []}
    }"#;
    let command = HostCommand::decode("command.host.7.session.start", payload).unwrap();
    let HostCommand::StartSession(start) = command else {
        panic!("wrong variant");
    };
    assert_eq!(start.session_id, SessionId::new(100));
    assert_eq!(start.sgc_id, SgcId::new(55));
    assert_eq!(start.game_config.image, "alpine:3");
    assert!(!start.force);
}

#[test]
fn decodes_stop_with_force_default() {
    let command =
        HostCommand::decode("command.host.7.session.stop", br#"{"session_id": 5}"#).unwrap();
    assert_eq!(
        command,
        HostCommand::StopSession(StopSessionCommand {
            session_id: SessionId::new(5),
            force: false,
        })
    );
}

#[test]
fn unknown_routing_key_is_permanent_error() {
    let err = HostCommand::decode("command.host.7.session.explode", b"{}").unwrap_err();
    assert!(matches!(err, CommandDecodeError::UnknownRoutingKey(_)));
}

#[test]
fn malformed_json_is_permanent_error() {
    let err = HostCommand::decode("command.host.7.session.kill", b"not json").unwrap_err();
    assert!(matches!(err, CommandDecodeError::Json(_)));
}

#[test]
fn send_input_round_trips_bytes() {
    let command = SendInputCommand::encode_input(SessionId::new(9), b"say hello\n");
    let decoded = command.decode_input().unwrap();
    assert_eq!(decoded, b"say hello\n");
}

#[test]
fn send_input_rejects_bad_base64() {
    let command = SendInputCommand {
        session_id: SessionId::new(9),
        input: "!!!not-base64!!!".to_string(),
    };
    assert!(command.decode_input().is_err());
}

#[test]
fn session_commands_expose_their_session_id() {
    let command = HostCommand::KillSession(KillSessionCommand {
        session_id: SessionId::new(4),
    });
    assert_eq!(command.session_id(), Some(SessionId::new(4)));

    let download = HostCommand::DownloadAddon(DownloadAddonCommand {
        installation_id: InstallationId::new(1),
        sgc_id: SgcId::new(2),
        addon_id: AddonId::new(3),
        workshop_id: "123456".to_string(),
        steam_app_id: 730,
        install_path: "addons".to_string(),
    });
    assert_eq!(download.session_id(), None);
}

#[test]
fn session_status_update_omits_null_exit_code() {
    let update = SessionStatusUpdate {
        session_id: SessionId::new(100),
        sgc_id: SgcId::new(55),
        status: SessionStatus::Running,
        exit_code: None,
    };
    let json = serde_json::to_string(&update).unwrap();
    assert!(!json.contains("exit_code"));

    let update = SessionStatusUpdate {
        exit_code: Some(37),
        status: SessionStatus::Crashed,
        ..update
    };
    let json = serde_json::to_string(&update).unwrap();
    assert!(json.contains("\"exit_code\":37"));
    assert!(json.contains("\"crashed\""));
}

#[test]
fn health_update_carries_stats_buckets() {
    let mut stats = SessionStats::default();
    stats.observe(SessionStatus::Running);
    let update = HostHealthUpdate {
        server_id: ServerId::new(7),
        session_stats: stats,
    };
    let json = serde_json::to_value(&update).unwrap();
    assert_eq!(json["session_stats"]["total"], 1);
    assert_eq!(json["session_stats"]["running"], 1);
}

#[test]
fn log_line_serializes_rfc3339_timestamp() {
    let line = SessionLogLine {
        timestamp: "2026-02-10T15:30:05Z".parse().unwrap(),
        source: LogSource::Stdout,
        message: "hi".to_string(),
    };
    let json = serde_json::to_string(&line).unwrap();
    assert!(json.contains("2026-02-10T15:30:05Z"));
    assert!(json.contains("\"stdout\""));
}
