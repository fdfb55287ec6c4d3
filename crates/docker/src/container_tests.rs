// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use manman_core::{Environment, PortProtocol, SessionId, SgcId};

fn spec() -> ContainerSpec {
    ContainerSpec {
        name: "manman-session-100".to_string(),
        image: "alpine:3".to_string(),
        entrypoint: Some(vec!["/bin/sh".to_string()]),
        cmd: Some(vec!["-c".to_string(), "echo hi".to_string()]),
        env: [("SERVER_NAME".to_string(), "test".to_string())].into(),
        labels: ContainerLabels::game(
            ServerId::new(7),
            Environment::new("test"),
            SessionId::new(100),
            SgcId::new(55),
            1_700_000_000,
        ),
        port_bindings: vec![PortBinding {
            protocol: PortProtocol::Udp,
            container_port: 27015,
            host_port: 31015,
        }],
        mounts: vec![
            VolumeMount {
                source: "/data/host/sgc-55".to_string(),
                target: "/saves".to_string(),
                read_only: false,
            },
            VolumeMount {
                source: "shared-maps".to_string(),
                target: "/maps".to_string(),
                read_only: true,
            },
        ],
        network: Some("session-100".to_string()),
        interactive: true,
    }
}

#[test]
fn interactive_spec_keeps_stdin_open_across_detach() {
    let config = spec().to_config();
    assert_eq!(config.tty, Some(true));
    assert_eq!(config.open_stdin, Some(true));
    assert_eq!(config.stdin_once, Some(false));
    assert_eq!(config.attach_stdin, Some(true));
}

#[test]
fn non_interactive_spec_has_no_tty() {
    let mut spec = spec();
    spec.interactive = false;
    let config = spec.to_config();
    assert_eq!(config.tty, Some(false));
    assert_eq!(config.open_stdin, Some(false));
}

#[test]
fn port_bindings_publish_on_all_interfaces() {
    let config = spec().to_config();
    let host_config = config.host_config.unwrap();
    let port_map = host_config.port_bindings.unwrap();
    let bindings = port_map.get("27015/udp").unwrap().as_ref().unwrap();
    assert_eq!(bindings[0].host_ip.as_deref(), Some("0.0.0.0"));
    assert_eq!(bindings[0].host_port.as_deref(), Some("31015"));
    assert!(config.exposed_ports.unwrap().contains_key("27015/udp"));
}

#[test]
fn mounts_render_as_binds_with_ro_flag() {
    let config = spec().to_config();
    let binds = config.host_config.unwrap().binds.unwrap();
    assert!(binds.contains(&"/data/host/sgc-55:/saves".to_string()));
    assert!(binds.contains(&"shared-maps:/maps:ro".to_string()));
}

#[test]
fn labels_and_network_are_applied() {
    let config = spec().to_config();
    let labels = config.labels.unwrap();
    assert_eq!(
        labels.get(manman_core::LABEL_TYPE).map(String::as_str),
        Some("game")
    );
    assert_eq!(
        config.host_config.unwrap().network_mode.as_deref(),
        Some("session-100")
    );
}

#[test]
fn empty_ports_and_mounts_stay_unset() {
    let mut spec = spec();
    spec.port_bindings.clear();
    spec.mounts.clear();
    let config = spec.to_config();
    assert!(config.exposed_ports.is_none());
    let host_config = config.host_config.unwrap();
    assert!(host_config.binds.is_none());
    assert!(host_config.port_bindings.is_none());
}
