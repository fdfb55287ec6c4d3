// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn renders_placeholders_in_args() {
    let config = GameConfigSnapshot {
        image: "cs2:latest".to_string(),
        args_template: vec!["-port".to_string(), "{{port}}".to_string()],
        ..GameConfigSnapshot::default()
    };
    let args = config.rendered_args(&params(&[("port", "27015")])).unwrap();
    assert_eq!(args, vec!["-port", "27015"]);
}

#[test]
fn renders_placeholders_in_env_values() {
    let config = GameConfigSnapshot {
        image: "cs2:latest".to_string(),
        env_template: params(&[("RCON_PASSWORD", "{{rcon}}")]),
        ..GameConfigSnapshot::default()
    };
    let env = config.rendered_env(&params(&[("rcon", "hunter2")])).unwrap();
    assert_eq!(env.get("RCON_PASSWORD").map(String::as_str), Some("hunter2"));
}

#[test]
fn unresolved_placeholder_is_an_error() {
    let config = GameConfigSnapshot {
        image: "x".to_string(),
        args_template: vec!["{{missing}}".to_string()],
        ..GameConfigSnapshot::default()
    };
    let err = config.rendered_args(&HashMap::new()).unwrap_err();
    assert_eq!(
        err,
        RenderError::UnresolvedPlaceholder {
            name: "missing".to_string()
        }
    );
}

#[test]
fn multiple_placeholders_in_one_arg() {
    let rendered = render(
        "{{a}}:{{b}}",
        &params(&[("a", "host"), ("b", "27015")]),
    )
    .unwrap();
    assert_eq!(rendered, "host:27015");
}

#[test]
fn placeholder_names_are_trimmed() {
    let rendered = render("{{ port }}", &params(&[("port", "1")])).unwrap();
    assert_eq!(rendered, "1");
}

#[test]
fn unterminated_braces_pass_through() {
    let rendered = render("{{oops", &HashMap::new()).unwrap();
    assert_eq!(rendered, "{{oops");
}

#[yare::parameterized(
    absolute = { "/data/saves", true },
    relative = { "./saves", true },
    named    = { "cs2-maps", false },
)]
fn bind_mount_detection(source: &str, is_bind: bool) {
    let mount = VolumeMount {
        source: source.to_string(),
        target: "/saves".to_string(),
        read_only: false,
    };
    assert_eq!(mount.is_bind(), is_bind);
}

#[test]
fn start_command_snapshot_decodes_with_defaults() {
    // Shape published by the control plane; most fields are optional.
    let json = r#"{"image":"alpine:3","entrypoint":["/bin/sh"],"command":["-c","echo hi"]}"#;
    let config: GameConfigSnapshot = serde_json::from_str(json).unwrap();
    assert_eq!(config.image, "alpine:3");
    assert!(config.args_template.is_empty());
    assert!(config.env_template.is_empty());

    let sgc: SgcSnapshot = serde_json::from_str(r#"{"port_bindings":[]}"#).unwrap();
    assert!(sgc.port_bindings.is_empty());
    assert_eq!(sgc.sgc_id, None);
}

#[test]
fn port_protocol_round_trips() {
    assert_eq!("tcp".parse::<PortProtocol>().unwrap(), PortProtocol::Tcp);
    assert_eq!(PortProtocol::Udp.to_string(), "udp");
    assert!("icmp".parse::<PortProtocol>().is_err());
}
