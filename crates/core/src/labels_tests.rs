// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn env() -> Environment {
    Environment::new("test")
}

#[test]
fn game_labels_round_trip() {
    let labels = ContainerLabels::game(
        ServerId::new(7),
        env(),
        SessionId::new(100),
        SgcId::new(55),
        1_700_000_000,
    );
    let map = labels.to_map();
    assert_eq!(map.get(LABEL_TYPE).map(String::as_str), Some("game"));
    assert_eq!(map.get(LABEL_SERVER_ID).map(String::as_str), Some("7"));
    assert_eq!(map.get(LABEL_SESSION_ID).map(String::as_str), Some("100"));
    assert_eq!(map.get(LABEL_SGC_ID).map(String::as_str), Some("55"));

    let parsed = ContainerLabels::parse(&map).unwrap();
    assert_eq!(parsed, labels);
}

#[test]
fn workshop_labels_carry_sgc_not_session() {
    let labels = ContainerLabels::workshop(ServerId::new(7), env(), SgcId::new(55), 10);
    let map = labels.to_map();
    assert_eq!(
        map.get(LABEL_TYPE).map(String::as_str),
        Some("workshop-download")
    );
    let parsed = ContainerLabels::parse(&map).unwrap();
    assert_eq!(parsed.sgc_id, Some(SgcId::new(55)));
    assert_eq!(parsed.session_id, None);
}

#[test]
fn unlabeled_container_is_not_ours() {
    let mut map = HashMap::new();
    map.insert("com.docker.compose.project".to_string(), "x".to_string());
    assert!(ContainerLabels::parse(&map).is_none());
}

#[test]
fn unknown_type_is_not_ours() {
    let mut map =
        ContainerLabels::game(ServerId::new(7), env(), SessionId::new(1), SgcId::new(2), 0).to_map();
    map.insert(LABEL_TYPE.to_string(), "sidecar".to_string());
    assert!(ContainerLabels::parse(&map).is_none());
}

#[test]
fn missing_optional_ids_parse_to_none() {
    let mut map =
        ContainerLabels::game(ServerId::new(7), env(), SessionId::new(1), SgcId::new(2), 0).to_map();
    map.remove(LABEL_SESSION_ID);
    map.remove(LABEL_CREATED_AT);
    let parsed = ContainerLabels::parse(&map).unwrap();
    assert_eq!(parsed.session_id, None);
    assert_eq!(parsed.created_at, 0);
}
