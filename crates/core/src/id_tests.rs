// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn ids_serialize_as_bare_integers() {
    let id = SessionId::new(100);
    assert_eq!(serde_json::to_string(&id).unwrap(), "100");
    let parsed: SessionId = serde_json::from_str("100").unwrap();
    assert_eq!(parsed, id);
}

#[test]
fn ids_display_as_integers() {
    assert_eq!(ServerId::new(7).to_string(), "7");
    assert_eq!(SgcId::new(55).to_string(), "55");
}

#[test]
fn distinct_id_types_do_not_compare() {
    // Compile-time property: ServerId and SessionId are different types.
    // Runtime check that values round-trip through From<i64>.
    let a: ServerId = 7.into();
    assert_eq!(a.as_i64(), 7);
}

#[test]
fn environment_round_trips() {
    let env = Environment::new("prod");
    assert_eq!(env.as_str(), "prod");
    assert_eq!(serde_json::to_string(&env).unwrap(), "\"prod\"");
}
