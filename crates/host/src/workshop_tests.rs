// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use manman_core::LibraryId;

#[yare::parameterized(
    plain        = { "Update state (0x61) downloading, progress: 42.76 (42%)", Some(42) },
    start        = { "0%", Some(0) },
    done         = { "progress: 100%", Some(100) },
    over         = { "999%", Some(100) },
    no_percent   = { "Logging in user 'anonymous'", None },
    bare_number  = { "downloaded 5000 bytes", None },
)]
fn progress_parsing(line: &str, expected: Option<u8>) {
    assert_eq!(parse_progress(line), expected);
}

fn addon(id: i64) -> AddonSpec {
    AddonSpec {
        addon_id: AddonId::new(id),
        workshop_id: format!("30000{id}"),
        steam_app_id: 730,
        install_path: "/data/addons".to_string(),
    }
}

fn library(id: i64, addons: Vec<AddonSpec>, includes: Vec<LibrarySpec>) -> LibrarySpec {
    LibrarySpec {
        library_id: LibraryId::new(id),
        addons,
        includes,
    }
}

#[test]
fn expansion_walks_includes_breadth_first() {
    let libraries = vec![library(
        1,
        vec![addon(10)],
        vec![
            library(2, vec![addon(20)], vec![]),
            library(3, vec![addon(30)], vec![]),
        ],
    )];
    let addons = expand_libraries(&libraries);
    let ids: Vec<i64> = addons.iter().map(|a| a.addon_id.as_i64()).collect();
    assert_eq!(ids, vec![10, 20, 30]);
}

#[test]
fn expansion_deduplicates_addons() {
    let shared = addon(10);
    let libraries = vec![
        library(1, vec![shared.clone()], vec![]),
        library(2, vec![shared, addon(20)], vec![]),
    ];
    let addons = expand_libraries(&libraries);
    let ids: Vec<i64> = addons.iter().map(|a| a.addon_id.as_i64()).collect();
    assert_eq!(ids, vec![10, 20]);
}

#[test]
fn expansion_terminates_on_include_cycles() {
    // Two libraries including each other; library-id dedup breaks the
    // loop even though the specs are structurally recursive.
    let l2 = library(2, vec![addon(20)], vec![library(1, vec![addon(10)], vec![])]);
    let l1 = library(1, vec![addon(10)], vec![l2]);
    let addons = expand_libraries(&[l1]);
    let ids: Vec<i64> = addons.iter().map(|a| a.addon_id.as_i64()).collect();
    assert_eq!(ids, vec![10, 20]);
}

#[test]
fn download_plan_skips_installed_and_unknown_addons() {
    let libraries = vec![library(1, vec![addon(10), addon(20), addon(30)], vec![])];
    let installations = HashMap::from([
        (
            AddonId::new(10),
            (InstallationId::new(1), InstallationStatus::Installed),
        ),
        (
            AddonId::new(20),
            (InstallationId::new(2), InstallationStatus::Pending),
        ),
        // addon 30 has no installation record at all
    ]);

    let plan = plan_downloads(&libraries, &installations);
    assert_eq!(plan.len(), 1);
    assert_eq!(plan[0].0, InstallationId::new(2));
    assert_eq!(plan[0].1.addon_id, AddonId::new(20));
}

#[test]
fn failed_installations_are_retried_by_the_plan() {
    let libraries = vec![library(1, vec![addon(10)], vec![])];
    let installations = HashMap::from([(
        AddonId::new(10),
        (InstallationId::new(1), InstallationStatus::Failed),
    )]);
    assert_eq!(plan_downloads(&libraries, &installations).len(), 1);
}

#[test]
fn container_name_includes_env_sgc_and_addon() {
    assert_eq!(
        download_container_name("prod", SgcId::new(55), AddonId::new(3)),
        "workshop-download-prod-55-3"
    );
}

#[test]
fn steamcmd_invocation_shape() {
    let args = steamcmd_args("/data/addons", 730, "3043210843");
    assert_eq!(
        args,
        vec![
            "+force_install_dir",
            "/data/addons",
            "+login",
            "anonymous",
            "+workshop_download_item",
            "730",
            "3043210843",
            "+quit",
        ]
    );
}
