// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn assignment_is_deterministic() {
    let first = assign_theme("rig1");
    for _ in 0..10 {
        assert_eq!(assign_theme("rig1"), first);
    }
}

#[test]
fn different_rigs_can_differ() {
    // Not guaranteed for arbitrary pairs, but these two must not collide or
    // the hash has degenerated.
    assert_ne!(assign_theme("rig1").name, assign_theme("wasteland").name);
}

#[test]
fn mayor_and_deacon_override_rig_theme() {
    let mayor = session_config_for_role(Role::Mayor, "rig1");
    assert_eq!(mayor.theme, MAYOR_THEME);
    assert_eq!(mayor.worker_label, "mayor");

    let deacon = session_config_for_role(Role::Deacon, "rig1");
    assert_eq!(deacon.theme, DEACON_THEME);
}

#[test]
fn workers_inherit_rig_theme() {
    let config = session_config_for_role(Role::Polecat, "rig1");
    assert_eq!(&config.theme, assign_theme("rig1"));
    assert_eq!(config.worker_label, "rig1/polecat");
    assert_eq!(config.role_tag, "polecat");
    assert_eq!(config.rig, "rig1");
}

#[yare::parameterized(
    mayor = { "mayor", Some(Role::Mayor) },
    polecats_plural = { "polecats", Some(Role::Polecat) },
    witness_caps = { "Witness", Some(Role::Witness) },
    unknown = { "bartender", None },
)]
fn role_parsing(input: &str, expected: Option<Role>) {
    assert_eq!(Role::parse(input), expected);
}
