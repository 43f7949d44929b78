// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic session theming.
//!
//! Each rig hashes to a fixed palette slot so its sessions always carry the
//! same status-bar color; the mayor and deacon roles get dedicated themes.
//! Presentation metadata only — nothing here affects delivery.

use serde::{Deserialize, Serialize};

/// A named status-bar color pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub name: &'static str,
    pub color: &'static str,
}

/// Rig palette. Order is part of the assignment contract; append only.
pub static PALETTE: [Theme; 8] = [
    Theme { name: "rust", color: "colour130" },
    Theme { name: "ocean", color: "colour31" },
    Theme { name: "moss", color: "colour65" },
    Theme { name: "plum", color: "colour96" },
    Theme { name: "ember", color: "colour160" },
    Theme { name: "slate", color: "colour60" },
    Theme { name: "sand", color: "colour180" },
    Theme { name: "pine", color: "colour23" },
];

/// Dedicated theme for the town mayor.
pub const MAYOR_THEME: Theme = Theme { name: "mayor", color: "colour220" };

/// Dedicated theme for the deacon's health patrol.
pub const DEACON_THEME: Theme = Theme { name: "deacon", color: "colour245" };

/// 32-bit FNV-1a. Stable across platforms and releases, which `std::hash`
/// does not guarantee.
fn fnv1a32(s: &str) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in s.bytes() {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

/// Deterministic palette assignment for a rig.
pub fn assign_theme(rig: &str) -> &'static Theme {
    let index = fnv1a32(rig) as usize % PALETTE.len();
    &PALETTE[index]
}

/// Gastown agent roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Mayor,
    Deacon,
    Witness,
    Polecat,
    Crew,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mayor" => Some(Role::Mayor),
            "deacon" => Some(Role::Deacon),
            "witness" => Some(Role::Witness),
            "polecat" | "polecats" => Some(Role::Polecat),
            "crew" => Some(Role::Crew),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Role::Mayor => "mayor",
            Role::Deacon => "deacon",
            Role::Witness => "witness",
            Role::Polecat => "polecat",
            Role::Crew => "crew",
        }
    }
}

/// Visual metadata for one agent session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionConfig {
    pub theme: Theme,
    pub worker_label: String,
    pub role_tag: String,
    pub rig: String,
}

/// Compute the visual metadata for a role within a rig.
///
/// Mayor and deacon override the rig palette; everything else inherits the
/// rig's assigned theme.
pub fn session_config_for_role(role: Role, rig: &str) -> SessionConfig {
    let theme = match role {
        Role::Mayor => MAYOR_THEME,
        Role::Deacon => DEACON_THEME,
        _ => *assign_theme(rig),
    };
    let worker_label = match role {
        Role::Mayor | Role::Deacon => role.tag().to_string(),
        _ => format!("{}/{}", rig, role.tag()),
    };
    SessionConfig { theme, worker_label, role_tag: role.tag().to_string(), rig: rig.to_string() }
}

#[cfg(test)]
#[path = "theme_tests.rs"]
mod tests;
