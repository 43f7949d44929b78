// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent-id → session-name mapping scenarios.

use gt_core::{AgentId, SessionId};

#[test]
fn worker_witness_and_mayor_mappings() {
    assert_eq!(AgentId::new("rig1/polecats/alpha").session_name(), "gt-rig1-alpha");
    assert_eq!(AgentId::new("rig1/witness").session_name(), "gt-rig1-witness");
    assert_eq!(AgentId::new("mayor").session_name(), "gt-mayor");
}

#[test]
fn mayor_probes_hq_candidate() {
    let candidates = AgentId::new("mayor").session_candidates();
    assert_eq!(candidates, vec![SessionId::new("gt-mayor"), SessionId::new("hq-mayor")]);
}

#[test]
fn mapping_is_deterministic_across_calls() {
    let id = AgentId::new("rig1/polecats/alpha");
    let names: Vec<SessionId> = (0..100).map(|_| id.session_name()).collect();
    assert!(names.windows(2).all(|w| w[0] == w[1]));
}
