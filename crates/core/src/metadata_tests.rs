// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;

#[test]
fn parse_tolerates_blanks_and_whitespace() {
    let meta = parse_metadata("\n  backend :  coop  \n\n  coop_url: http://10.0.0.4:8080/ \n");
    assert_eq!(meta.get("backend").map(String::as_str), Some("coop"));
    assert_eq!(meta.get("coop_url").map(String::as_str), Some("http://10.0.0.4:8080/"));
}

#[test]
fn values_with_colons_survive() {
    let meta = parse_metadata("coop_url: http://host:9000/api");
    assert_eq!(meta.get("coop_url").map(String::as_str), Some("http://host:9000/api"));
}

#[test]
fn lines_without_colon_are_skipped() {
    let meta = parse_metadata("backend coop\nssh_host: pod-7");
    assert_eq!(meta.len(), 1);
    assert_eq!(meta.get("ssh_host").map(String::as_str), Some("pod-7"));
}

#[yare::parameterized(
    coop = { "backend: coop\ncoop_url: http://x:1", BackendKind::Coop },
    coop_without_url = { "backend: coop", BackendKind::Local },
    k8s = { "backend: k8s\nssh_host: 10.1.2.3", BackendKind::K8s },
    k8s_without_host = { "backend: k8s", BackendKind::Local },
    unknown_backend = { "backend: fancy\ncoop_url: http://x:1", BackendKind::Local },
    empty = { "", BackendKind::Local },
    whitespace = { "   \n\t\n", BackendKind::Local },
)]
fn classification(text: &str, expected: BackendKind) {
    assert_eq!(classify_backend(&parse_metadata(text)), expected);
}

#[test]
fn coop_config_strips_trailing_slash() {
    let config = CoopConfig::parse("backend: coop\ncoop_url: http://10.0.0.4:8080/").unwrap();
    assert_eq!(config.url, "http://10.0.0.4:8080");
    assert_eq!(config.token, None);
}

#[test]
fn coop_config_reparse_is_idempotent() {
    let config = CoopConfig {
        url: "http://10.0.0.4:8080".to_string(),
        token: Some("s3cret".to_string()),
    };
    let reparsed = CoopConfig::parse(&config.to_metadata()).unwrap();
    assert_eq!(reparsed, config);
    assert_eq!(CoopConfig::parse(&reparsed.to_metadata()).unwrap(), reparsed);
}

#[test]
fn ssh_config_reparse_is_idempotent() {
    let config = SshConfig {
        host: "10.9.9.9".to_string(),
        port: Some(2222),
        key: Some("/keys/rig1".to_string()),
        pod_name: Some("gt-rig1-alpha-0".to_string()),
        pod_namespace: Some("gastown".to_string()),
    };
    let reparsed = SshConfig::parse(&config.to_metadata()).unwrap();
    assert_eq!(reparsed, config);
}

#[test]
fn unknown_keys_do_not_alter_result() {
    let base = "backend: k8s\nssh_host: 10.9.9.9";
    let noisy = format!("{}\ncolor: mauve\nfavorite_snack: jerky", base);
    assert_eq!(SshConfig::parse(base), SshConfig::parse(&noisy));
}

#[test]
fn invalid_port_is_dropped() {
    let config = SshConfig::parse("backend: k8s\nssh_host: h\nssh_port: lots").unwrap();
    assert_eq!(config.port, None);
}

proptest! {
    // Round-trip: any complete coop record survives serialize → parse.
    #[test]
    fn coop_roundtrip(
        host in "[a-z][a-z0-9.]{0,12}",
        port in 1u16..,
        token in proptest::option::of("[A-Za-z0-9]{1,16}"),
    ) {
        let config = CoopConfig { url: format!("http://{}:{}", host, port), token };
        prop_assert_eq!(CoopConfig::parse(&config.to_metadata()), Some(config));
    }
}
