// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;

#[test]
fn paste_placeholder_detection() {
    assert!(has_paste_placeholder("output\n[Pasted text #3 +47 lines]\n> "));
    assert!(!has_paste_placeholder("[Pasted text]"));
    assert!(!has_paste_placeholder("> hello"));
}

#[test]
fn verify_finds_clean_injection() {
    let after = "some output\nmore output\n> hello";
    assert_eq!(verify_integrity(after, "hello"), Some((String::new(), String::new())));
}

#[test]
fn verify_reports_stray_text_around_message() {
    let after = "output\n> abhello cd";
    let (before, after_text) = verify_integrity(after, "hello").unwrap();
    assert_eq!(before, "ab");
    assert_eq!(after_text, "cd");
}

#[test]
fn verify_missing_message_is_none() {
    assert_eq!(verify_integrity("output\n> ", "hello"), None);
}

#[test]
fn verify_uses_last_matching_line() {
    let after = "> hello old\nnoise\n> hello";
    assert_eq!(verify_integrity(after, "hello"), Some((String::new(), String::new())));
}

#[test]
fn verify_strips_boxed_prompt_decoration() {
    let after = "╭──────╮\n│ > hello │";
    assert_eq!(verify_integrity(after, "hello"), Some((String::new(), String::new())));
}

#[test]
fn input_line_reads_prompt_content() {
    assert_eq!(input_line("output\n> ab"), Some("ab".to_string()));
    assert_eq!(input_line("output\n> "), None);
    assert_eq!(input_line("│ > draft │"), Some("draft".to_string()));
}

#[test]
fn input_line_ignores_plain_output() {
    assert_eq!(input_line("Compiling gastown v0.1.0"), None);
}

#[test]
fn find_original_recovers_line_after_context() {
    let before = "banner\nstatus line\nready\n> ab";
    let after = "banner\nstatus line\nready\n> hello";
    assert_eq!(find_original_input(before, after, "hello", 3), Some("ab".to_string()));
}

#[test]
fn find_original_none_without_enough_context() {
    let before = "> ab";
    let after = "> hello";
    assert_eq!(find_original_input(before, after, "hello", 3), None);
}

#[test]
fn find_original_none_when_context_differs() {
    let before = "completely\ndifferent\nhistory\n> ab";
    let after = "banner\nstatus line\nready\n> hello";
    assert_eq!(find_original_input(before, after, "hello", 3), None);
}

#[test]
fn find_original_prefers_newest_match() {
    let before = "ctx\nctx\nctx\n> old\nctx\nctx\nctx\n> recent";
    let after = "ctx\nctx\nctx\n> hello";
    assert_eq!(find_original_input(before, after, "hello", 3), Some("recent".to_string()));
}

proptest! {
    // Property: when AFTER ends with `context_lines` of context followed by
    // the message, and BEFORE contains the same adjacent context followed by
    // an input line, the input line comes back (trimmed).
    #[test]
    fn original_input_recovered(
        context in proptest::collection::vec("[a-z ]{1,12}", 3..=3),
        input in "[a-z]{1,10}",
    ) {
        let before = format!("{}\n> {}", context.join("\n"), input);
        let after = format!("{}\n> hello", context.join("\n"));
        prop_assert_eq!(
            find_original_input(&before, &after, "hello", 3),
            Some(input.trim().to_string())
        );
    }

    // The splitter never loses the stray text around the message.
    #[test]
    fn split_preserves_strays(before in "[a-z]{0,6}", after in "[a-z]{0,6}") {
        prop_assume!(!before.contains("hello") && !after.contains("hello"));
        let line = format!("> {}hello{}", before, after);
        let (b, a) = split_around_message(&line, "hello").unwrap();
        prop_assert_eq!(b, before);
        prop_assert_eq!(a, after);
    }
}
