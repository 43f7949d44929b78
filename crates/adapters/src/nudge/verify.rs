// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure buffer analysis for the nudge protocol.
//!
//! Everything here works on captured pane text only, so the injection state
//! machine is testable by feeding synthetic BEFORE/AFTER buffers.

use regex::Regex;
use std::sync::LazyLock;

static PASTE_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    // Literal pattern, cannot fail to compile.
    match Regex::new(r"\[Pasted text #\d+ \+\d+ lines\]") {
        Ok(re) => re,
        Err(_) => unreachable!("invalid paste pattern"),
    }
});

/// Whether the capture contains a "pasted N lines" placeholder. Injecting
/// while one is present corrupts the operator's paste.
pub fn has_paste_placeholder(capture: &str) -> bool {
    PASTE_PLACEHOLDER.is_match(capture)
}

/// Locate the injected message in an AFTER capture.
///
/// Finds the last line containing `message` and returns the stray text
/// around it, with prompt decoration stripped. `None` means the message
/// never reached the pane.
pub fn verify_integrity(after: &str, message: &str) -> Option<(String, String)> {
    let line = after.lines().rev().find(|l| l.contains(message))?;
    split_around_message(line, message)
}

pub(crate) fn split_around_message(line: &str, message: &str) -> Option<(String, String)> {
    let index = line.rfind(message)?;
    let before = strip_prompt_decoration(&line[..index]);
    let after = strip_trailing_decoration(&line[index + message.len()..]);
    Some((before, after))
}

/// The pending input on the capture's last prompt line, if any.
///
/// Only lines shaped like an input prompt count; trailing program output is
/// never mistaken for operator input.
pub fn input_line(capture: &str) -> Option<String> {
    let line = capture.lines().rev().find(|l| !l.trim().is_empty())?;
    let trimmed = line.trim_start_matches(|c: char| c == '│' || c == '┃' || c.is_whitespace());
    let rest = trimmed.strip_prefix('>')?;
    let content = strip_trailing_decoration(rest);
    if content.is_empty() {
        None
    } else {
        Some(content)
    }
}

/// Recover the operator's pre-nudge input line.
///
/// Takes the `context_lines` lines immediately preceding the message in
/// AFTER and finds the same run of lines in BEFORE (trimmed comparison);
/// the BEFORE line following that run is the original input.
pub fn find_original_input(
    before: &str,
    after: &str,
    message: &str,
    context_lines: usize,
) -> Option<String> {
    if context_lines == 0 {
        return None;
    }
    let after_lines: Vec<&str> = after.lines().collect();
    let message_at = after_lines.iter().rposition(|l| l.contains(message))?;
    if message_at < context_lines {
        return None;
    }
    let context: Vec<&str> =
        after_lines[message_at - context_lines..message_at].iter().map(|l| l.trim()).collect();

    let before_lines: Vec<&str> = before.lines().collect();
    if before_lines.len() < context_lines + 1 {
        return None;
    }
    // Input lines live near the bottom; search newest match first.
    for start in (0..=before_lines.len() - context_lines).rev() {
        let window = &before_lines[start..start + context_lines];
        if window.iter().map(|l| l.trim()).eq(context.iter().copied()) {
            if let Some(following) = before_lines.get(start + context_lines) {
                return Some(strip_prompt_decoration(following));
            }
        }
    }
    None
}

fn strip_prompt_decoration(s: &str) -> String {
    let t = s.trim_start_matches(|c: char| c == '│' || c == '┃' || c.is_whitespace());
    let t = t.strip_prefix('>').unwrap_or(t);
    strip_trailing_decoration(t)
}

fn strip_trailing_decoration(s: &str) -> String {
    s.trim_matches(|c: char| c == '│' || c == '┃' || c.is_whitespace()).to_string()
}

#[cfg(test)]
#[path = "verify_tests.rs"]
mod tests;
