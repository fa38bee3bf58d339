// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Best-effort secret/PII scrubbing for anything that leaves the engine
//! in logs or error strings.
//!
//! Rules run in a fixed order: earlier rules strip tokens that later
//! rules would otherwise over-match (a JWT is also a long opaque token;
//! a bearer value may look like an API key).

use regex::Regex;
use std::sync::LazyLock;

#[allow(clippy::unwrap_used)]
fn re(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap()
}

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| re(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b"));
static BEARER: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)\bBearer\s+[A-Za-z0-9._\-]+\b"));
static JWT: LazyLock<Regex> =
    LazyLock::new(|| re(r"\beyJ[A-Za-z0-9_-]{10,}\.[A-Za-z0-9_-]{20,}\.[A-Za-z0-9_-]{20,}\b"));
static BASIC: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)\bAuthorization\s*:\s*Basic\s+[A-Za-z0-9+/=]+\b"));
static API_KEY_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    re(r#"(?i)\b(api[_-]?key|token|secret|client[_-]?secret)\s*[:=]\s*(["']?)([^"'\s]{6,})(["']?)"#)
});
static URL_KEY_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)([?&](?:api[_-]?key|token|secret|password|client[_-]?secret)=)([^&#]{4,})")
});
static URL_USERINFO: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)\b(https?://)([^:@\s]+):([^@\s]+)@"));
static LONG_ALNUM: LazyLock<Regex> = LazyLock::new(|| re(r"\b[A-Za-z0-9_-]{24,}\b"));
static UUID_LIKE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"\b[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[1-5][0-9a-fA-F]{3}-[89abAB][0-9a-fA-F]{3}-[0-9a-fA-F]{12}\b")
});
static AWS_AKID: LazyLock<Regex> = LazyLock::new(|| re(r"\bAKIA[0-9A-Z]{16}\b"));
static PHONE: LazyLock<Regex> = LazyLock::new(|| re(r"\+?\d[\d\s\-]{7,}\d"));

/// Scrub common secrets/PII from `text` and truncate to `max_len` chars.
pub fn redact(text: &str, max_len: usize) -> String {
    if text.is_empty() {
        return String::new();
    }
    let s = EMAIL.replace_all(text, "***@***");
    let s = BEARER.replace_all(&s, "Bearer ***");
    let s = JWT.replace_all(&s, "***");
    let s = BASIC.replace_all(&s, "Authorization: Basic ***");
    let s = API_KEY_FIELD.replace_all(&s, |c: &regex::Captures<'_>| {
        format!("{}={}***{}", &c[1], &c[2], &c[4])
    });
    let s = URL_KEY_PARAM.replace_all(&s, "${1}***");
    let s = URL_USERINFO.replace_all(&s, "${1}***:***@");
    let s = LONG_ALNUM.replace_all(&s, "***");
    let s = UUID_LIKE.replace_all(&s, "***");
    let s = AWS_AKID.replace_all(&s, "***");
    let s = PHONE.replace_all(&s, "***");
    truncate_chars(&s, max_len)
}

/// Produce a short, redacted summary of child stderr/stdout for safe display.
///
/// Keeps only the first `max_lines` lines. If a Python-style traceback is
/// present, the final exception line is folded into the head so the actual
/// error survives the cut.
pub fn summarize_logs(text: &str, max_lines: usize, max_chars: usize) -> String {
    if text.is_empty() {
        return String::new();
    }
    // Redact before slicing so truncation cannot split a secret in half.
    let redacted = redact(text, max_chars.saturating_mul(2));
    let lines: Vec<&str> = redacted.lines().collect();

    let mut head: Vec<&str> = lines.iter().take(max_lines).copied().collect();
    if lines.iter().any(|l| l.starts_with("Traceback ")) {
        if let Some(last) = lines.iter().rev().find(|l| !l.trim().is_empty()) {
            let last = last.trim();
            if !head.iter().any(|l| l.trim() == last) {
                head.truncate(max_lines.saturating_sub(1));
                head.push(last);
            }
        }
    }

    truncate_chars(&head.join("\n"), max_chars)
}

fn truncate_chars(s: &str, max_len: usize) -> String {
    if max_len == 0 || s.chars().count() <= max_len {
        return s.to_string();
    }
    let keep = max_len.saturating_sub(3);
    let mut out: String = s.chars().take(keep).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
#[path = "redact_tests.rs"]
mod tests;
