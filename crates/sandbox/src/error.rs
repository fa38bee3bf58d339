// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tagged sandbox failure carrying the canonical error taxonomy.

use cw_core::{redact, summarize_logs, ErrorKind};
use thiserror::Error;

/// Maximum length of a diagnostic string leaving the runner.
pub const MAX_DETAIL_CHARS: usize = 500;

/// Lines of child stderr retained on a format error.
const LOG_HEAD_LINES: usize = 6;

/// A sandbox execution failure.
///
/// `detail` and `logs` are redacted before construction; nothing un-scrubbed
/// leaves the runner.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {detail}")]
pub struct SandboxError {
    pub kind: ErrorKind,
    pub detail: String,
    /// Redacted head of child stderr (format errors only).
    pub logs: Option<String>,
}

impl SandboxError {
    pub fn new(kind: ErrorKind, detail: &str) -> Self {
        Self {
            kind,
            detail: redact(detail, MAX_DETAIL_CHARS),
            logs: None,
        }
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "execution cancelled")
    }

    pub fn timeout(limit_ms: u64) -> Self {
        Self::new(
            ErrorKind::Timeout,
            &format!("wall time exceeded {limit_ms}ms"),
        )
    }

    pub fn forbidden(reason: &str) -> Self {
        Self::new(ErrorKind::ForbiddenImport, reason)
    }

    /// Child exited but produced no parseable result; keep a short stderr head.
    pub fn format(detail: &str, stderr: &str) -> Self {
        let mut err = Self::new(ErrorKind::FormatError, detail);
        let logs = summarize_logs(stderr, LOG_HEAD_LINES, MAX_DETAIL_CHARS);
        if !logs.is_empty() {
            err.logs = Some(logs);
        }
        err
    }

    pub fn unknown(detail: &str) -> Self {
        Self::new(ErrorKind::Unknown, detail)
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
