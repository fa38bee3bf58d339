// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User-code execution: allowlist rejection, format errors, skipping.

use crate::prelude::*;
use cw_core::{ChartKind, ChartRequest, JobState};
use cw_engine::{ChartEngine, EngineConfig};

fn exec_engine(dir: &tempfile::TempDir) -> ChartEngine {
    ChartEngine::new(EngineConfig {
        data_root: dir.path().to_path_buf(),
        execute_user_code: true,
        ..EngineConfig::default()
    })
}

#[test]
fn forbidden_import_fails_with_its_taxonomy_code() {
    let dir = tempfile::tempdir().unwrap();
    let engine = exec_engine(&dir);

    let snap = engine.generate(
        ChartRequest::new("ds_u", ChartKind::Bar).with_code("import socket\nprint({})"),
    );
    assert_eq!(snap.status, JobState::Failed);
    assert_eq!(snap.error_code.as_deref(), Some("forbidden_import"));
}

#[test]
fn silent_child_is_a_format_error_with_redacted_detail() {
    if !have_python() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let engine = exec_engine(&dir);

    // Valid python that exits before printing any JSON.
    let snap = engine.generate(ChartRequest::new("ds_u", ChartKind::Bar).with_code("x = 1"));
    assert_eq!(snap.status, JobState::Failed);
    assert_eq!(snap.error_code.as_deref(), Some("format_error"));
    let detail = snap.error_detail.unwrap();
    assert!(!detail.is_empty());
    assert!(detail.len() <= 500);
}

#[test]
fn crashing_child_keeps_the_final_stderr_line() {
    if !have_python() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let engine = exec_engine(&dir);

    let snap = engine.generate(
        ChartRequest::new("ds_u", ChartKind::Bar).with_code("raise RuntimeError('exploded')"),
    );
    assert_eq!(snap.status, JobState::Failed);
    assert_eq!(snap.error_code.as_deref(), Some("format_error"));
    assert!(snap.error_detail.unwrap().contains("RuntimeError"));
}

#[test]
fn working_user_code_succeeds_end_to_end() {
    if !have_python() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let engine = exec_engine(&dir);

    let code = r#"
import json
out = {
    'language': 'python',
    'library': 'vega',
    'outputs': [{'type': 'vega', 'mime': 'application/json', 'content': {'mark': 'bar'}}],
}
print(json.dumps(out))
"#;
    let snap = engine.generate(ChartRequest::new("ds_u", ChartKind::Bar).with_code(code));
    assert_eq!(snap.status, JobState::Succeeded);
    assert_eq!(snap.result.unwrap().outputs.len(), 1);
}

#[test]
fn empty_code_is_skipped_not_failed() {
    let dir = tempfile::tempdir().unwrap();
    let engine = exec_engine(&dir);

    let snap = engine.generate(ChartRequest::new("ds_u", ChartKind::Bar).with_code(""));
    assert_eq!(snap.status, JobState::Succeeded);
    assert!(snap.error_code.is_none());
    assert!(snap.result.unwrap().outputs.is_empty());
}

#[test]
fn error_taxonomy_is_closed() {
    // Every failed job carries one of the five canonical codes.
    let dir = tempfile::tempdir().unwrap();
    let engine = exec_engine(&dir);
    let canonical = [
        "timeout",
        "cancelled",
        "forbidden_import",
        "format_error",
        "unknown",
    ];

    let snippets = ["import socket", "eval('1')", "open('/etc/passwd')"];
    for code in snippets {
        let snap = engine.generate(ChartRequest::new("ds_u", ChartKind::Bar).with_code(code));
        assert_eq!(snap.status, JobState::Failed);
        let code = snap.error_code.unwrap();
        assert!(canonical.contains(&code.as_str()), "unexpected code {code}");
    }
}
