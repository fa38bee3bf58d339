// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Synchronous template rendering.

use crate::prelude::*;
use cw_core::{ChartKind, ChartRequest, JobState, OutputContent};

#[test]
fn template_success_synchronous_mode() {
    let dir = tempfile::tempdir().unwrap();
    let engine = sync_engine(&dir);

    let snap = engine.generate(ChartRequest::new("ds_sync", ChartKind::Bar));
    assert_eq!(snap.status, JobState::Succeeded);

    let result = snap.result.unwrap();
    assert_eq!(result.outputs.len(), 2);
    assert_eq!(result.outputs[0].mime, "image/svg+xml");
    assert_eq!(result.outputs[1].mime, "application/json");
    let OutputContent::Spec(spec) = &result.outputs[1].content else {
        panic!("vega output must be a spec object");
    };
    assert_eq!(spec["mark"], "bar");

    // A ChartJobFinished event with a duration is emitted.
    let events = engine.metrics().load_log();
    let finished: Vec<_> = events
        .iter()
        .filter(|e| e.event_name == "ChartJobFinished")
        .collect();
    assert_eq!(finished.len(), 1);
    assert!(finished[0].duration_ms.is_some());
    assert_eq!(finished[0].status.as_deref(), Some("succeeded"));
}

#[test]
fn every_hint_renders_its_own_mark() {
    let dir = tempfile::tempdir().unwrap();
    let engine = sync_engine(&dir);

    for (hint, mark) in [
        (ChartKind::Bar, "bar"),
        (ChartKind::Line, "line"),
        (ChartKind::Scatter, "point"),
    ] {
        let snap = engine.generate(ChartRequest::new("ds_sync", hint));
        let result = snap.result.unwrap();
        let OutputContent::Spec(spec) = &result.outputs[1].content else {
            panic!("vega output must be a spec object");
        };
        assert_eq!(spec["mark"], mark, "hint {hint}");
    }
}

#[test]
fn job_error_strings_never_leak_secrets() {
    // Taxonomy closure + redaction over a failing job.
    let dir = tempfile::tempdir().unwrap();
    let engine = cw_engine::ChartEngine::new(cw_engine::EngineConfig {
        data_root: dir.path().to_path_buf(),
        execute_user_code: true,
        ..cw_engine::EngineConfig::default()
    });

    let code = "import requests # token=supersecretvalue123\nprint(1)";
    let snap = engine.generate(
        ChartRequest::new("ds_sync", ChartKind::Bar).with_code(code),
    );
    assert_eq!(snap.status, JobState::Failed);
    assert_eq!(snap.error_code.as_deref(), Some("forbidden_import"));
    let text = format!(
        "{} {}",
        snap.error.unwrap_or_default(),
        snap.error_detail.unwrap_or_default()
    );
    assert!(!text.contains("supersecretvalue123"));
}
