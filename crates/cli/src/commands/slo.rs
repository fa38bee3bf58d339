// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Offline SLO checker: replay an event log, evaluate thresholds, exit
//! non-zero on any violation.

use anyhow::Context;
use cw_engine::EngineConfig;
use cw_metrics::{Metrics, Violations};
use cw_storage::DataRoot;
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;

pub fn run(log: Option<PathBuf>, output: Option<PathBuf>) -> anyhow::Result<ExitCode> {
    let config = EngineConfig::from_env();
    let log_path = log
        .or(config.metrics_log.clone())
        .unwrap_or_else(|| DataRoot::new(&config.data_root).metrics_log_file());

    let metrics = Metrics::new(&log_path);
    let events = metrics.load_log();
    metrics.bootstrap_from_events(events);
    let violations = metrics.detect_violations(&config.slo_thresholds);

    let report = json!({
        "slo_thresholds": config.slo_thresholds,
        "snapshot": metrics.snapshot(),
        "violations": violations,
        "event_log": log_path.display().to_string(),
    });
    let rendered = serde_json::to_string_pretty(&report)?;
    println!("{rendered}");

    if let Some(destination) = output {
        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        std::fs::write(&destination, &rendered)
            .with_context(|| format!("writing {}", destination.display()))?;
    }

    let breached = violations.values().any(Violations::any);
    Ok(if breached {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    })
}
