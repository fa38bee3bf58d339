// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One-shot synchronous render.

use cw_core::{ChartKind, ChartRequest};
use cw_engine::{ChartEngine, EngineConfig};
use std::process::ExitCode;

pub fn run(dataset: &str, hint: &str) -> anyhow::Result<ExitCode> {
    let config = EngineConfig {
        async_mode: false,
        ..EngineConfig::from_env()
    };
    let engine = ChartEngine::new(config);

    let request = ChartRequest::new(dataset, ChartKind::parse_lossy(Some(hint)));
    let snapshot = engine.generate(request);
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    Ok(if snapshot.status == cw_core::JobState::Succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}
