// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! List saved charts from the data root.

use cw_core::DatasetId;
use cw_engine::{ChartEngine, EngineConfig};
use std::process::ExitCode;

pub fn run(dataset: Option<&str>) -> anyhow::Result<ExitCode> {
    let engine = ChartEngine::new(EngineConfig {
        async_mode: false,
        ..EngineConfig::from_env()
    });
    let filter = dataset.map(DatasetId::new);
    let items = engine.list_saved(filter.as_ref());
    println!("{}", serde_json::to_string_pretty(&items)?);
    Ok(ExitCode::SUCCESS)
}
