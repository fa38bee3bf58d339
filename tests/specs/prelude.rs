// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for the behavioral specs.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use cw_engine::{ChartEngine, EngineConfig};
use std::path::Path;
use std::time::{Duration, Instant};

/// Polling cadence for spec-level waits.
pub const POLL_MS: u64 = 10;

/// Generous ceiling for any single wait; specs fail loudly past this.
pub const WAIT_MAX: Duration = Duration::from_secs(10);

/// True when a child interpreter is available. Subprocess specs skip
/// (with a note on stderr) when it is not.
pub fn have_python() -> bool {
    let ok = cw_sandbox::runner::interpreter_available(Path::new("python3"));
    if !ok {
        eprintln!("skipping: python3 not available");
    }
    ok
}

/// Poll `probe` until it yields, panicking after [`WAIT_MAX`].
pub fn wait_until<T>(probe: impl Fn() -> Option<T>) -> T {
    let deadline = Instant::now() + WAIT_MAX;
    loop {
        if let Some(value) = probe() {
            return value;
        }
        assert!(Instant::now() < deadline, "condition not met in {WAIT_MAX:?}");
        std::thread::sleep(Duration::from_millis(POLL_MS));
    }
}

/// A synchronous engine over a private data root.
pub fn sync_engine(dir: &tempfile::TempDir) -> ChartEngine {
    ChartEngine::new(EngineConfig {
        data_root: dir.path().to_path_buf(),
        ..EngineConfig::default()
    })
}

/// An asynchronous engine with `workers` pool threads.
pub fn async_engine(dir: &tempfile::TempDir, workers: u32) -> ChartEngine {
    ChartEngine::new(EngineConfig {
        data_root: dir.path().to_path_buf(),
        async_mode: true,
        workers,
        ..EngineConfig::default()
    })
}
