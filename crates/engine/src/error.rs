// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine facade

use cw_storage::StorageError;
use thiserror::Error;

/// Errors that can surface from engine operations.
///
/// Queue operations and cancellation never fail; only saved-chart
/// persistence reports errors to callers.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
