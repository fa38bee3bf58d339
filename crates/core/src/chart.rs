// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Chart artifacts: execution results and user-saved charts.

use crate::id::{DatasetId, SavedChartId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of a single rendered output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    /// SVG text, `image/svg+xml`.
    Image,
    /// Vega-Lite v5 specification with data inlined, `application/json`.
    Vega,
}

/// Output payload: SVG text for images, a spec object for vega.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutputContent {
    Text(String),
    Spec(Value),
}

/// One rendered output of a chart job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartOutput {
    #[serde(rename = "type")]
    pub kind: OutputKind,
    pub mime: String,
    pub content: OutputContent,
}

impl ChartOutput {
    pub fn image(svg: impl Into<String>) -> Self {
        Self {
            kind: OutputKind::Image,
            mime: "image/svg+xml".to_string(),
            content: OutputContent::Text(svg.into()),
        }
    }

    pub fn vega(spec: Value) -> Self {
        Self {
            kind: OutputKind::Vega,
            mime: "application/json".to_string(),
            content: OutputContent::Spec(spec),
        }
    }
}

/// Result of a chart execution.
///
/// Runner-produced results always carry at least one output; the facade's
/// "user code skipped" result is the one sanctioned empty-outputs case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartResult {
    pub language: String,
    pub library: String,
    /// The snippet that produced the outputs, redacted of secrets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub outputs: Vec<ChartOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Map<String, Value>>,
}

impl ChartResult {
    /// Insert a meta entry, creating the map on first use.
    pub fn meta_insert(&mut self, key: impl Into<String>, value: Value) {
        self.meta
            .get_or_insert_with(serde_json::Map::new)
            .insert(key.into(), value);
    }
}

/// Exactly one of an SVG string or a vega specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SavedContent {
    Svg { svg: String },
    Vega { vega: Value },
}

/// A user-saved chart artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedChart {
    pub id: SavedChartId,
    pub dataset_id: DatasetId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(flatten)]
    pub content: SavedContent,
    /// RFC3339 creation timestamp.
    pub created_at: String,
}

#[cfg(test)]
#[path = "chart_tests.rs"]
mod tests;
