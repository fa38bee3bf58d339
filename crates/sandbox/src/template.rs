// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in chart templates: static SVG previews plus a Vega-Lite v5
//! specification with sample data inlined.

use cw_core::{ChartKind, ChartOutput, ChartResult, DatasetId};
use serde_json::{json, Value};

/// Sample series inlined into template vega specs.
const SAMPLE_SERIES: [i64; 5] = [1, 3, 2, 5, 4];

fn svg_bar(title: &str) -> String {
    let bars: String = [20, 60, 100, 50, 80]
        .iter()
        .enumerate()
        .map(|(i, h)| {
            format!(
                r##"<rect x="{}" y="{}" width="20" height="{}" fill="#60a5fa" />"##,
                20 + i * 30,
                100 - h,
                h
            )
        })
        .collect();
    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="360" height="120" viewBox="0 0 360 120"><text x="10" y="16" font-size="12" fill="#0f172a">{title}</text><line x1="10" y1="100" x2="350" y2="100" stroke="#94a3b8" stroke-width="1" />{bars}</svg>"##
    )
}

fn svg_line(title: &str) -> String {
    let points = [
        (20, 90),
        (60, 60),
        (100, 70),
        (140, 40),
        (180, 55),
        (220, 30),
        (260, 35),
        (300, 25),
    ];
    let path_d = format!(
        "M {}",
        points
            .iter()
            .map(|(x, y)| format!("{x} {y}"))
            .collect::<Vec<_>>()
            .join(" L ")
    );
    let circles: String = points
        .iter()
        .map(|(x, y)| format!(r##"<circle cx="{x}" cy="{y}" r="3" fill="#34d399" />"##))
        .collect();
    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="360" height="120" viewBox="0 0 360 120"><text x="10" y="16" font-size="12" fill="#0f172a">{title}</text><path d="{path_d}" fill="none" stroke="#34d399" stroke-width="2" />{circles}</svg>"##
    )
}

fn svg_scatter(title: &str) -> String {
    let pts = [
        (20, 80),
        (50, 60),
        (80, 70),
        (110, 40),
        (140, 55),
        (170, 65),
        (200, 45),
        (230, 35),
        (260, 75),
    ];
    let circles: String = pts
        .iter()
        .map(|(x, y)| format!(r##"<circle cx="{x}" cy="{y}" r="3" fill="#f97316" />"##))
        .collect();
    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="360" height="120" viewBox="0 0 360 120"><text x="10" y="16" font-size="12" fill="#0f172a">{title}</text>{circles}</svg>"##
    )
}

/// Minimal Vega-Lite v5 spec for a template chart, sample data inlined
/// under `datasets.data`.
pub fn vega_spec(kind: ChartKind) -> Value {
    let data: Vec<Value> = SAMPLE_SERIES
        .iter()
        .enumerate()
        .map(|(i, v)| json!({"x": i, "y": v}))
        .collect();
    json!({
        "$schema": "https://vega.github.io/schema/vega-lite/v5.json",
        "mark": kind.mark(),
        "data": {"name": "data"},
        "encoding": {
            "x": {"field": "x", "type": "quantitative"},
            "y": {"field": "y", "type": "quantitative"},
        },
        "datasets": {"data": data},
        "description": format!("template {kind} chart"),
    })
}

/// Render the built-in template for `kind`: one SVG output plus the vega
/// spec, with provenance in `meta`.
pub fn template_result(kind: ChartKind, dataset_id: Option<&DatasetId>) -> ChartResult {
    let svg = match kind {
        ChartKind::Bar => svg_bar("Bar (template)"),
        ChartKind::Line => svg_line("Line (template)"),
        ChartKind::Scatter => svg_scatter("Scatter (template)"),
    };
    let code = format!(
        "# template-only preview\nimport json\nspec = {{ 'mark': '{}', 'data': {{'values': [{{'x':0,'y':1}}]}}}}\nprint(json.dumps(spec))\n",
        kind.mark()
    );
    let mut result = ChartResult {
        language: "python".to_string(),
        library: "vega".to_string(),
        code: Some(code),
        seed: Some(42),
        outputs: vec![ChartOutput::image(svg), ChartOutput::vega(vega_spec(kind))],
        meta: None,
    };
    result.meta_insert("engine", json!("template"));
    result.meta_insert("hint", json!(kind.as_str()));
    if let Some(id) = dataset_id {
        result.meta_insert("dataset_id", json!(id.as_str()));
    }
    result
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
