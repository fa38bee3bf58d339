// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn event_flattens_props_into_top_level() {
    let event = MetricEvent::new("ChartJobFinished", 1000)
        .with_duration_ms(42)
        .with_status("succeeded")
        .with_prop("dataset_id", json!("ds1"));

    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["event_name"], "ChartJobFinished");
    assert_eq!(value["duration_ms"], 42);
    assert_eq!(value["status"], "succeeded");
    assert_eq!(value["dataset_id"], "ds1");
    assert!(value.get("groundedness").is_none());
}

#[test]
fn event_round_trips_through_jsonl_line() {
    let event = MetricEvent::new("EDAReportGenerated", 2000)
        .with_duration_ms(120)
        .with_groundedness(0.92)
        .with_error_code("timeout");

    let line = serde_json::to_string(&event).unwrap();
    assert!(!line.contains('\n'));
    let back: MetricEvent = serde_json::from_str(&line).unwrap();
    assert_eq!(back, event);
}

#[test]
fn unknown_fields_land_in_props() {
    let line = r#"{"event_name":"ChartJobFinished","ts_ms":5,"hint":"bar","total":3}"#;
    let event: MetricEvent = serde_json::from_str(line).unwrap();
    assert_eq!(event.props["hint"], "bar");
    assert_eq!(event.props["total"], 3);
}
