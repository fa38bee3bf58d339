// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Saved-chart store behaviour through the facade.

use crate::prelude::*;
use cw_core::{DatasetId, SavedContent};
use serde_json::json;

#[test]
fn saved_charts_stay_capped_and_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    let engine = sync_engine(&dir);

    let mut last_id = None;
    for i in 0..210 {
        let saved = engine
            .save_chart(
                DatasetId::new("ds1"),
                Some(format!("chart {i}")),
                None,
                SavedContent::Vega {
                    vega: json!({"mark": "bar", "n": i}),
                },
            )
            .unwrap();
        last_id = Some(saved.id);
    }

    let items = engine.list_saved(None);
    assert_eq!(items.len(), 200);
    assert_eq!(Some(items[0].id.clone()), last_id);
    assert_eq!(items[0].title.as_deref(), Some("chart 209"));
}

#[test]
fn delete_then_list_reflects_removal() {
    let dir = tempfile::tempdir().unwrap();
    let engine = sync_engine(&dir);

    let saved = engine
        .save_chart(
            DatasetId::new("ds1"),
            None,
            Some("line".to_string()),
            SavedContent::Svg {
                svg: "<svg/>".to_string(),
            },
        )
        .unwrap();

    assert!(engine.delete_saved(&saved.id).unwrap());
    assert!(!engine.delete_saved(&saved.id).unwrap());
    assert!(engine.list_saved(None).is_empty());
}
