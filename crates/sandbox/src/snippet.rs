// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The fixed, system-authored programs executed in the child interpreter.
//!
//! Every snippet reads its input from `in.json` in the sandbox working
//! directory and emits one JSON object (the ChartResult wire shape) on
//! stdout.

/// Test-only knob: child snippets sleep this many milliseconds before
/// doing any work. Used by scheduling tests to hold a child open.
pub const DELAY_ENV: &str = "CHARTWORK_SBX_DELAY_MS";

/// Emits a template vega spec for the requested kind.
pub const TEMPLATE_SNIPPET: &str = r#"
import json, os, time
delay = float(os.environ.get('CHARTWORK_SBX_DELAY_MS', '0') or '0')
if delay > 0:
    time.sleep(delay / 1000.0)
cfg = json.loads(open('in.json', 'r', encoding='utf-8').read())
kind = cfg.get('kind', 'bar')
mark = kind if kind in ('bar', 'line') else 'point'
spec = {'mark': mark, 'data': {'values': [{'x': 0, 'y': 1}]}}
out = {
    'language': 'python',
    'library': 'vega',
    'code': '# generated',
    'outputs': [{'type': 'vega', 'mime': 'application/json', 'content': spec}],
}
print(json.dumps(out))
"#;

/// Reads the dataset CSV (when present), takes the first numeric column
/// bounded to `max_rows`, and emits a vega spec built from real data.
pub const GENERATED_SNIPPET: &str = r#"
import json, csv, os, time
delay = float(os.environ.get('CHARTWORK_SBX_DELAY_MS', '0') or '0')
if delay > 0:
    time.sleep(delay / 1000.0)
cfg = json.loads(open('in.json', 'r', encoding='utf-8').read())
kind = cfg.get('kind', 'bar')
dataset_path = cfg.get('csv_path')
max_rows = int(cfg.get('max_rows', 200))

def fallback():
    return [{'x': i, 'y': (i % 5) + 1} for i in range(20)]

values = []
if dataset_path and os.path.exists(dataset_path):
    try:
        with open(dataset_path, 'r', encoding='utf-8') as f:
            rdr = csv.reader(f)
            next(rdr, None)
            sample = []
            for i, row in enumerate(rdr):
                if i >= max_rows:
                    break
                for j, cell in enumerate(row):
                    try:
                        val = float(cell)
                    except Exception:
                        val = None
                    sample.append((j, val))
        col_idx = None
        for j, val in sample:
            if val is not None:
                col_idx = j
                break
        if col_idx is None:
            values = fallback()
        else:
            series = [val for j, val in sample if j == col_idx and val is not None]
            values = [{'x': i, 'y': series[i]} for i in range(min(20, len(series)))] or fallback()
    except Exception:
        values = fallback()
else:
    values = fallback()

mark = kind if kind in ('bar', 'line') else 'point'
spec = {
    '$schema': 'https://vega.github.io/schema/vega-lite/v5.json',
    'mark': mark,
    'data': {'name': 'data'},
    'encoding': {
        'x': {'field': 'x', 'type': 'quantitative'},
        'y': {'field': 'y', 'type': 'quantitative'},
    },
    'datasets': {'data': values},
    'description': 'generated %s chart' % kind,
}
out = {
    'language': 'python',
    'library': 'vega',
    'code': '# generated',
    'outputs': [{'type': 'vega', 'mime': 'application/json', 'content': spec}],
}
print(json.dumps(out))
"#;

/// Runtime import guard plus context bindings prepended to user code.
///
/// The allowlist mirrors [`crate::guard`]; the runtime hook is the second
/// line of defence when static scanning was inconclusive.
const USER_PREAMBLE: &str = r#"
import builtins
_allowed = {'json', 'csv', 'os', 'time', 'math', 'statistics', 'random'}
_orig_import = builtins.__import__
def _guard_import(name, *args, **kwargs):
    root = (name or '').split('.')[0]
    if root not in _allowed:
        raise ImportError('disallowed module: %s' % root)
    return _orig_import(name, *args, **kwargs)
builtins.__import__ = _guard_import

import json
cfg = json.loads(open('in.json', 'r', encoding='utf-8').read())
dataset_path = cfg.get('csv_path')
"#;

/// Wrap a user snippet with the runtime guard and `dataset_path` binding.
pub fn user_harness(code: &str) -> String {
    format!("{USER_PREAMBLE}\n{code}\n")
}

#[cfg(test)]
#[path = "snippet_tests.rs"]
mod tests;
