//! Generic field extraction over raw scrape payloads.
//!
//! Every platform mapping is an ordered list of fallback field paths
//! evaluated by the two routines here; there is no per-platform access
//! code. Missing or mistyped nested fields resolve to nothing, never an
//! error: shape problems in scraped JSON are absorbed at this layer.

use serde_json::Value;

/// Walk a field path through nested JSON. Arrays encountered along the way
/// are entered at their first element, since scraped payloads routinely wrap a
/// single object in a list.
pub fn value_at<'a>(v: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut cur = v;
    for seg in path {
        while let Some(arr) = cur.as_array() {
            cur = arr.first()?;
        }
        cur = cur.as_object()?.get(*seg)?;
    }
    if cur.is_null() {
        None
    } else {
        Some(cur)
    }
}

/// A single trimmed, non-empty string at `path`. Numbers and booleans
/// coerce to their string form (scrapers are inconsistent about e.g.
/// employee counts arriving as numbers).
pub fn string_at(v: &Value, path: &[&str]) -> Option<String> {
    scalar_string(value_at(v, path)?)
}

/// First chain in `chains` that yields a value: the ordered fallback
/// evaluation (prefer a structured/derived field, else a flat scraped
/// field).
pub fn first_string(v: &Value, chains: &[&[&str]]) -> Option<String> {
    chains.iter().find_map(|path| string_at(v, path))
}

/// Every string reachable at `path`, iterating all arrays along the way.
/// Accepts both scalar fields and string lists; entries are trimmed and
/// empties dropped.
pub fn collect_strings(v: &Value, path: &[&str]) -> Vec<String> {
    let mut out = Vec::new();
    collect_inner(v, path, &mut out);
    out
}

fn collect_inner(v: &Value, path: &[&str], out: &mut Vec<String>) {
    if let Some(arr) = v.as_array() {
        for item in arr {
            collect_inner(item, path, out);
        }
        return;
    }
    match path.split_first() {
        None => {
            if let Some(s) = scalar_string(v) {
                out.push(s);
            }
        }
        Some((head, rest)) => {
            if let Some(next) = v.as_object().and_then(|o| o.get(*head)) {
                collect_inner(next, rest, out);
            }
        }
    }
}

fn scalar_string(v: &Value) -> Option<String> {
    let s = match v {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
