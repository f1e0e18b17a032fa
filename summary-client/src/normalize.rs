//! Lenient reading of a successful `/generate_summary` body.
//!
//! The backend is not trusted to honour the response shape: a wrong-typed
//! field degrades to an empty or stringified value instead of failing the
//! whole invocation.

use helper_core::{AggregatedResult, SourceResult};
use serde_json::Value;

pub fn normalize_summary(body: &Value) -> AggregatedResult {
    AggregatedResult {
        final_summary: final_summary(body.get("final_summary")),
        per_source_results: per_source_results(body.get("per_source_results")),
    }
}

fn final_summary(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

fn per_source_results(value: Option<&Value>) -> Vec<SourceResult> {
    match value {
        Some(Value::Array(items)) => items.iter().map(source_result).collect(),
        _ => Vec::new(),
    }
}

fn source_result(item: &Value) -> SourceResult {
    SourceResult {
        title: string_field(item, "title"),
        url: string_field(item, "url"),
        source: string_field(item, "source"),
    }
}

fn string_field(item: &Value, field: &str) -> Option<String> {
    item.get(field).and_then(Value::as_str).map(str::to_string)
}
