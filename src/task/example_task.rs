//! A small three-stage pipeline used by the demo binary.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::error::BoxError;
use crate::task::{from_fn, kwargs, Dependency, Parameter, TaskDefinition};

/// Produces `rows` numbered rows for `date`.
pub fn extract() -> Arc<TaskDefinition> {
    TaskDefinition::builder("demo.Extract")
        .param("date", Parameter::str().with_description("Partition to extract"))
        .param("rows", Parameter::int().with_default(3))
        .computation(from_fn(|task, _inputs, log| {
            let date = task.param("date").cloned().unwrap_or(Value::Null);
            let rows = task.param("rows").and_then(Value::as_i64).unwrap_or(0);
            log.line(format!("extracting {} rows for {}", rows, date))?;
            let data: Vec<Value> = (1..=rows).map(|i| json!({ "date": date, "value": i })).collect();
            Ok(Value::Array(data))
        }))
        .build()
}

/// Scales every extracted value by `factor`. Takes over `date` and `rows`.
pub fn transform(extract: &Arc<TaskDefinition>) -> Arc<TaskDefinition> {
    TaskDefinition::builder("demo.Transform")
        .param("factor", Parameter::float().with_default(2.0))
        .inherit_list([extract])
        .computation(from_fn(|task, inputs, log| {
            let factor = task.param("factor").and_then(Value::as_f64).unwrap_or(1.0);
            let rows = inputs
                .get(0)
                .and_then(Value::as_array)
                .ok_or_else(|| -> BoxError { "extract output is not a list".into() })?;
            log.line(format!("scaling {} rows by {}", rows.len(), factor))?;
            let scaled: Vec<Value> = rows
                .iter()
                .map(|row| {
                    let value = row["value"].as_f64().unwrap_or(0.0);
                    json!({ "date": row["date"], "value": value * factor })
                })
                .collect();
            Ok(Value::Array(scaled))
        }))
        .build()
}

/// Compares raw and scaled totals. The scaling factor is pinned on the edge,
/// so it is not a parameter of the report.
pub fn report(extract: &Arc<TaskDefinition>, transform: &Arc<TaskDefinition>) -> Arc<TaskDefinition> {
    TaskDefinition::builder("demo.Report")
        .inherit_dict([
            ("raw", Dependency::new(extract)),
            (
                "scaled",
                Dependency::with_fixed(transform, kwargs([("factor", json!(10.0))])),
            ),
        ])
        .computation(from_fn(|task, inputs, log| {
            let total = |name: &str| -> f64 {
                inputs
                    .named(name)
                    .and_then(Value::as_array)
                    .map(|rows| rows.iter().filter_map(|r| r["value"].as_f64()).sum())
                    .unwrap_or(0.0)
            };
            let (raw, scaled) = (total("raw"), total("scaled"));
            log.line(format!("{}: raw total {}, scaled total {}", task, raw, scaled))?;
            Ok(json!({ "raw": raw, "scaled": scaled }))
        }))
        .build()
}
