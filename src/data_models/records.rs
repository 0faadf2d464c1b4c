use std::cmp::Ordering;
use std::collections::HashMap;

use serde_json::{Map, Value};

/// One exported row, column name to value.
pub type Record = Map<String, Value>;

pub const MDM_ID: &str = "mdmId";
pub const MDM_COUNTER: &str = "mdmCounterForEntity";

/// Bookkeeping columns present in every exported row.
pub const METADATA_COLUMNS: [&str; 3] = ["mdmId", "mdmCounterForEntity", "mdmLastUpdated"];

fn counter(record: &Record) -> Option<f64> {
    record.get(MDM_COUNTER).and_then(Value::as_f64)
}

fn compare_counters(a: &Record, b: &Record) -> Ordering {
    match (counter(a), counter(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Keep, for every `mdmId`, only the row with the highest
/// `mdmCounterForEntity`. Rows come back ordered by counter; rows without an
/// id are kept as they are.
pub fn merge_records(mut records: Vec<Record>) -> Vec<Record> {
    records.sort_by(compare_counters);

    let mut last_seen: HashMap<String, usize> = HashMap::new();
    for (idx, record) in records.iter().enumerate() {
        if let Some(id) = record.get(MDM_ID) {
            let key = match id {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            last_seen.insert(key, idx);
        }
    }

    records
        .into_iter()
        .enumerate()
        .filter(|(idx, record)| match record.get(MDM_ID) {
            Some(Value::String(s)) => last_seen.get(s) == Some(idx),
            Some(other) => last_seen.get(&other.to_string()) == Some(idx),
            None => true,
        })
        .map(|(_, record)| record)
        .collect()
}

pub(crate) fn drop_metadata(records: &mut [Record]) {
    for record in records {
        for column in METADATA_COLUMNS {
            record.remove(column);
        }
    }
}
