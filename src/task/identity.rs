use std::collections::BTreeMap;

use serde_json::Value;
use sha2::{Digest, Sha256};

const INCLUDE_PARAMS: usize = 3;
const TRUNCATE_PARAMS: usize = 16;
const TRUNCATE_HASH: usize = 10;

/// String form of a parameter value as used in identifiers.
pub fn param_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Stable identifier of a task: `{family}_{summary}_{hash}`.
///
/// `params` are the significant parameters only; their order doesn't matter.
pub fn task_id_str<'a, I>(family: &str, params: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a Value)>,
{
    let params: BTreeMap<&str, String> = params
        .into_iter()
        .map(|(name, value)| (name, param_to_string(value)))
        .collect();

    // Serializing a map of strings can't fail.
    let param_str = serde_json::to_string(&params).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(param_str.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    let summary: String = params
        .values()
        .take(INCLUDE_PARAMS)
        .map(|v| v.chars().take(TRUNCATE_PARAMS).collect::<String>())
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    format!("{}_{}_{}", family, summary, &hash[..TRUNCATE_HASH])
}
