use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::ParamConfig;
use crate::error::ParamError;

/// Keyword arguments of a task invocation.
pub type Kwargs = Map<String, Value>;

/// Build [`Kwargs`] from name/value pairs.
pub fn kwargs<I, K>(pairs: I) -> Kwargs
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Str,
    Int,
    Float,
    Bool,
    /// Ordered sequence.
    List,
    /// Sorted, duplicate-free sequence.
    Set,
    /// Any JSON value.
    Json,
}

/// How unknown keyword arguments are treated while binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Binding {
    /// Unknown keywords are an error.
    #[default]
    Strict,
    /// Unknown keywords are dropped silently.
    Relaxed,
}

/// A declared task parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub kind: ParamKind,
    pub default: Option<Value>,
    /// Participates in the task identifier.
    pub significant: bool,
    /// Can be bound from positional arguments.
    pub positional: bool,
    pub description: Option<String>,
}

impl Parameter {
    pub fn new(kind: ParamKind) -> Self {
        Self {
            kind,
            default: None,
            significant: true,
            positional: true,
            description: None,
        }
    }

    pub fn str() -> Self {
        Self::new(ParamKind::Str)
    }

    pub fn int() -> Self {
        Self::new(ParamKind::Int)
    }

    pub fn float() -> Self {
        Self::new(ParamKind::Float)
    }

    pub fn bool() -> Self {
        Self::new(ParamKind::Bool)
    }

    pub fn list() -> Self {
        Self::new(ParamKind::List)
    }

    pub fn set() -> Self {
        Self::new(ParamKind::Set)
    }

    pub fn json() -> Self {
        Self::new(ParamKind::Json)
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn insignificant(mut self) -> Self {
        self.significant = false;
        self
    }

    pub fn keyword_only(mut self) -> Self {
        self.positional = false;
        self
    }

    pub fn with_description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Coerce `value` to this parameter's kind. Strings are parsed, since
    /// externally configured values arrive as text. `null` is kept for every
    /// kind and marks an optional parameter left unset.
    pub fn normalize(&self, value: Value) -> Result<Value, String> {
        match (self.kind, value) {
            (_, Value::Null) => Ok(Value::Null),

            (ParamKind::Json, Value::String(s)) => {
                Ok(serde_json::from_str(&s).unwrap_or(Value::String(s)))
            }
            (ParamKind::Json, v) => Ok(v),

            (ParamKind::Str, Value::String(s)) => Ok(Value::String(s)),
            (ParamKind::Str, v @ (Value::Number(_) | Value::Bool(_))) => {
                Ok(Value::String(v.to_string()))
            }

            (ParamKind::Int, Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(Value::Number(n)),
            (ParamKind::Int, Value::Number(n)) => n
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| Value::from(f as i64))
                .ok_or_else(|| format!("{} is not an integer", n)),
            (ParamKind::Int, Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| format!("'{}' is not an integer", s)),

            // Stored as f64 whatever the spelling, so 2, 2.0 and "2" share an identity.
            (ParamKind::Float, Value::Number(n)) => n
                .as_f64()
                .and_then(float_value)
                .ok_or_else(|| format!("{} is not a float", n)),
            (ParamKind::Float, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(float_value)
                .ok_or_else(|| format!("'{}' is not a float", s)),

            (ParamKind::Bool, Value::Bool(b)) => Ok(Value::Bool(b)),
            (ParamKind::Bool, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(format!("'{}' is not a boolean", s)),
            },

            (ParamKind::List, Value::Array(items)) => Ok(Value::Array(items)),
            (ParamKind::Set, Value::Array(items)) => Ok(Value::Array(sorted_unique(items))),
            (kind @ (ParamKind::List | ParamKind::Set), Value::String(s)) => {
                match serde_json::from_str::<Value>(&s) {
                    Ok(parsed @ Value::Array(_)) => Parameter::new(kind).normalize(parsed),
                    _ => Err(format!("'{}' is not a JSON array", s)),
                }
            }

            (kind, v) => Err(format!("{} doesn't fit a {:?} parameter", v, kind)),
        }
    }
}

fn float_value(f: f64) -> Option<Value> {
    serde_json::Number::from_f64(f).map(Value::Number)
}

fn sorted_unique(items: Vec<Value>) -> Vec<Value> {
    let keyed: BTreeMap<String, Value> = items
        .into_iter()
        .map(|v| (v.to_string(), v))
        .collect();
    keyed.into_values().collect()
}

fn invocation(family: &str, args: &[Value], kwargs: &Kwargs) -> String {
    format!(
        "{}[args={}, kwargs={}]",
        family,
        Value::Array(args.to_vec()),
        Value::Object(kwargs.clone())
    )
}

/// Bind positional and keyword arguments to `params`.
///
/// Returns one `(name, value)` pair per declared parameter, in declaration
/// order. Unbound parameters take the externally configured value, then the
/// declared default.
pub fn get_param_values(
    family: &str,
    params: &[(String, Parameter)],
    args: &[Value],
    kwargs: &Kwargs,
    config: &ParamConfig,
    binding: Binding,
) -> Result<Vec<(String, Value)>, ParamError> {
    let mut result: BTreeMap<&str, Value> = BTreeMap::new();
    let invalid = |name: &str, reason: String| {
        ParamError::InvalidValue(format!(
            "{}: invalid value for '{}': {}",
            invocation(family, args, kwargs),
            name,
            reason
        ))
    };

    let positional: Vec<&(String, Parameter)> = params.iter().filter(|(_, p)| p.positional).collect();
    if args.len() > positional.len() {
        return Err(ParamError::UnknownParameter(format!(
            "{}: takes at most {} parameters ({} given)",
            invocation(family, args, kwargs),
            positional.len(),
            args.len()
        )));
    }
    for ((name, param), arg) in positional.into_iter().zip(args) {
        let value = param.normalize(arg.clone()).map_err(|e| invalid(name, e))?;
        result.insert(name.as_str(), value);
    }

    for (name, arg) in kwargs {
        if result.contains_key(name.as_str()) {
            return Err(ParamError::DuplicateParameter(format!(
                "{}: parameter {} was already set as a positional parameter",
                invocation(family, args, kwargs),
                name
            )));
        }
        let Some((declared, param)) = params.iter().find(|(n, _)| n == name) else {
            match binding {
                Binding::Strict => {
                    return Err(ParamError::UnknownParameter(format!(
                        "{}: unknown parameter {}",
                        invocation(family, args, kwargs),
                        name
                    )))
                }
                Binding::Relaxed => continue,
            }
        };
        let value = param.normalize(arg.clone()).map_err(|e| invalid(name, e))?;
        result.insert(declared.as_str(), value);
    }

    for (name, param) in params {
        if result.contains_key(name.as_str()) {
            continue;
        }
        let fallback = config
            .get(family, name)
            .or(param.default.as_ref())
            .cloned()
            .ok_or_else(|| {
                ParamError::MissingParameter(format!(
                    "{}: requires the '{}' parameter to be set",
                    invocation(family, args, kwargs),
                    name
                ))
            })?;
        let value = param.normalize(fallback).map_err(|e| invalid(name, e))?;
        result.insert(name.as_str(), value);
    }

    Ok(params
        .iter()
        .filter_map(|(name, _)| result.remove(name.as_str()).map(|v| (name.clone(), v)))
        .collect())
}
