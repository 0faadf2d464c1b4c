//! Pipeline-wide configuration and externally configured parameter values.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::target::TargetKind;

pub const DEFAULT_TARGET_DIR: &str = "./luigi_targets";

/// Prefix of environment variables carrying parameter values:
/// `CAROL_PARAM__<Family>__<param>=<value>`.
pub const PARAM_ENV_PREFIX: &str = "CAROL_PARAM__";

/// Settings of the S3-compatible store backing cloud targets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloudConfig {
    /// S3-compatible endpoint URL (e.g., "http://127.0.0.1:3900").
    pub endpoint_url: Option<String>,
    pub region: Option<String>,
    pub bucket: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

impl CloudConfig {
    /// Build from environment variables. `CAROL_S3_*` take precedence over `AWS_*`.
    pub fn from_env() -> Self {
        Self {
            endpoint_url: std::env::var("CAROL_S3_ENDPOINT")
                .or_else(|_| std::env::var("AWS_ENDPOINT_URL"))
                .ok(),
            region: std::env::var("CAROL_S3_REGION")
                .or_else(|_| std::env::var("AWS_REGION"))
                .ok(),
            bucket: std::env::var("CAROL_S3_BUCKET").ok(),
            access_key_id: std::env::var("CAROL_S3_ACCESS_KEY_ID")
                .or_else(|_| std::env::var("AWS_ACCESS_KEY_ID"))
                .ok(),
            secret_access_key: std::env::var("CAROL_S3_SECRET_ACCESS_KEY")
                .or_else(|_| std::env::var("AWS_SECRET_ACCESS_KEY"))
                .ok(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint_url.is_some()
            && self.access_key_id.is_some()
            && self.secret_access_key.is_some()
            && self.bucket.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Base directory of local targets.
    pub target_dir: PathBuf,
    /// Target used by tasks that don't pick one explicitly.
    pub default_target: TargetKind,
    pub cloud: CloudConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_dir: PathBuf::from(DEFAULT_TARGET_DIR),
            default_target: TargetKind::default(),
            cloud: CloudConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `CAROL_TARGET_DIR`, `CAROL_DEFAULT_TARGET` and the cloud settings.
    /// Unparseable target names are ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self {
            cloud: CloudConfig::from_env(),
            ..Self::default()
        };
        if let Ok(dir) = std::env::var("CAROL_TARGET_DIR") {
            config.target_dir = PathBuf::from(dir);
        }
        if let Ok(name) = std::env::var("CAROL_DEFAULT_TARGET") {
            match name.parse() {
                Ok(kind) => config.default_target = kind,
                Err(e) => log::warn!("Ignoring CAROL_DEFAULT_TARGET: {}", e),
            }
        }
        config
    }

    pub fn with_target_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.target_dir = dir.into();
        self
    }

    pub fn with_default_target(mut self, kind: TargetKind) -> Self {
        self.default_target = kind;
        self
    }

    pub fn with_cloud(mut self, cloud: CloudConfig) -> Self {
        self.cloud = cloud;
        self
    }
}

/// Parameter values supplied from outside the code, keyed by task family and
/// parameter name. Consulted when a parameter is not given explicitly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamConfig {
    sections: BTreeMap<String, BTreeMap<String, Value>>,
}

impl ParamConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Collect `CAROL_PARAM__<Family>__<param>` pairs. Values stay strings and
    /// are converted to the declared kind at binding time.
    pub fn from_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut config = Self::new();
        for (key, value) in vars {
            let Some(rest) = key.strip_prefix(PARAM_ENV_PREFIX) else {
                continue;
            };
            match rest.split_once("__") {
                Some((family, name)) if !family.is_empty() && !name.is_empty() => {
                    config.set(family, name, Value::String(value));
                }
                _ => log::warn!("Ignoring malformed parameter variable '{}'", key),
            }
        }
        config
    }

    /// Parse `{"Family": {"param": value, ...}, ...}`.
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        let sections: BTreeMap<String, BTreeMap<String, Value>> = serde_json::from_str(raw)?;
        Ok(Self { sections })
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let raw = std::fs::read_to_string(path)?;
        Ok(Self::from_json_str(&raw)?)
    }

    pub fn set(&mut self, family: impl Into<String>, name: impl Into<String>, value: Value) {
        self.sections
            .entry(family.into())
            .or_default()
            .insert(name.into(), value);
    }

    pub fn with(mut self, family: impl Into<String>, name: impl Into<String>, value: Value) -> Self {
        self.set(family, name, value);
        self
    }

    pub fn get(&self, family: &str, name: &str) -> Option<&Value> {
        self.sections.get(family).and_then(|section| section.get(name))
    }

    /// Overlay `other` on top of `self`; `other` wins on conflicts.
    pub fn merge(mut self, other: ParamConfig) -> Self {
        for (family, section) in other.sections {
            self.sections.entry(family).or_default().extend(section);
        }
        self
    }
}

mod tests;
