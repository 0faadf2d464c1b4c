//! Output targets: where a task's result is persisted and how it's encoded.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TargetError;
use crate::storage::ObjectStore;

/// Capability set every output target provides.
#[async_trait]
pub trait Target: Send + Sync {
    /// Key of the main output inside its store.
    fn key(&self) -> &str;

    /// Whether the output lives in a remote store.
    fn is_cloud_target(&self) -> bool;

    async fn exists(&self) -> Result<bool, TargetError>;

    async fn load(&self) -> Result<Value, TargetError>;

    async fn dump(&self, value: &Value) -> Result<(), TargetError>;

    async fn remove(&self) -> Result<(), TargetError>;

    /// Upload a local log file next to the output.
    async fn persist_log(&self, local_path: &Path) -> Result<(), TargetError>;

    /// Text of a previously persisted log, if any.
    async fn load_log(&self) -> Result<Option<String>, TargetError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Local,
    Cloud,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Json,
    Cbor,
}

impl Format {
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Cbor => "cbor",
        }
    }

    fn encode(&self, key: &str, value: &Value) -> Result<Bytes, TargetError> {
        let encode_err = |reason: String| TargetError::Encode {
            key: key.to_string(),
            reason,
        };
        match self {
            Format::Json => serde_json::to_vec(value)
                .map(Bytes::from)
                .map_err(|e| encode_err(e.to_string())),
            Format::Cbor => {
                let mut buf = Vec::new();
                ciborium::into_writer(value, &mut buf).map_err(|e| encode_err(e.to_string()))?;
                Ok(Bytes::from(buf))
            }
        }
    }

    fn decode(&self, key: &str, data: &[u8]) -> Result<Value, TargetError> {
        let decode_err = |reason: String| TargetError::Decode {
            key: key.to_string(),
            reason,
        };
        match self {
            Format::Json => serde_json::from_slice(data).map_err(|e| decode_err(e.to_string())),
            Format::Cbor => ciborium::from_reader(data).map_err(|e| decode_err(e.to_string())),
        }
    }
}

/// Which target a task writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetKind {
    Store { backend: Backend, format: Format },
    /// Persists nothing and is never complete.
    Dummy,
}

impl TargetKind {
    pub const LOCAL_JSON: TargetKind = TargetKind::Store {
        backend: Backend::Local,
        format: Format::Json,
    };
    pub const LOCAL_CBOR: TargetKind = TargetKind::Store {
        backend: Backend::Local,
        format: Format::Cbor,
    };
    pub const CLOUD_JSON: TargetKind = TargetKind::Store {
        backend: Backend::Cloud,
        format: Format::Json,
    };
    pub const CLOUD_CBOR: TargetKind = TargetKind::Store {
        backend: Backend::Cloud,
        format: Format::Cbor,
    };
}

impl Default for TargetKind {
    fn default() -> Self {
        TargetKind::LOCAL_CBOR
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::Dummy => write!(f, "dummy"),
            TargetKind::Store { backend, format } => {
                let backend = match backend {
                    Backend::Local => "local",
                    Backend::Cloud => "cloud",
                };
                write!(f, "{}-{}", backend, format.extension())
            }
        }
    }
}

impl FromStr for TargetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dummy" => Ok(TargetKind::Dummy),
            "local-json" => Ok(TargetKind::LOCAL_JSON),
            "local-cbor" => Ok(TargetKind::LOCAL_CBOR),
            "cloud-json" => Ok(TargetKind::CLOUD_JSON),
            "cloud-cbor" => Ok(TargetKind::CLOUD_CBOR),
            other => Err(format!("unknown target kind '{}'", other)),
        }
    }
}

/// Output stored in an [`ObjectStore`] under `<family>/<task_id>.<ext>`.
pub struct StoreTarget {
    store: Arc<dyn ObjectStore>,
    key: String,
    log_key: String,
    format: Format,
}

impl StoreTarget {
    pub fn new(store: Arc<dyn ObjectStore>, family: &str, task_id: &str, format: Format) -> Self {
        Self {
            store,
            key: format!("{}/{}.{}", family, task_id, format.extension()),
            log_key: format!("{}/{}.log", family, task_id),
            format,
        }
    }

    pub fn log_key(&self) -> &str {
        &self.log_key
    }
}

#[async_trait]
impl Target for StoreTarget {
    fn key(&self) -> &str {
        &self.key
    }

    fn is_cloud_target(&self) -> bool {
        self.store.is_remote()
    }

    async fn exists(&self) -> Result<bool, TargetError> {
        Ok(self.store.exists(&self.key).await?)
    }

    async fn load(&self) -> Result<Value, TargetError> {
        let data = self.store.get(&self.key).await?;
        self.format.decode(&self.key, &data)
    }

    async fn dump(&self, value: &Value) -> Result<(), TargetError> {
        let data = self.format.encode(&self.key, value)?;
        self.store.put(&self.key, data).await?;
        Ok(())
    }

    async fn remove(&self) -> Result<(), TargetError> {
        self.store.delete(&self.key).await?;
        Ok(())
    }

    async fn persist_log(&self, local_path: &Path) -> Result<(), TargetError> {
        let data = tokio::fs::read(local_path).await?;
        self.store.put(&self.log_key, Bytes::from(data)).await?;
        Ok(())
    }

    async fn load_log(&self) -> Result<Option<String>, TargetError> {
        Ok(self
            .store
            .get_opt(&self.log_key)
            .await?
            .map(|data| String::from_utf8_lossy(&data).into_owned()))
    }
}

pub struct DummyTarget {
    key: String,
}

impl DummyTarget {
    pub fn new(task_id: &str) -> Self {
        Self {
            key: task_id.to_string(),
        }
    }
}

#[async_trait]
impl Target for DummyTarget {
    fn key(&self) -> &str {
        &self.key
    }

    fn is_cloud_target(&self) -> bool {
        false
    }

    async fn exists(&self) -> Result<bool, TargetError> {
        Ok(false)
    }

    async fn load(&self) -> Result<Value, TargetError> {
        Ok(Value::Null)
    }

    async fn dump(&self, _value: &Value) -> Result<(), TargetError> {
        Ok(())
    }

    async fn remove(&self) -> Result<(), TargetError> {
        Ok(())
    }

    async fn persist_log(&self, _local_path: &Path) -> Result<(), TargetError> {
        Ok(())
    }

    async fn load_log(&self) -> Result<Option<String>, TargetError> {
        Ok(None)
    }
}

/// Resolves a [`TargetKind`] to a concrete target for a task.
#[derive(Clone)]
pub struct TargetFactory {
    local: Arc<dyn ObjectStore>,
    cloud: Option<Arc<dyn ObjectStore>>,
}

impl TargetFactory {
    pub fn new(local: Arc<dyn ObjectStore>, cloud: Option<Arc<dyn ObjectStore>>) -> Self {
        Self { local, cloud }
    }

    pub fn create(
        &self,
        kind: TargetKind,
        family: &str,
        task_id: &str,
    ) -> Result<Arc<dyn Target>, TargetError> {
        match kind {
            TargetKind::Dummy => Ok(Arc::new(DummyTarget::new(task_id))),
            TargetKind::Store { backend, format } => {
                let store = match backend {
                    Backend::Local => self.local.clone(),
                    Backend::Cloud => self
                        .cloud
                        .clone()
                        .ok_or_else(|| TargetError::CloudNotConfigured(task_id.to_string()))?,
                };
                Ok(Arc::new(StoreTarget::new(store, family, task_id, format)))
            }
        }
    }
}

mod tests;
