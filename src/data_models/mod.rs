use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{BoxError, DataModelError};

pub mod data_model_view;
mod records;

pub use data_model_view::{
    DataModelView, ExportFormat, ExportOptions, FetchOptions, GetAllOptions, ViewListing, ViewRef,
    ViewSummary,
};
pub use records::{merge_records, Record, METADATA_COLUMNS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated access to the platform's REST API.
///
/// `query` holds URL parameters as a JSON object, `body` the JSON payload.
/// Implementations own the session and return the parsed response body.
#[async_trait]
pub trait CarolApi: Send + Sync {
    async fn call_api(
        &self,
        path: &str,
        method: Method,
        query: Option<&Value>,
        body: Option<&Value>,
    ) -> Result<Value, BoxError>;
}

/// Which storage space exported view data is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportType {
    View,
    ViewCds,
}

impl ImportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportType::View => "view",
            ImportType::ViewCds => "view_cds",
        }
    }
}

/// How the data source downloads exported files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchBackend {
    /// One file after another, all in memory
    #[default]
    Eager,
    /// Several files at once, up to `max_workers`
    Parallel,
}

impl FetchBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchBackend::Eager => "eager",
            FetchBackend::Parallel => "parallel",
        }
    }
}

impl FromStr for FetchBackend {
    type Err = DataModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eager" => Ok(FetchBackend::Eager),
            "parallel" => Ok(FetchBackend::Parallel),
            other => Err(DataModelError::InvalidBackendChoice(other.to_string())),
        }
    }
}

/// What to download for one view.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub view_name: String,
    pub import_type: ImportType,
    pub backend: FetchBackend,
    /// `None` fetches every column
    pub columns: Option<Vec<String>>,
    pub max_hits: Option<usize>,
    pub max_workers: Option<usize>,
}

/// Reads the exported files of a view and returns their rows.
///
/// `Ok(None)` means the view has nothing exported yet.
#[async_trait]
pub trait ViewDataSource: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<Option<Vec<Record>>, BoxError>;
}
