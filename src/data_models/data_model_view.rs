use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;

use super::records::{drop_metadata, merge_records, Record, METADATA_COLUMNS};
use super::{CarolApi, FetchBackend, FetchRequest, ImportType, Method, ViewDataSource};
use crate::error::DataModelError;

const VIEWS_PATH: &str = "v1/relationshipView";
const REPROCESS_PATH: &str = "v1/goldenRecordView/reprocess";
const EXPORTER_PATH: &str = "v1/goldenRecordView/exporter";
const FILTER_PATH: &str = "v2/queries/filter";
const EXPORT_RECORD_TYPE: &str = "mdmGoldenRecordViewExport";
const STATS_PAGE_SIZE: u64 = 1000;

/// A view, by name or by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewRef {
    Name(String),
    Id(String),
}

impl ViewRef {
    pub fn name(name: impl Into<String>) -> Self {
        ViewRef::Name(name.into())
    }

    pub fn id(id: impl Into<String>) -> Self {
        ViewRef::Id(id.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewSummary {
    pub mdm_id: String,
    pub mdm_running_state: Value,
    pub mdm_entity_type: Value,
}

/// Every view of the tenant, as returned by [`DataModelView::get_all`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewListing {
    /// Raw view documents, in page order
    pub hits: Vec<Value>,
    /// View name to its id, running state and entity type
    pub by_name: BTreeMap<String, ViewSummary>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GetAllOptions {
    pub offset: u64,
    /// `-1` lets the server pick
    pub page_size: i64,
    pub sort_order: String,
    pub sort_by: Option<String>,
    /// Append every page as one JSON line to this file
    pub save_file: Option<PathBuf>,
}

impl Default for GetAllOptions {
    fn default() -> Self {
        Self {
            offset: 0,
            page_size: -1,
            sort_order: "ASC".to_string(),
            sort_by: None,
            save_file: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Parquet,
    Csv,
    Json,
    Excel,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Parquet => "PARQUET",
            ExportFormat::Csv => "CSV",
            ExportFormat::Json => "JSON",
            ExportFormat::Excel => "EXCEL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Start the export when true, pause it otherwise
    pub sync_view: bool,
    pub full_export: bool,
    pub delete_previous: bool,
    pub format: ExportFormat,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            sync_view: true,
            full_export: false,
            delete_previous: false,
            format: ExportFormat::Parquet,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
    /// Keep only the latest version of each record
    pub merge_records: bool,
    /// `"eager"` or `"parallel"`
    pub backend: String,
    pub columns: Option<Vec<String>>,
    /// Keep the bookkeeping columns in the result
    pub return_metadata: bool,
    pub max_hits: Option<usize>,
    /// Read from the CDS copy, which needs no export configuration
    pub cds: bool,
    pub max_workers: Option<usize>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            merge_records: true,
            backend: FetchBackend::default().as_str().to_string(),
            columns: None,
            return_metadata: false,
            max_hits: None,
            cds: false,
            max_workers: None,
        }
    }
}

fn field<'a>(value: &'a Value, name: &str) -> Result<&'a Value, DataModelError> {
    value
        .get(name)
        .ok_or_else(|| DataModelError::MissingField(name.to_string()))
}

fn str_field<'a>(value: &'a Value, name: &str) -> Result<&'a str, DataModelError> {
    field(value, name)?
        .as_str()
        .ok_or_else(|| DataModelError::MissingField(name.to_string()))
}

fn u64_field(value: &Value, name: &str) -> Result<u64, DataModelError> {
    field(value, name)?
        .as_u64()
        .ok_or_else(|| DataModelError::MissingField(name.to_string()))
}

fn hits(page: &Value) -> Result<&[Value], DataModelError> {
    field(page, "hits")?
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| DataModelError::MissingField("hits".to_string()))
}

/// Data model views of a tenant: listing, reprocessing, export control and
/// retrieval of exported data.
#[derive(Clone)]
pub struct DataModelView {
    api: Arc<dyn CarolApi>,
}

impl DataModelView {
    pub fn new(api: Arc<dyn CarolApi>) -> Self {
        Self { api }
    }

    async fn call(
        &self,
        path: &str,
        method: Method,
        query: Option<&Value>,
        body: Option<&Value>,
    ) -> Result<Value, DataModelError> {
        debug!("{} {}", method, path);
        self.api
            .call_api(path, method, query, body)
            .await
            .map_err(DataModelError::Api)
    }

    pub async fn get_by_name(&self, view_name: &str) -> Result<Value, DataModelError> {
        self.call(&format!("{}/name/{}", VIEWS_PATH, view_name), Method::Get, None, None)
            .await
    }

    pub async fn get_by_id(&self, view_id: &str) -> Result<Value, DataModelError> {
        self.call(&format!("{}/{}", VIEWS_PATH, view_id), Method::Get, None, None)
            .await
    }

    /// Page through every view, starting at `options.offset`, until the
    /// server reports no more results or the announced total is reached.
    pub async fn get_all(&self, options: &GetAllOptions) -> Result<ViewListing, DataModelError> {
        let mut listing = ViewListing::default();
        let mut count = options.offset;
        let mut total_hits: Option<u64> = None;

        let mut file = match &options.save_file {
            Some(path) => Some(tokio::fs::File::create(path).await?),
            None => None,
        };

        while total_hits.map_or(true, |total| count < total) {
            let mut query = json!({
                "offset": count,
                "pageSize": options.page_size.to_string(),
                "sortOrder": options.sort_order,
            });
            if let Some(sort_by) = &options.sort_by {
                query["sortBy"] = json!(sort_by);
            }

            let page = self.call(VIEWS_PATH, Method::Get, Some(&query), None).await?;

            let page_count = u64_field(&page, "count")?;
            if page_count == 0 {
                info!(
                    "There are no more results. Expecting {}, response = {}",
                    total_hits.map_or_else(|| "?".to_string(), |t| t.to_string()),
                    count
                );
                break;
            }
            count += page_count;
            if total_hits.is_none() {
                total_hits = Some(u64_field(&page, "totalHits")?);
            }

            let page_hits = hits(&page)?;
            for hit in page_hits {
                let name = str_field(hit, "mdmName")?.to_string();
                let summary = ViewSummary {
                    mdm_id: str_field(hit, "mdmId")?.to_string(),
                    mdm_running_state: hit.get("mdmRunningState").cloned().unwrap_or(Value::Null),
                    mdm_entity_type: hit.get("mdmEntityType").cloned().unwrap_or(Value::Null),
                };
                listing.by_name.insert(name, summary);
            }
            listing.hits.extend(page_hits.iter().cloned());

            debug!(
                "{}/{}",
                count,
                total_hits.map_or_else(|| "?".to_string(), |t| t.to_string())
            );

            if let Some(file) = file.as_mut() {
                let mut line = serde_json::to_vec(page_hits).map_err(|e| {
                    std::io::Error::new(std::io::ErrorKind::InvalidData, e)
                })?;
                line.push(b'\n');
                file.write_all(&line).await?;
                file.flush().await?;
            }
        }

        Ok(listing)
    }

    async fn resolve_id(&self, view: &ViewRef) -> Result<String, DataModelError> {
        match view {
            ViewRef::Id(id) => Ok(id.clone()),
            ViewRef::Name(name) => {
                let doc = self.get_by_name(name).await?;
                Ok(str_field(&doc, "mdmId")?.to_string())
            }
        }
    }

    async fn resolve_name(&self, view: &ViewRef) -> Result<String, DataModelError> {
        match view {
            ViewRef::Name(name) => Ok(name.clone()),
            ViewRef::Id(id) => {
                let doc = self.get_by_id(id).await?;
                Ok(str_field(&doc, "mdmName")?.to_string())
            }
        }
    }

    /// Reprocess the records of a view, optionally keeping the result in CDS.
    pub async fn reprocess(&self, view: &ViewRef, cds: bool) -> Result<Value, DataModelError> {
        let view_id = self.resolve_id(view).await?;
        let query = json!({ "relationshipViewId": view_id, "cds": cds });
        self.call(REPROCESS_PATH, Method::Post, Some(&query), None)
            .await
    }

    /// Start or pause the export of a view's data.
    pub async fn export(
        &self,
        view: &ViewRef,
        options: &ExportOptions,
    ) -> Result<Value, DataModelError> {
        let view_name = self.resolve_name(view).await?;
        let status = if options.sync_view { "RUNNING" } else { "PAUSED" };
        let query = json!({
            "status": status,
            "fullExport": options.full_export,
            "viewName": view_name,
            "format": options.format.as_str(),
            "deletePrevious": options.delete_previous,
        });
        info!("Setting export of view '{}' to {}", view_name, status);
        self.call(EXPORTER_PATH, Method::Post, Some(&query), None)
            .await
    }

    /// [`DataModelView::export`] for every view of the tenant.
    pub async fn export_all(&self, options: &ExportOptions) -> Result<Vec<Value>, DataModelError> {
        let listing = self.get_all(&GetAllOptions::default()).await?;
        let mut responses = Vec::with_capacity(listing.by_name.len());
        for name in listing.by_name.keys() {
            responses.push(self.export(&ViewRef::name(name.as_str()), options).await?);
        }
        Ok(responses)
    }

    /// Export configuration records keyed by view name. Records of views
    /// that no longer exist are keyed `<view id>_NOT_FOUND`.
    pub async fn export_stats(&self) -> Result<BTreeMap<String, Value>, DataModelError> {
        let filter = json!({
            "mustList": [
                { "mdmFilterType": "TYPE_FILTER", "mdmValue": EXPORT_RECORD_TYPE }
            ]
        });

        let mut records = Vec::new();
        let mut offset = 0u64;
        loop {
            let query = json!({
                "indexType": "CONFIG",
                "offset": offset,
                "pageSize": STATS_PAGE_SIZE,
            });
            let page = self
                .call(FILTER_PATH, Method::Post, Some(&query), Some(&filter))
                .await?;
            let page_hits = page
                .get("hits")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            if page_hits.is_empty() {
                break;
            }
            offset += page_hits.len() as u64;
            records.extend(page_hits);

            let total = page.get("totalHits").and_then(Value::as_u64).unwrap_or(0);
            if offset >= total {
                break;
            }
        }

        let listing = self.get_all(&GetAllOptions::default()).await?;
        let names: BTreeMap<&str, &str> = listing
            .by_name
            .iter()
            .map(|(name, summary)| (summary.mdm_id.as_str(), name.as_str()))
            .collect();

        let mut stats = BTreeMap::new();
        for record in records {
            let view_id = str_field(&record, "mdmRelationshipViewId")?;
            let key = match names.get(view_id) {
                Some(name) => name.to_string(),
                None => format!("{}_NOT_FOUND", view_id),
            };
            stats.insert(key, record);
        }
        Ok(stats)
    }

    /// Download the exported rows of a view through `source`.
    ///
    /// Returns `Ok(None)` when the view has no exported data.
    pub async fn fetch_parquet(
        &self,
        source: &dyn ViewDataSource,
        view_name: &str,
        options: &FetchOptions,
    ) -> Result<Option<Vec<Record>>, DataModelError> {
        let backend: FetchBackend = options.backend.parse()?;

        let import_type = if options.cds {
            ImportType::ViewCds
        } else {
            let stats = self.export_stats().await?;
            if !stats.contains_key(view_name) {
                return Err(DataModelError::ExportNotConfigured {
                    view: view_name.to_string(),
                });
            }
            ImportType::View
        };

        let columns = options.columns.as_ref().map(|columns| {
            let mut columns = columns.clone();
            for meta in METADATA_COLUMNS {
                if !columns.iter().any(|c| c == meta) {
                    columns.push(meta.to_string());
                }
            }
            columns
        });

        let request = FetchRequest {
            view_name: view_name.to_string(),
            import_type,
            backend,
            columns,
            max_hits: options.max_hits,
            max_workers: options.max_workers,
        };
        debug!(
            "Fetching view '{}' from {} with the {} backend",
            view_name,
            import_type.as_str(),
            backend.as_str()
        );

        let records = match source.fetch(&request).await.map_err(DataModelError::Api)? {
            Some(records) if !records.is_empty() => records,
            _ => {
                warn!("No data to fetch for view '{}'", view_name);
                return Ok(None);
            }
        };

        let mut records = if options.merge_records {
            merge_records(records)
        } else {
            records
        };
        if !options.return_metadata {
            drop_metadata(&mut records);
        }
        Ok(Some(records))
    }
}
