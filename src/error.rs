use std::error::Error;

use thiserror::Error;

/// Error type returned by user computations and external collaborators.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Failures raised while binding arguments to a task's declared parameters.
///
/// Every message starts with the invocation, e.g. `Train[args=[], kwargs={"n":1}]`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParamError {
    #[error("{0}")]
    UnknownParameter(String),

    #[error("{0}")]
    DuplicateParameter(String),

    #[error("{0}")]
    MissingParameter(String),

    #[error("{0}")]
    InvalidValue(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("store error: {0}")]
    Internal(String),
}

#[derive(Debug, Error)]
pub enum TargetError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("couldn't encode output of '{key}': {reason}")]
    Encode { key: String, reason: String },

    #[error("couldn't decode output of '{key}': {reason}")]
    Decode { key: String, reason: String },

    #[error("couldn't read log file: {0}")]
    Log(#[from] std::io::Error),

    #[error("no cloud object store is configured for task '{0}'")]
    CloudNotConfigured(String),
}

/// Errors surfaced by [`TaskInstance::run`](crate::task::TaskInstance::run) and
/// the build driver.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Param(#[from] ParamError),

    #[error(transparent)]
    Target(#[from] TargetError),

    /// The user computation failed. The original error is kept as is.
    #[error(transparent)]
    Computation(BoxError),
}

impl TaskError {
    /// Returns the user error when the failure came from the computation itself.
    pub fn computation_error(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        match self {
            TaskError::Computation(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum DataModelError {
    #[error(
        "\"{view}\" is not set to export data, \n\
         use `DataModelView::new(api).export(ViewRef::name(\"{view}\"), ExportOptions::default())` to activate"
    )]
    ExportNotConfigured { view: String },

    #[error("backend should be either \"eager\" or \"parallel\" you entered {0}")]
    InvalidBackendChoice(String),

    #[error("response is missing field '{0}'")]
    MissingField(String),

    #[error("api call failed: {0}")]
    Api(#[source] BoxError),

    #[error("couldn't write listing: {0}")]
    Io(#[from] std::io::Error),
}
