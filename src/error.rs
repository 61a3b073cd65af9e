use thiserror::Error;

/// Failure kinds surfaced by the dashboard core.
///
/// Read-path callers normally never see these directly: the dashboard
/// surface folds them into an `{ "error": ... }` payload. The mutation path
/// returns them as-is.
#[derive(Debug, Error)]
pub enum DashError {
    #[error("source table not found: {0}")]
    SourceNotFound(String),

    #[error("unresolved column reference: {0}")]
    UnresolvedColumn(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("cache read failure: {0}")]
    CacheRead(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type DashResult<T> = Result<T, DashError>;
