use thiserror::Error;

/// Failure reported by a persistence backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure reported to callers of the compliance evaluator.
///
/// `OperationFailed` renders only its generic message; the store cause stays
/// reachable through `source()` for logging.
#[derive(Debug, Error)]
pub enum ComplianceError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("{message}")]
    OperationFailed {
        message: &'static str,
        #[source]
        source: StoreError,
    },
}

impl ComplianceError {
    pub(crate) fn failed(message: &'static str) -> impl FnOnce(StoreError) -> ComplianceError {
        move |source| {
            tracing::error!(error = ?source, operation = message, "compliance store operation failed");
            ComplianceError::OperationFailed { message, source }
        }
    }
}

pub type ComplianceResult<T> = Result<T, ComplianceError>;
