//! Mapping of driver errors into the core error taxonomy.

pub use noteline_engine::error::Result;
pub use noteline_engine::Error;

/// A local storage failure. Never retried inside the core.
pub(crate) fn storage(err: impl std::fmt::Display) -> Error {
    tracing::error!(error = %err, "Local storage error");
    Error::StorageUnavailable(err.to_string())
}

/// A failed remote call. Always retryable.
pub(crate) fn unreachable(err: impl std::fmt::Display) -> Error {
    Error::Unreachable(err.to_string())
}
