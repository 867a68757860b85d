//! `sqlx` error conversion.

use invigil_core::error::DomainError;
use tracing::warn;

/// Maps any database failure onto the domain's unavailable-dependency error.
pub(crate) fn unavailable(error: sqlx::Error) -> DomainError {
    warn!(%error, "database operation failed");
    DomainError::DependencyUnavailable(error.to_string())
}

/// A row that could not be decoded into its domain type.
pub(crate) fn corrupt_row(table: &str, detail: &str) -> DomainError {
    DomainError::DependencyUnavailable(format!("corrupt {table} row: {detail}"))
}
