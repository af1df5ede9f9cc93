//! Error handling utilities for repositories

use sidebar_core::error::DomainError;
use sidebar_core::value_objects::Snowflake;
use sqlx::Error as SqlxError;

/// Convert SQLx error to DomainError
pub fn map_db_error(e: SqlxError) -> DomainError {
    DomainError::DatabaseError(e.to_string())
}

/// Create a "category not found" error
pub fn category_not_found(id: Snowflake) -> DomainError {
    DomainError::CategoryNotFound(id)
}
