//! Domain errors - error types for the domain layer

use thiserror::Error;

use crate::value_objects::Snowflake;

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Not Found Errors
    // =========================================================================
    #[error("Category not found: {0}")]
    CategoryNotFound(Snowflake),

    #[error("No default categories exist for user {user_id} on team {team_id}")]
    DefaultCategoriesMissing {
        user_id: Snowflake,
        team_id: Snowflake,
    },

    #[error("Channel not found: {0}")]
    ChannelNotFound(Snowflake),

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Category cannot be deleted: {0}")]
    InvalidCategoryDelete(Snowflake),

    #[error("Invalid category order: {0}")]
    InvalidCategoryOrder(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    // =========================================================================
    // Infrastructure Errors (wrapped)
    // =========================================================================
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Get an error code string for upper-layer responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::CategoryNotFound(_) => "UNKNOWN_CATEGORY",
            Self::DefaultCategoriesMissing { .. } => "MISSING_DEFAULT_CATEGORIES",
            Self::ChannelNotFound(_) => "UNKNOWN_CHANNEL",
            Self::InvalidCategoryDelete(_) => "INVALID_CATEGORY_DELETE",
            Self::InvalidCategoryOrder(_) => "INVALID_CATEGORY_ORDER",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::CategoryNotFound(_)
                | Self::DefaultCategoriesMissing { .. }
                | Self::ChannelNotFound(_)
        )
    }

    /// Check if this is an invalid-input error
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidCategoryDelete(_)
                | Self::InvalidCategoryOrder(_)
                | Self::ValidationError(_)
        )
    }
}
