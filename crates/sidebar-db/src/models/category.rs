//! Sidebar category database models

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for the sidebar_categories table
#[derive(Debug, Clone, FromRow)]
pub struct SidebarCategoryModel {
    pub id: i64,
    pub user_id: i64,
    pub team_id: i64,
    /// Category type: 'favorites', 'channels', 'direct_messages', 'custom'
    #[sqlx(rename = "type")]
    pub category_type: String,
    pub display_name: String,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SidebarCategoryModel {
    /// Check if this is a custom category
    #[inline]
    pub fn is_custom(&self) -> bool {
        self.category_type == "custom"
    }
}

/// Database model for the sidebar_channels join table
#[derive(Debug, Clone, FromRow)]
pub struct SidebarChannelModel {
    pub category_id: i64,
    pub channel_id: i64,
    pub user_id: i64,
    pub team_id: i64,
    pub sort_order: i32,
}
