//! Sidebar category entity <-> model mapper

use std::collections::HashMap;

use sidebar_core::entities::{CategoryType, SidebarCategory};
use sidebar_core::value_objects::Snowflake;

use crate::models::{SidebarCategoryModel, SidebarChannelModel};

/// Convert SidebarCategoryModel to SidebarCategory entity
impl From<SidebarCategoryModel> for SidebarCategory {
    fn from(model: SidebarCategoryModel) -> Self {
        SidebarCategory {
            id: Snowflake::new(model.id),
            user_id: Snowflake::new(model.user_id),
            team_id: Snowflake::new(model.team_id),
            category_type: CategoryType::from(model.category_type.as_str()),
            display_name: model.display_name,
            sort_order: model.sort_order,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Group assignment rows by category ID, preserving per-category sort order.
/// Rows must already be ordered by (category_id, sort_order).
pub fn group_assignments(rows: Vec<SidebarChannelModel>) -> HashMap<i64, Vec<Snowflake>> {
    let mut grouped: HashMap<i64, Vec<Snowflake>> = HashMap::new();
    for row in rows {
        grouped
            .entry(row.category_id)
            .or_default()
            .push(Snowflake::new(row.channel_id));
    }
    grouped
}
