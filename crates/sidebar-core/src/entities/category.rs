//! Sidebar category entity - a named, ordered group of channel memberships
//! scoped to one (user, team) pair

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// Category type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CategoryType {
    /// Favorited channels, kept in sync with the cross-team favorite preference
    Favorites,
    /// Regular channel memberships
    #[default]
    Channels,
    /// Direct and group message memberships
    DirectMessages,
    /// User-created category
    Custom,
}

impl CategoryType {
    /// Check if this is one of the three default types
    #[inline]
    #[must_use]
    pub fn is_default(self) -> bool {
        !matches!(self, Self::Custom)
    }

    /// Storage string form
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Favorites => "favorites",
            Self::Channels => "channels",
            Self::DirectMessages => "direct_messages",
            Self::Custom => "custom",
        }
    }

    /// Fixed display name for default types
    #[must_use]
    pub fn default_display_name(self) -> Option<&'static str> {
        match self {
            Self::Favorites => Some("Favorites"),
            Self::Channels => Some("Channels"),
            Self::DirectMessages => Some("Direct Messages"),
            Self::Custom => None,
        }
    }

    /// The three default types in sidebar order
    #[must_use]
    pub fn defaults() -> [Self; 3] {
        [Self::Favorites, Self::Channels, Self::DirectMessages]
    }
}

impl From<&str> for CategoryType {
    fn from(value: &str) -> Self {
        match value {
            "favorites" => Self::Favorites,
            "direct_messages" => Self::DirectMessages,
            "custom" => Self::Custom,
            _ => Self::Channels, // Default for "channels" and unknown values
        }
    }
}

/// Sidebar category entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidebarCategory {
    pub id: Snowflake,
    pub user_id: Snowflake,
    pub team_id: Snowflake,
    pub category_type: CategoryType,
    pub display_name: String,
    /// Dense ordinal among sibling categories of the same (user, team)
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SidebarCategory {
    /// Create one of the three default categories
    #[must_use]
    pub fn new_default(
        id: Snowflake,
        user_id: Snowflake,
        team_id: Snowflake,
        category_type: CategoryType,
        sort_order: i32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            team_id,
            category_type,
            display_name: category_type
                .default_display_name()
                .unwrap_or_default()
                .to_string(),
            sort_order,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a user-defined custom category
    #[must_use]
    pub fn new_custom(
        id: Snowflake,
        user_id: Snowflake,
        team_id: Snowflake,
        display_name: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            team_id,
            category_type: CategoryType::Custom,
            display_name,
            sort_order: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if this is a default category
    #[inline]
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.category_type.is_default()
    }

    /// Only custom categories may be deleted
    #[inline]
    #[must_use]
    pub fn is_deletable(&self) -> bool {
        !self.is_default()
    }

    /// Graft the mutable fields of `incoming` onto this persisted category.
    ///
    /// Identity, type, scope, and `sort_order` always come from the persisted
    /// row; default categories additionally keep their fixed display name.
    /// Attempts to change any of those fields are a silent no-op: the
    /// persisted value wins.
    #[must_use]
    pub fn merged_update(&self, incoming: &SidebarCategory) -> SidebarCategory {
        let mut merged = self.clone();
        if !self.is_default() {
            merged.display_name = incoming.display_name.clone();
        }
        merged.updated_at = Utc::now();
        merged
    }
}

/// A category together with its effective channel list, in display order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryWithChannels {
    pub category: SidebarCategory,
    pub channels: Vec<Snowflake>,
}

impl CategoryWithChannels {
    #[must_use]
    pub fn new(category: SidebarCategory, channels: Vec<Snowflake>) -> Self {
        Self { category, channels }
    }
}

/// All categories of one (user, team) scope with their display order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedCategories {
    /// Category IDs by ascending `sort_order`
    pub order: Vec<Snowflake>,
    pub categories: Vec<CategoryWithChannels>,
}

impl OrderedCategories {
    #[must_use]
    pub fn new(categories: Vec<CategoryWithChannels>) -> Self {
        let order = categories.iter().map(|c| c.category.id).collect();
        Self { order, categories }
    }

    /// Find a category by type
    #[must_use]
    pub fn find_by_type(&self, category_type: CategoryType) -> Option<&CategoryWithChannels> {
        self.categories
            .iter()
            .find(|c| c.category.category_type == category_type)
    }
}

/// Paired after/before snapshots returned by a bulk category update,
/// in input order
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    pub updated: Vec<CategoryWithChannels>,
    pub original: Vec<CategoryWithChannels>,
}

/// Position at which a newly created custom category is inserted.
///
/// If Favorites currently occupies the first slot the new category goes
/// directly after it, otherwise it goes first. Evaluated against the current
/// order at creation time, not a fixed convention.
#[must_use]
pub fn custom_insert_index(ordered: &[SidebarCategory]) -> usize {
    match ordered.first() {
        Some(first) if first.category_type == CategoryType::Favorites => 1,
        _ => 0,
    }
}
