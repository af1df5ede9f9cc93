//! # sidebar-core
//!
//! Domain layer for the sidebar category engine: entities, value objects,
//! repository and collaborator traits, and the pure resolution rules shared
//! by every storage backend. This crate has zero dependencies on
//! infrastructure (database, runtime, etc.).

pub mod entities;
pub mod error;
pub mod events;
pub mod resolve;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    custom_insert_index, CategoryType, CategoryWithChannels, ChannelKind, ChannelView,
    OrderedCategories, SidebarCategory, UpdateOutcome,
};
pub use error::DomainError;
pub use events::FavoriteChange;
pub use traits::{ChannelDirectory, FavoritePreferences, RepoResult, SidebarCategoryRepository};
pub use value_objects::{Snowflake, SnowflakeGenerator, SnowflakeParseError};
