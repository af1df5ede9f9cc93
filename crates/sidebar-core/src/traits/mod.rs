//! Traits (ports) for storage and collaborators

mod collaborators;
mod repositories;

pub use collaborators::{ChannelDirectory, FavoritePreferences};
pub use repositories::{RepoResult, SidebarCategoryRepository};
