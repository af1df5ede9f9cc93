//! Shared fixtures: a repository wired to seedable collaborators

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use sidebar_core::entities::{ChannelKind, ChannelView};
use sidebar_core::value_objects::Snowflake;
use sidebar_mem::{MemChannelDirectory, MemFavoritePreferences, MemSidebarCategoryRepository};

/// A category repository with its seedable collaborators.
pub struct TestEnv {
    pub repo: Arc<MemSidebarCategoryRepository>,
    pub directory: Arc<MemChannelDirectory>,
    pub preferences: Arc<MemFavoritePreferences>,
}

impl TestEnv {
    #[must_use]
    pub fn new() -> Self {
        let directory = Arc::new(MemChannelDirectory::new());
        let preferences = Arc::new(MemFavoritePreferences::new());
        let repo = Arc::new(MemSidebarCategoryRepository::new(
            directory.clone(),
            preferences.clone(),
        ));
        Self {
            repo,
            directory,
            preferences,
        }
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate a unique test ID
pub fn next_id() -> Snowflake {
    static COUNTER: AtomicI64 = AtomicI64::new(1_000_000);
    Snowflake::new(COUNTER.fetch_add(1, Ordering::SeqCst))
}

#[must_use]
pub fn open_channel(team: Snowflake, name: &str) -> ChannelView {
    ChannelView {
        id: next_id(),
        team_id: Some(team),
        kind: ChannelKind::Open,
        display_name: name.to_string(),
    }
}

#[must_use]
pub fn private_channel(team: Snowflake, name: &str) -> ChannelView {
    ChannelView {
        id: next_id(),
        team_id: Some(team),
        kind: ChannelKind::Private,
        display_name: name.to_string(),
    }
}

#[must_use]
pub fn direct_channel(name: &str) -> ChannelView {
    ChannelView {
        id: next_id(),
        team_id: None,
        kind: ChannelKind::Direct,
        display_name: name.to_string(),
    }
}

#[must_use]
pub fn group_channel(name: &str) -> ChannelView {
    ChannelView {
        id: next_id(),
        team_id: None,
        kind: ChannelKind::Group,
        display_name: name.to_string(),
    }
}
