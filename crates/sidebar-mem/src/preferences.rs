//! Seedable in-memory favorite-preference store

use std::collections::HashSet;

use async_trait::async_trait;
use dashmap::DashSet;

use sidebar_core::error::DomainError;
use sidebar_core::traits::FavoritePreferences;
use sidebar_core::value_objects::Snowflake;

/// In-memory (user, channel) favorite preference store.
#[derive(Default)]
pub struct MemFavoritePreferences {
    entries: DashSet<(Snowflake, Snowflake)>,
}

impl MemFavoritePreferences {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Test helper: check a single preference without cloning the whole set.
    #[must_use]
    pub fn is_favorite(&self, user_id: Snowflake, channel_id: Snowflake) -> bool {
        self.entries.contains(&(user_id, channel_id))
    }
}

#[async_trait]
impl FavoritePreferences for MemFavoritePreferences {
    async fn favorites(&self, user_id: Snowflake) -> Result<HashSet<Snowflake>, DomainError> {
        Ok(self
            .entries
            .iter()
            .filter(|pair| pair.0 == user_id)
            .map(|pair| pair.1)
            .collect())
    }

    async fn set_favorite(
        &self,
        user_id: Snowflake,
        channel_id: Snowflake,
    ) -> Result<(), DomainError> {
        self.entries.insert((user_id, channel_id));
        Ok(())
    }

    async fn delete_favorite(
        &self,
        user_id: Snowflake,
        channel_id: Snowflake,
    ) -> Result<(), DomainError> {
        self.entries.remove(&(user_id, channel_id));
        Ok(())
    }
}
