//! Collaborator traits - external systems the category engine consumes
//!
//! The engine depends on these interfaces only, never on the collaborators'
//! internal representation.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::entities::ChannelView;
use crate::error::DomainError;
use crate::value_objects::Snowflake;

/// Channel existence, kind, display-name, and membership lookup.
#[async_trait]
pub trait ChannelDirectory: Send + Sync {
    /// Channels the user is a member of within the team's sidebar scope.
    /// Direct and group memberships are team-agnostic and reported for
    /// every team.
    async fn member_channels(
        &self,
        user_id: Snowflake,
        team_id: Snowflake,
    ) -> Result<Vec<ChannelView>, DomainError>;

    /// Look up a single channel.
    async fn channel(&self, channel_id: Snowflake) -> Result<Option<ChannelView>, DomainError>;
}

/// The cross-team favorite-channel preference store, keyed by
/// (user, channel). All operations are idempotent.
#[async_trait]
pub trait FavoritePreferences: Send + Sync {
    /// Channel IDs the user has marked favorite, across all teams.
    async fn favorites(&self, user_id: Snowflake) -> Result<HashSet<Snowflake>, DomainError>;

    /// Upsert the favorite preference to true.
    async fn set_favorite(
        &self,
        user_id: Snowflake,
        channel_id: Snowflake,
    ) -> Result<(), DomainError>;

    /// Remove the favorite preference; removing an absent preference is a
    /// no-op, not an error.
    async fn delete_favorite(
        &self,
        user_id: Snowflake,
        channel_id: Snowflake,
    ) -> Result<(), DomainError>;
}
