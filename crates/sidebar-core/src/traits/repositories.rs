//! Repository traits (ports) - define the interface for data access
//!
//! The domain layer defines what it needs, and the infrastructure layer
//! provides the implementation.

use async_trait::async_trait;

use crate::entities::{CategoryWithChannels, OrderedCategories, UpdateOutcome};
use crate::error::DomainError;
use crate::events::FavoriteChange;
use crate::value_objects::Snowflake;

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

/// Storage contract for sidebar categories of one chat platform.
///
/// Implementations must keep every multi-row mutation atomic and must
/// tolerate concurrent callers on the same (user, team) scope; cross-scope
/// operations never contend with each other.
#[async_trait]
pub trait SidebarCategoryRepository: Send + Sync {
    /// Idempotently create the three default categories for a (user, team)
    /// pair. Returns the existing set unchanged when defaults are already
    /// present; concurrent callers converge on the first writer's result.
    async fn create_initial_categories(
        &self,
        user_id: Snowflake,
        team_id: Snowflake,
    ) -> RepoResult<OrderedCategories>;

    /// All categories of a (user, team) scope ordered by sort order, each
    /// with its effective channel list.
    async fn get_categories(
        &self,
        user_id: Snowflake,
        team_id: Snowflake,
    ) -> RepoResult<OrderedCategories>;

    /// A single category with its effective channel list.
    async fn get_category(&self, category_id: Snowflake) -> RepoResult<CategoryWithChannels>;

    /// Create a custom category. Fails with `DefaultCategoriesMissing` when
    /// the scope has not been initialized. Channels assigned here are removed
    /// from any prior category in the same team.
    async fn create_category(
        &self,
        user_id: Snowflake,
        team_id: Snowflake,
        display_name: &str,
        channels: &[Snowflake],
    ) -> RepoResult<CategoryWithChannels>;

    /// Apply a batch of category updates. Attempts to change immutable
    /// fields are silently discarded (the persisted value wins). Returns
    /// paired after/before snapshots in input order.
    async fn update_categories(
        &self,
        user_id: Snowflake,
        team_id: Snowflake,
        updates: &[CategoryWithChannels],
    ) -> RepoResult<UpdateOutcome>;

    /// Rewrite the sort order of all categories in the scope to match the
    /// given sequence, which must be a permutation of the scope's category
    /// IDs. Touches no other column.
    async fn update_category_order(
        &self,
        user_id: Snowflake,
        team_id: Snowflake,
        order: &[Snowflake],
    ) -> RepoResult<()>;

    /// Delete a custom category, returning its channels to orphan status.
    /// Fails with `InvalidCategoryDelete` for default or already-deleted
    /// categories.
    async fn delete_category(&self, category_id: Snowflake) -> RepoResult<()>;

    /// Cascade delete of every category and assignment row for one
    /// (user, team) pair; other teams' rows for the same user are untouched.
    async fn delete_for_team(&self, user_id: Snowflake, team_id: Snowflake) -> RepoResult<()>;

    /// Reflect an externally-performed favorite-preference write into the
    /// category rows. Silently no-ops when the channel is unknown or the
    /// user has no category rows yet.
    async fn apply_preference_change(&self, change: &FavoriteChange) -> RepoResult<()>;
}
