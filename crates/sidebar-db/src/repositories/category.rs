//! PostgreSQL implementation of the sidebar category repository
//!
//! Atomicity comes from transactions; concurrent bootstrap is resolved by a
//! partial unique index on (user_id, team_id, type) for non-custom rows, and
//! concurrent mutations of the same scope serialize on `FOR UPDATE` row
//! locks taken in a fixed order.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, instrument};

use sidebar_core::entities::{
    custom_insert_index, CategoryType, CategoryWithChannels, ChannelView, OrderedCategories,
    SidebarCategory, UpdateOutcome,
};
use sidebar_core::error::DomainError;
use sidebar_core::events::{favorite_changes, FavoriteChange};
use sidebar_core::resolve;
use sidebar_core::traits::{
    ChannelDirectory, FavoritePreferences, RepoResult, SidebarCategoryRepository,
};
use sidebar_core::value_objects::{Snowflake, SnowflakeGenerator};

use crate::mappers::group_assignments;
use crate::models::{SidebarCategoryModel, SidebarChannelModel};

use super::error::{category_not_found, map_db_error};

const CATEGORY_COLUMNS: &str =
    "id, user_id, team_id, type, display_name, sort_order, created_at, updated_at";

/// PostgreSQL sidebar category repository
#[derive(Clone)]
pub struct PgSidebarCategoryRepository {
    pool: PgPool,
    channels: Arc<dyn ChannelDirectory>,
    preferences: Arc<dyn FavoritePreferences>,
    ids: Arc<SnowflakeGenerator>,
}

impl PgSidebarCategoryRepository {
    pub fn new(
        pool: PgPool,
        channels: Arc<dyn ChannelDirectory>,
        preferences: Arc<dyn FavoritePreferences>,
    ) -> Self {
        Self::with_worker_id(pool, channels, preferences, 0)
    }

    /// # Panics
    /// Panics if `worker_id` >= 1024.
    pub fn with_worker_id(
        pool: PgPool,
        channels: Arc<dyn ChannelDirectory>,
        preferences: Arc<dyn FavoritePreferences>,
        worker_id: u16,
    ) -> Self {
        Self {
            pool,
            channels,
            preferences,
            ids: Arc::new(SnowflakeGenerator::new(worker_id)),
        }
    }

    /// Collaborator reads happen before any transaction begins so no row
    /// lock is ever held across an external call.
    async fn gather(
        &self,
        user_id: Snowflake,
        team_id: Snowflake,
    ) -> RepoResult<(Vec<ChannelView>, HashSet<Snowflake>)> {
        let memberships = self.channels.member_channels(user_id, team_id).await?;
        let favorites = self.preferences.favorites(user_id).await?;
        Ok((memberships, favorites))
    }

    /// Preference writes happen after commit; both directions are
    /// idempotent so a retry after a lost connection converges.
    async fn apply_favorite_changes(&self, changes: &[FavoriteChange]) -> RepoResult<()> {
        for change in changes {
            if change.favorited {
                self.preferences
                    .set_favorite(change.user_id, change.channel_id)
                    .await?;
            } else {
                self.preferences
                    .delete_favorite(change.user_id, change.channel_id)
                    .await?;
            }
        }
        Ok(())
    }
}

async fn scope_categories(
    conn: &mut PgConnection,
    user_id: i64,
    team_id: i64,
) -> RepoResult<Vec<SidebarCategoryModel>> {
    sqlx::query_as::<_, SidebarCategoryModel>(&format!(
        "SELECT {CATEGORY_COLUMNS} FROM sidebar_categories \
         WHERE user_id = $1 AND team_id = $2 ORDER BY sort_order, id"
    ))
    .bind(user_id)
    .bind(team_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(map_db_error)
}

/// Lock every category row of the scope. Rows are locked in id order so two
/// writers on the same scope cannot deadlock; callers re-sort by sort_order
/// as needed.
async fn scope_categories_locked(
    conn: &mut PgConnection,
    user_id: i64,
    team_id: i64,
) -> RepoResult<Vec<SidebarCategoryModel>> {
    sqlx::query_as::<_, SidebarCategoryModel>(&format!(
        "SELECT {CATEGORY_COLUMNS} FROM sidebar_categories \
         WHERE user_id = $1 AND team_id = $2 ORDER BY id FOR UPDATE"
    ))
    .bind(user_id)
    .bind(team_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(map_db_error)
}

async fn scope_assignments(
    conn: &mut PgConnection,
    user_id: i64,
    team_id: i64,
) -> RepoResult<Vec<SidebarChannelModel>> {
    sqlx::query_as::<_, SidebarChannelModel>(
        "SELECT category_id, channel_id, user_id, team_id, sort_order \
         FROM sidebar_channels \
         WHERE user_id = $1 AND team_id = $2 ORDER BY category_id, sort_order",
    )
    .bind(user_id)
    .bind(team_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(map_db_error)
}

async fn insert_assignment(
    conn: &mut PgConnection,
    category_id: i64,
    channel_id: i64,
    user_id: i64,
    team_id: i64,
    sort_order: i32,
) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO sidebar_channels (category_id, channel_id, user_id, team_id, sort_order) \
         VALUES ($1, $2, $3, $4, $5) ON CONFLICT DO NOTHING",
    )
    .bind(category_id)
    .bind(channel_id)
    .bind(user_id)
    .bind(team_id)
    .bind(sort_order)
    .execute(&mut *conn)
    .await
    .map_err(map_db_error)?;
    Ok(())
}

/// Resolve one category's effective channel list against an in-memory
/// snapshot of the scope's explicit assignments.
fn resolve_in_state(
    entity: &SidebarCategory,
    explicit: &HashMap<i64, Vec<Snowflake>>,
    memberships: &[ChannelView],
    favorites: &HashSet<Snowflake>,
) -> CategoryWithChannels {
    let assigned: HashSet<Snowflake> = explicit.values().flatten().copied().collect();
    let list = explicit
        .get(&entity.id.into_inner())
        .cloned()
        .unwrap_or_default();
    let channels = resolve::effective_channels(
        entity.category_type,
        &list,
        memberships,
        &assigned,
        favorites,
    );
    CategoryWithChannels::new(entity.clone(), channels)
}

fn resolve_scope(
    mut models: Vec<SidebarCategoryModel>,
    assignments: Vec<SidebarChannelModel>,
    memberships: &[ChannelView],
    favorites: &HashSet<Snowflake>,
) -> OrderedCategories {
    models.sort_by_key(|m| (m.sort_order, m.id));
    let explicit = group_assignments(assignments);
    let categories = models
        .into_iter()
        .map(|model| {
            let entity = SidebarCategory::from(model);
            resolve_in_state(&entity, &explicit, memberships, favorites)
        })
        .collect();
    OrderedCategories::new(categories)
}

#[async_trait]
impl SidebarCategoryRepository for PgSidebarCategoryRepository {
    #[instrument(skip(self))]
    async fn create_initial_categories(
        &self,
        user_id: Snowflake,
        team_id: Snowflake,
    ) -> RepoResult<OrderedCategories> {
        let (memberships, favorites) = self.gather(user_id, team_id).await?;
        let (user, team) = (user_id.into_inner(), team_id.into_inner());

        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        let existing = scope_categories(&mut tx, user, team).await?;
        if existing.is_empty() {
            let ids: Vec<i64> = (0..3).map(|_| self.ids.generate().into_inner()).collect();
            let inserted = sqlx::query(
                "INSERT INTO sidebar_categories \
                     (id, user_id, team_id, type, display_name, sort_order) \
                 VALUES ($1, $4, $5, 'favorites', 'Favorites', 0), \
                        ($2, $4, $5, 'channels', 'Channels', 1), \
                        ($3, $4, $5, 'direct_messages', 'Direct Messages', 2) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(ids[0])
            .bind(ids[1])
            .bind(ids[2])
            .bind(user)
            .bind(team)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

            // The partial unique index lets exactly one concurrent caller
            // land all three rows; that caller also seeds Favorites from the
            // existing preference. Everyone else re-reads the winner's rows.
            if inserted.rows_affected() == 3 {
                let favorited = memberships.iter().filter(|ch| favorites.contains(&ch.id));
                for (idx, channel_id) in
                    resolve::sorted_by_display_name(favorited).iter().enumerate()
                {
                    insert_assignment(
                        &mut tx,
                        ids[0],
                        channel_id.into_inner(),
                        user,
                        team,
                        i32::try_from(idx).unwrap_or(i32::MAX),
                    )
                    .await?;
                }
            }
        }
        tx.commit().await.map_err(map_db_error)?;

        self.get_categories(user_id, team_id).await
    }

    #[instrument(skip(self))]
    async fn get_categories(
        &self,
        user_id: Snowflake,
        team_id: Snowflake,
    ) -> RepoResult<OrderedCategories> {
        let (memberships, favorites) = self.gather(user_id, team_id).await?;
        let (user, team) = (user_id.into_inner(), team_id.into_inner());

        let mut conn = self.pool.acquire().await.map_err(map_db_error)?;
        let models = scope_categories(&mut conn, user, team).await?;
        let assignments = scope_assignments(&mut conn, user, team).await?;

        Ok(resolve_scope(models, assignments, &memberships, &favorites))
    }

    #[instrument(skip(self))]
    async fn get_category(&self, category_id: Snowflake) -> RepoResult<CategoryWithChannels> {
        let model = sqlx::query_as::<_, SidebarCategoryModel>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM sidebar_categories WHERE id = $1"
        ))
        .bind(category_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| category_not_found(category_id))?;

        let user_id = Snowflake::new(model.user_id);
        let team_id = Snowflake::new(model.team_id);
        let (memberships, favorites) = self.gather(user_id, team_id).await?;

        let mut conn = self.pool.acquire().await.map_err(map_db_error)?;
        let assignments = scope_assignments(&mut conn, model.user_id, model.team_id).await?;

        let entity = SidebarCategory::from(model);
        let explicit = group_assignments(assignments);
        Ok(resolve_in_state(
            &entity,
            &explicit,
            &memberships,
            &favorites,
        ))
    }

    #[instrument(skip(self, channels))]
    async fn create_category(
        &self,
        user_id: Snowflake,
        team_id: Snowflake,
        display_name: &str,
        channels: &[Snowflake],
    ) -> RepoResult<CategoryWithChannels> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(DomainError::ValidationError(
                "category display name must not be empty".to_string(),
            ));
        }
        let channel_ids = resolve::dedupe_channels(channels);
        let raw_ids: Vec<i64> = channel_ids.iter().map(|c| c.into_inner()).collect();
        let (user, team) = (user_id.into_inner(), team_id.into_inner());

        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        let mut locked = scope_categories_locked(&mut tx, user, team).await?;
        if locked.is_empty() {
            return Err(DomainError::DefaultCategoriesMissing { user_id, team_id });
        }
        locked.sort_by_key(|m| (m.sort_order, m.id));

        // Channels pulled out of Favorites also lose their preference entry,
        // applied after commit.
        let moved_from_favorites: Vec<i64> = if raw_ids.is_empty() {
            Vec::new()
        } else {
            sqlx::query_scalar::<_, i64>(
                "SELECT sc.channel_id FROM sidebar_channels sc \
                 JOIN sidebar_categories c ON c.id = sc.category_id \
                 WHERE sc.user_id = $1 AND sc.team_id = $2 \
                   AND c.type = 'favorites' AND sc.channel_id = ANY($3)",
            )
            .bind(user)
            .bind(team)
            .bind(&raw_ids)
            .fetch_all(&mut *tx)
            .await
            .map_err(map_db_error)?
        };

        if !raw_ids.is_empty() {
            sqlx::query(
                "DELETE FROM sidebar_channels \
                 WHERE user_id = $1 AND team_id = $2 AND channel_id = ANY($3)",
            )
            .bind(user)
            .bind(team)
            .bind(&raw_ids)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        }

        let ordered: Vec<SidebarCategory> =
            locked.iter().cloned().map(SidebarCategory::from).collect();
        let insert_at = custom_insert_index(&ordered);

        // Shift every category at or after the insertion point down a slot
        for (idx, model) in locked.iter().enumerate() {
            let new_order = if idx >= insert_at { idx + 1 } else { idx };
            let new_order = i32::try_from(new_order).unwrap_or(i32::MAX);
            if new_order != model.sort_order {
                sqlx::query(
                    "UPDATE sidebar_categories SET sort_order = $2, updated_at = NOW() \
                     WHERE id = $1",
                )
                .bind(model.id)
                .bind(new_order)
                .execute(&mut *tx)
                .await
                .map_err(map_db_error)?;
            }
        }

        let mut category = SidebarCategory::new_custom(
            self.ids.generate(),
            user_id,
            team_id,
            display_name.to_string(),
        );
        category.sort_order = i32::try_from(insert_at).unwrap_or(i32::MAX);

        sqlx::query(
            "INSERT INTO sidebar_categories \
                 (id, user_id, team_id, type, display_name, sort_order, created_at, updated_at) \
             VALUES ($1, $2, $3, 'custom', $4, $5, $6, $7)",
        )
        .bind(category.id.into_inner())
        .bind(user)
        .bind(team)
        .bind(&category.display_name)
        .bind(category.sort_order)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        for (pos, channel_id) in channel_ids.iter().enumerate() {
            insert_assignment(
                &mut tx,
                category.id.into_inner(),
                channel_id.into_inner(),
                user,
                team,
                i32::try_from(pos).unwrap_or(i32::MAX),
            )
            .await?;
        }

        tx.commit().await.map_err(map_db_error)?;

        for channel_id in moved_from_favorites {
            self.preferences
                .delete_favorite(user_id, Snowflake::new(channel_id))
                .await?;
        }

        Ok(CategoryWithChannels::new(category, channel_ids))
    }

    #[instrument(skip(self, updates))]
    async fn update_categories(
        &self,
        user_id: Snowflake,
        team_id: Snowflake,
        updates: &[CategoryWithChannels],
    ) -> RepoResult<UpdateOutcome> {
        let (memberships, favorites_pref) = self.gather(user_id, team_id).await?;
        let (user, team) = (user_id.into_inner(), team_id.into_inner());

        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        let locked = scope_categories_locked(&mut tx, user, team).await?;
        let assignments = scope_assignments(&mut tx, user, team).await?;

        let mut entities: HashMap<i64, SidebarCategory> = locked
            .into_iter()
            .map(|m| (m.id, SidebarCategory::from(m)))
            .collect();
        let mut explicit = group_assignments(assignments);

        let favorites_id = entities
            .values()
            .find(|c| c.category_type == CategoryType::Favorites)
            .map(|c| c.id.into_inner());
        let explicit_favorites = |explicit: &HashMap<i64, Vec<Snowflake>>| -> HashSet<Snowflake> {
            favorites_id
                .and_then(|id| explicit.get(&id))
                .map(|list| list.iter().copied().collect())
                .unwrap_or_default()
        };
        let favorites_before = explicit_favorites(&explicit);

        let mut original = Vec::with_capacity(updates.len());
        for update in updates {
            let key = update.category.id.into_inner();
            let existing = entities
                .get(&key)
                .ok_or_else(|| category_not_found(update.category.id))?
                .clone();
            original.push(resolve_in_state(
                &existing,
                &explicit,
                &memberships,
                &favorites_pref,
            ));

            let merged = existing.merged_update(&update.category);
            sqlx::query(
                "UPDATE sidebar_categories SET display_name = $2, updated_at = $3 WHERE id = $1",
            )
            .bind(key)
            .bind(&merged.display_name)
            .bind(merged.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

            // The DirectMessages channel list is derived, never stored;
            // submitted lists for it are silently dropped.
            if merged.category_type != CategoryType::DirectMessages {
                let new_list = resolve::dedupe_channels(&update.channels);
                let raw: Vec<i64> = new_list.iter().map(|c| c.into_inner()).collect();

                if !raw.is_empty() {
                    sqlx::query(
                        "DELETE FROM sidebar_channels \
                         WHERE user_id = $1 AND team_id = $2 \
                           AND channel_id = ANY($3) AND category_id <> $4",
                    )
                    .bind(user)
                    .bind(team)
                    .bind(&raw)
                    .bind(key)
                    .execute(&mut *tx)
                    .await
                    .map_err(map_db_error)?;
                }
                for (&cid, list) in &mut explicit {
                    if cid != key {
                        list.retain(|ch| !new_list.contains(ch));
                    }
                }

                sqlx::query("DELETE FROM sidebar_channels WHERE category_id = $1")
                    .bind(key)
                    .execute(&mut *tx)
                    .await
                    .map_err(map_db_error)?;
                for (pos, channel_id) in new_list.iter().enumerate() {
                    insert_assignment(
                        &mut tx,
                        key,
                        channel_id.into_inner(),
                        user,
                        team,
                        i32::try_from(pos).unwrap_or(i32::MAX),
                    )
                    .await?;
                }
                explicit.insert(key, new_list);
            }
            entities.insert(key, merged);
        }

        let favorites_after = explicit_favorites(&explicit);
        let changes = favorite_changes(user_id, &favorites_before, &favorites_after);

        let mut updated = Vec::with_capacity(updates.len());
        for update in updates {
            let entity = entities[&update.category.id.into_inner()].clone();
            updated.push(resolve_in_state(
                &entity,
                &explicit,
                &memberships,
                &favorites_pref,
            ));
        }

        tx.commit().await.map_err(map_db_error)?;
        self.apply_favorite_changes(&changes).await?;

        Ok(UpdateOutcome { updated, original })
    }

    #[instrument(skip(self, order))]
    async fn update_category_order(
        &self,
        user_id: Snowflake,
        team_id: Snowflake,
        order: &[Snowflake],
    ) -> RepoResult<()> {
        let (user, team) = (user_id.into_inner(), team_id.into_inner());

        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        let locked = scope_categories_locked(&mut tx, user, team).await?;

        let current: HashSet<i64> = locked.iter().map(|m| m.id).collect();
        let given: Vec<i64> = order.iter().map(|id| id.into_inner()).collect();
        let given_set: HashSet<i64> = given.iter().copied().collect();
        if given.len() != current.len() || given_set.len() != given.len() || given_set != current {
            return Err(DomainError::InvalidCategoryOrder(
                "order must list each of the scope's category ids exactly once".to_string(),
            ));
        }

        for (pos, id) in given.iter().enumerate() {
            sqlx::query(
                "UPDATE sidebar_categories SET sort_order = $2, updated_at = NOW() WHERE id = $1",
            )
            .bind(id)
            .bind(i32::try_from(pos).unwrap_or(i32::MAX))
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        }

        tx.commit().await.map_err(map_db_error)
    }

    #[instrument(skip(self))]
    async fn delete_category(&self, category_id: Snowflake) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let model = sqlx::query_as::<_, SidebarCategoryModel>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM sidebar_categories WHERE id = $1 FOR UPDATE"
        ))
        .bind(category_id.into_inner())
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_error)?;

        let Some(model) = model else {
            return Err(DomainError::InvalidCategoryDelete(category_id));
        };
        if !model.is_custom() {
            return Err(DomainError::InvalidCategoryDelete(category_id));
        }

        // Assignment rows cascade; the channels return to orphan status and
        // resurface under their default categories at the next read. The
        // remaining sort_order values keep their gap.
        sqlx::query("DELETE FROM sidebar_categories WHERE id = $1")
            .bind(category_id.into_inner())
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)
    }

    #[instrument(skip(self))]
    async fn delete_for_team(&self, user_id: Snowflake, team_id: Snowflake) -> RepoResult<()> {
        let (user, team) = (user_id.into_inner(), team_id.into_inner());

        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        sqlx::query("DELETE FROM sidebar_channels WHERE user_id = $1 AND team_id = $2")
            .bind(user)
            .bind(team)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        sqlx::query("DELETE FROM sidebar_categories WHERE user_id = $1 AND team_id = $2")
            .bind(user)
            .bind(team)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        tx.commit().await.map_err(map_db_error)
    }

    #[instrument(skip(self))]
    async fn apply_preference_change(&self, change: &FavoriteChange) -> RepoResult<()> {
        let user = change.user_id.into_inner();
        let channel = change.channel_id.into_inner();

        if !change.favorited {
            sqlx::query(
                "DELETE FROM sidebar_channels sc USING sidebar_categories c \
                 WHERE sc.category_id = c.id AND c.type = 'favorites' \
                   AND sc.user_id = $1 AND sc.channel_id = $2",
            )
            .bind(user)
            .bind(channel)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
            return Ok(());
        }

        let Some(view) = self.channels.channel(change.channel_id).await? else {
            debug!(channel_id = %change.channel_id, "favorite sync skipped, unknown channel");
            return Ok(());
        };

        // Team channels land in their team's Favorites; direct and group
        // channels have no team and land in every team's Favorites.
        let favorites: Vec<SidebarCategoryModel> = if let Some(team_id) = view.team_id {
            sqlx::query_as::<_, SidebarCategoryModel>(&format!(
                "SELECT {CATEGORY_COLUMNS} FROM sidebar_categories \
                 WHERE user_id = $1 AND team_id = $2 AND type = 'favorites'"
            ))
            .bind(user)
            .bind(team_id.into_inner())
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?
        } else {
            sqlx::query_as::<_, SidebarCategoryModel>(&format!(
                "SELECT {CATEGORY_COLUMNS} FROM sidebar_categories \
                 WHERE user_id = $1 AND type = 'favorites'"
            ))
            .bind(user)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?
        };
        if favorites.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        for category in favorites {
            sqlx::query(
                "DELETE FROM sidebar_channels \
                 WHERE user_id = $1 AND team_id = $2 \
                   AND channel_id = $3 AND category_id <> $4",
            )
            .bind(user)
            .bind(category.team_id)
            .bind(channel)
            .bind(category.id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

            sqlx::query(
                "INSERT INTO sidebar_channels \
                     (category_id, channel_id, user_id, team_id, sort_order) \
                 VALUES ($1, $2, $3, $4, \
                         COALESCE((SELECT MAX(sort_order) + 1 FROM sidebar_channels \
                                   WHERE category_id = $1), 0)) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(category.id)
            .bind(channel)
            .bind(user)
            .bind(category.team_id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        }
        tx.commit().await.map_err(map_db_error)
    }
}
