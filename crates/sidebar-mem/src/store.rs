//! In-memory implementation of the sidebar category repository
//!
//! Scopes are sharded by (user, team) in a concurrent map; each scope is
//! guarded by its own mutex so callers on different scopes never contend.
//! Collaborator reads happen before the scope lock is taken and preference
//! writes after it is released, so no external call runs under the lock.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
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

type ScopeKey = (Snowflake, Snowflake);

/// One (user, team) scope: its categories and their explicit assignments,
/// keyed by category ID.
#[derive(Debug, Clone, Default)]
struct Scope {
    categories: Vec<SidebarCategory>,
    explicit: HashMap<i64, Vec<Snowflake>>,
}

impl Scope {
    fn sorted(&self) -> Vec<SidebarCategory> {
        let mut categories = self.categories.clone();
        categories.sort_by_key(|c| (c.sort_order, c.id));
        categories
    }

    fn find(&self, id: Snowflake) -> Option<&SidebarCategory> {
        self.categories.iter().find(|c| c.id == id)
    }

    fn find_mut(&mut self, id: Snowflake) -> Option<&mut SidebarCategory> {
        self.categories.iter_mut().find(|c| c.id == id)
    }

    fn favorites_id(&self) -> Option<i64> {
        self.categories
            .iter()
            .find(|c| c.category_type == CategoryType::Favorites)
            .map(|c| c.id.into_inner())
    }

    fn explicit_favorites(&self) -> HashSet<Snowflake> {
        self.favorites_id()
            .and_then(|id| self.explicit.get(&id))
            .map(|list| list.iter().copied().collect())
            .unwrap_or_default()
    }

    fn resolve(
        &self,
        entity: &SidebarCategory,
        memberships: &[ChannelView],
        favorites: &HashSet<Snowflake>,
    ) -> CategoryWithChannels {
        let assigned: HashSet<Snowflake> = self.explicit.values().flatten().copied().collect();
        let list = self
            .explicit
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

    fn resolve_all(
        &self,
        memberships: &[ChannelView],
        favorites: &HashSet<Snowflake>,
    ) -> OrderedCategories {
        let categories = self
            .sorted()
            .iter()
            .map(|entity| self.resolve(entity, memberships, favorites))
            .collect();
        OrderedCategories::new(categories)
    }
}

/// In-memory sidebar category repository
pub struct MemSidebarCategoryRepository {
    scopes: DashMap<ScopeKey, Arc<Mutex<Scope>>>,
    channels: Arc<dyn ChannelDirectory>,
    preferences: Arc<dyn FavoritePreferences>,
    ids: Arc<SnowflakeGenerator>,
}

impl MemSidebarCategoryRepository {
    pub fn new(
        channels: Arc<dyn ChannelDirectory>,
        preferences: Arc<dyn FavoritePreferences>,
    ) -> Self {
        Self::with_worker_id(channels, preferences, 0)
    }

    /// # Panics
    /// Panics if `worker_id` >= 1024.
    pub fn with_worker_id(
        channels: Arc<dyn ChannelDirectory>,
        preferences: Arc<dyn FavoritePreferences>,
        worker_id: u16,
    ) -> Self {
        Self {
            scopes: DashMap::new(),
            channels,
            preferences,
            ids: Arc::new(SnowflakeGenerator::new(worker_id)),
        }
    }

    fn scope(&self, key: ScopeKey) -> Arc<Mutex<Scope>> {
        self.scopes.entry(key).or_default().clone()
    }

    async fn gather(
        &self,
        user_id: Snowflake,
        team_id: Snowflake,
    ) -> RepoResult<(Vec<ChannelView>, HashSet<Snowflake>)> {
        let memberships = self.channels.member_channels(user_id, team_id).await?;
        let favorites = self.preferences.favorites(user_id).await?;
        Ok((memberships, favorites))
    }

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

#[async_trait]
impl SidebarCategoryRepository for MemSidebarCategoryRepository {
    #[instrument(skip(self))]
    async fn create_initial_categories(
        &self,
        user_id: Snowflake,
        team_id: Snowflake,
    ) -> RepoResult<OrderedCategories> {
        let (memberships, favorites) = self.gather(user_id, team_id).await?;

        let scope_arc = self.scope((user_id, team_id));
        let mut scope = scope_arc.lock();
        if scope.categories.is_empty() {
            // First caller under the scope lock wins; later callers see a
            // non-empty scope and return it unchanged.
            let favorites_cat = SidebarCategory::new_default(
                self.ids.generate(),
                user_id,
                team_id,
                CategoryType::Favorites,
                0,
            );
            let favorited = memberships.iter().filter(|ch| favorites.contains(&ch.id));
            scope.explicit.insert(
                favorites_cat.id.into_inner(),
                resolve::sorted_by_display_name(favorited),
            );
            scope.categories.push(favorites_cat);
            scope.categories.push(SidebarCategory::new_default(
                self.ids.generate(),
                user_id,
                team_id,
                CategoryType::Channels,
                1,
            ));
            scope.categories.push(SidebarCategory::new_default(
                self.ids.generate(),
                user_id,
                team_id,
                CategoryType::DirectMessages,
                2,
            ));
        }
        Ok(scope.resolve_all(&memberships, &favorites))
    }

    #[instrument(skip(self))]
    async fn get_categories(
        &self,
        user_id: Snowflake,
        team_id: Snowflake,
    ) -> RepoResult<OrderedCategories> {
        let (memberships, favorites) = self.gather(user_id, team_id).await?;

        let snapshot = self
            .scopes
            .get(&(user_id, team_id))
            .map(|entry| entry.lock().clone())
            .unwrap_or_default();
        Ok(snapshot.resolve_all(&memberships, &favorites))
    }

    #[instrument(skip(self))]
    async fn get_category(&self, category_id: Snowflake) -> RepoResult<CategoryWithChannels> {
        let mut found: Option<(ScopeKey, Scope)> = None;
        for entry in &self.scopes {
            let scope = entry.value().lock();
            if scope.find(category_id).is_some() {
                found = Some((*entry.key(), scope.clone()));
                break;
            }
        }
        let Some(((user_id, team_id), snapshot)) = found else {
            return Err(DomainError::CategoryNotFound(category_id));
        };

        let (memberships, favorites) = self.gather(user_id, team_id).await?;
        let entity = snapshot
            .find(category_id)
            .cloned()
            .ok_or(DomainError::CategoryNotFound(category_id))?;
        Ok(snapshot.resolve(&entity, &memberships, &favorites))
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

        let scope_arc = self.scope((user_id, team_id));
        let (category, moved_from_favorites) = {
            let mut scope = scope_arc.lock();
            if scope.categories.is_empty() {
                return Err(DomainError::DefaultCategoriesMissing { user_id, team_id });
            }

            let explicit_favorites = scope.explicit_favorites();
            let moved: Vec<Snowflake> = channel_ids
                .iter()
                .copied()
                .filter(|ch| explicit_favorites.contains(ch))
                .collect();

            // Assigned channels move here from wherever they were
            for list in scope.explicit.values_mut() {
                list.retain(|ch| !channel_ids.contains(ch));
            }

            let ordered = scope.sorted();
            let insert_at = custom_insert_index(&ordered);
            for (idx, existing) in ordered.iter().enumerate() {
                let new_order = if idx >= insert_at { idx + 1 } else { idx };
                let new_order = i32::try_from(new_order).unwrap_or(i32::MAX);
                if let Some(slot) = scope.find_mut(existing.id) {
                    if slot.sort_order != new_order {
                        slot.sort_order = new_order;
                        slot.updated_at = Utc::now();
                    }
                }
            }

            let mut category = SidebarCategory::new_custom(
                self.ids.generate(),
                user_id,
                team_id,
                display_name.to_string(),
            );
            category.sort_order = i32::try_from(insert_at).unwrap_or(i32::MAX);
            scope
                .explicit
                .insert(category.id.into_inner(), channel_ids.clone());
            scope.categories.push(category.clone());
            (category, moved)
        };

        for channel_id in moved_from_favorites {
            self.preferences.delete_favorite(user_id, channel_id).await?;
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

        let scope_arc = self.scope((user_id, team_id));
        let (outcome, changes) = {
            let mut scope = scope_arc.lock();
            // Mutations are staged on a copy so an unknown ID anywhere in the
            // batch leaves the scope untouched; the copy replaces the scope
            // only once every entry has applied.
            let mut staged = scope.clone();
            let favorites_before = staged.explicit_favorites();

            let mut original = Vec::with_capacity(updates.len());
            for update in updates {
                let existing = staged
                    .find(update.category.id)
                    .cloned()
                    .ok_or(DomainError::CategoryNotFound(update.category.id))?;
                original.push(staged.resolve(&existing, &memberships, &favorites_pref));

                let merged = existing.merged_update(&update.category);

                // The DirectMessages channel list is derived, never stored;
                // submitted lists for it are silently dropped.
                if merged.category_type != CategoryType::DirectMessages {
                    let new_list = resolve::dedupe_channels(&update.channels);
                    let key = merged.id.into_inner();
                    for (&cid, list) in &mut staged.explicit {
                        if cid != key {
                            list.retain(|ch| !new_list.contains(ch));
                        }
                    }
                    staged.explicit.insert(key, new_list);
                }
                if let Some(slot) = staged.find_mut(merged.id) {
                    *slot = merged;
                }
            }

            let favorites_after = staged.explicit_favorites();
            let changes = favorite_changes(user_id, &favorites_before, &favorites_after);

            let mut updated = Vec::with_capacity(updates.len());
            for update in updates {
                let entity = staged
                    .find(update.category.id)
                    .cloned()
                    .ok_or(DomainError::CategoryNotFound(update.category.id))?;
                updated.push(staged.resolve(&entity, &memberships, &favorites_pref));
            }

            *scope = staged;
            (UpdateOutcome { updated, original }, changes)
        };

        self.apply_favorite_changes(&changes).await?;
        Ok(outcome)
    }

    #[instrument(skip(self, order))]
    async fn update_category_order(
        &self,
        user_id: Snowflake,
        team_id: Snowflake,
        order: &[Snowflake],
    ) -> RepoResult<()> {
        let scope_arc = self.scope((user_id, team_id));
        let mut scope = scope_arc.lock();

        let current: HashSet<Snowflake> = scope.categories.iter().map(|c| c.id).collect();
        let given_set: HashSet<Snowflake> = order.iter().copied().collect();
        if order.len() != current.len() || given_set.len() != order.len() || given_set != current {
            return Err(DomainError::InvalidCategoryOrder(
                "order must list each of the scope's category ids exactly once".to_string(),
            ));
        }

        for (pos, id) in order.iter().enumerate() {
            if let Some(slot) = scope.find_mut(*id) {
                slot.sort_order = i32::try_from(pos).unwrap_or(i32::MAX);
                slot.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_category(&self, category_id: Snowflake) -> RepoResult<()> {
        for entry in &self.scopes {
            let mut scope = entry.value().lock();
            if let Some(idx) = scope.categories.iter().position(|c| c.id == category_id) {
                if scope.categories[idx].is_default() {
                    return Err(DomainError::InvalidCategoryDelete(category_id));
                }
                // Channels return to orphan status; remaining sort_order
                // values keep their gap.
                scope.categories.remove(idx);
                scope.explicit.remove(&category_id.into_inner());
                return Ok(());
            }
        }
        Err(DomainError::InvalidCategoryDelete(category_id))
    }

    #[instrument(skip(self))]
    async fn delete_for_team(&self, user_id: Snowflake, team_id: Snowflake) -> RepoResult<()> {
        self.scopes.remove(&(user_id, team_id));
        Ok(())
    }

    #[instrument(skip(self))]
    async fn apply_preference_change(&self, change: &FavoriteChange) -> RepoResult<()> {
        if !change.favorited {
            for entry in &self.scopes {
                if entry.key().0 != change.user_id {
                    continue;
                }
                let mut scope = entry.value().lock();
                if let Some(favorites_id) = scope.favorites_id() {
                    if let Some(list) = scope.explicit.get_mut(&favorites_id) {
                        list.retain(|ch| *ch != change.channel_id);
                    }
                }
            }
            return Ok(());
        }

        let Some(view) = self.channels.channel(change.channel_id).await? else {
            debug!(channel_id = %change.channel_id, "favorite sync skipped, unknown channel");
            return Ok(());
        };

        // Team channels land in their team's Favorites; direct and group
        // channels have no team and land in every team's Favorites.
        for entry in &self.scopes {
            let (user, team) = *entry.key();
            if user != change.user_id {
                continue;
            }
            if let Some(channel_team) = view.team_id {
                if channel_team != team {
                    continue;
                }
            }
            let mut scope = entry.value().lock();
            let Some(favorites_id) = scope.favorites_id() else {
                continue;
            };
            for (&cid, list) in &mut scope.explicit {
                if cid != favorites_id {
                    list.retain(|ch| *ch != change.channel_id);
                }
            }
            let list = scope.explicit.entry(favorites_id).or_default();
            if !list.contains(&change.channel_id) {
                list.push(change.channel_id);
            }
        }
        Ok(())
    }
}
