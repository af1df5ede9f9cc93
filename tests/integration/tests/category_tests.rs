//! Sidebar category engine contract tests
//!
//! Run against the in-memory backend, which implements the same repository
//! contract as the PostgreSQL one. Covers bootstrap, orphan folding,
//! ordering, immutable-field protection, favorites sync, cascade scoping,
//! and concurrent mutation.

use std::time::Duration;

use integration_tests::fixtures::{
    direct_channel, group_channel, next_id, open_channel, private_channel, TestEnv,
};
use sidebar_core::entities::CategoryType;
use sidebar_core::events::FavoriteChange;
use sidebar_core::traits::{FavoritePreferences, SidebarCategoryRepository};

// ============================================================================
// Bootstrap
// ============================================================================

#[tokio::test]
async fn test_bootstrap_creates_three_defaults_in_order() {
    let env = TestEnv::new();
    let (user, team) = (next_id(), next_id());

    let categories = env.repo.create_initial_categories(user, team).await.unwrap();

    let types: Vec<CategoryType> = categories
        .categories
        .iter()
        .map(|c| c.category.category_type)
        .collect();
    assert_eq!(
        types,
        vec![
            CategoryType::Favorites,
            CategoryType::Channels,
            CategoryType::DirectMessages
        ]
    );
    let names: Vec<&str> = categories
        .categories
        .iter()
        .map(|c| c.category.display_name.as_str())
        .collect();
    assert_eq!(names, vec!["Favorites", "Channels", "Direct Messages"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_bootstrap_concurrent_callers_converge() {
    let env = TestEnv::new();
    let (user, team) = (next_id(), next_id());

    let mut handles = Vec::new();
    for _ in 0..16 {
        let repo = env.repo.clone();
        handles.push(tokio::spawn(async move {
            repo.create_initial_categories(user, team).await
        }));
    }

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap().unwrap());
    }

    // Exactly three categories, and every caller observes the same rows
    for result in &results {
        assert_eq!(result.order.len(), 3);
        assert_eq!(result.order, results[0].order);
    }
}

#[tokio::test]
async fn test_bootstrap_favorites_populated_in_display_name_order() {
    let env = TestEnv::new();
    let (user, team) = (next_id(), next_id());

    let zebra = open_channel(team, "zebra");
    let aardvark = open_channel(team, "aardvark");
    env.directory.join(user, zebra.clone());
    env.directory.join(user, aardvark.clone());
    env.preferences.set_favorite(user, zebra.id).await.unwrap();
    env.preferences.set_favorite(user, aardvark.id).await.unwrap();

    let categories = env.repo.create_initial_categories(user, team).await.unwrap();
    let favorites = categories.find_by_type(CategoryType::Favorites).unwrap();
    assert_eq!(favorites.channels, vec![aardvark.id, zebra.id]);

    // Favorited channels do not also surface under Channels
    let channels = categories.find_by_type(CategoryType::Channels).unwrap();
    assert!(channels.channels.is_empty());
}

#[tokio::test]
async fn test_bootstrap_splits_memberships_by_kind() {
    let env = TestEnv::new();
    let (user, team) = (next_id(), next_id());

    let town = open_channel(team, "town-square");
    let backstage = private_channel(team, "backstage");
    let dm = direct_channel("alice");
    let group = group_channel("alice, bob");
    for view in [&town, &backstage, &dm, &group] {
        env.directory.join(user, view.clone());
    }

    let categories = env.repo.create_initial_categories(user, team).await.unwrap();
    let channels = categories.find_by_type(CategoryType::Channels).unwrap();
    assert_eq!(channels.channels, vec![backstage.id, town.id]);
    let dms = categories.find_by_type(CategoryType::DirectMessages).unwrap();
    assert_eq!(dms.channels, vec![dm.id, group.id]);
}

// ============================================================================
// Orphan folding
// ============================================================================

#[tokio::test]
async fn test_orphan_round_trip_through_custom_category() {
    let env = TestEnv::new();
    let (user, team) = (next_id(), next_id());

    let general = open_channel(team, "general");
    env.directory.join(user, general.clone());
    env.repo.create_initial_categories(user, team).await.unwrap();

    // Orphaned membership surfaces under Channels
    let categories = env.repo.get_categories(user, team).await.unwrap();
    let channels = categories.find_by_type(CategoryType::Channels).unwrap();
    assert_eq!(channels.channels, vec![general.id]);

    // Assigning it to a custom category removes it from the default view
    let custom = env
        .repo
        .create_category(user, team, "Projects", &[general.id])
        .await
        .unwrap();
    let categories = env.repo.get_categories(user, team).await.unwrap();
    let channels = categories.find_by_type(CategoryType::Channels).unwrap();
    assert!(channels.channels.is_empty());

    // Deleting the custom category returns it to orphan status
    env.repo.delete_category(custom.category.id).await.unwrap();
    let categories = env.repo.get_categories(user, team).await.unwrap();
    let channels = categories.find_by_type(CategoryType::Channels).unwrap();
    assert_eq!(channels.channels, vec![general.id]);
}

#[tokio::test]
async fn test_custom_category_keeps_explicit_order() {
    let env = TestEnv::new();
    let (user, team) = (next_id(), next_id());

    let zebra = open_channel(team, "zebra");
    let aardvark = open_channel(team, "aardvark");
    env.directory.join(user, zebra.clone());
    env.directory.join(user, aardvark.clone());
    env.repo.create_initial_categories(user, team).await.unwrap();

    // Explicit order wins over display-name order for custom categories
    let custom = env
        .repo
        .create_category(user, team, "Projects", &[zebra.id, aardvark.id])
        .await
        .unwrap();
    assert_eq!(custom.channels, vec![zebra.id, aardvark.id]);

    let fetched = env.repo.get_category(custom.category.id).await.unwrap();
    assert_eq!(fetched.channels, vec![zebra.id, aardvark.id]);
}

#[tokio::test]
async fn test_cross_team_assignment_does_not_affect_orphan_status() {
    let env = TestEnv::new();
    let user = next_id();
    let (team_a, team_b) = (next_id(), next_id());

    // The same direct channel is visible in both teams' scopes
    let dm = direct_channel("alice");
    env.directory.join(user, dm.clone());
    env.repo.create_initial_categories(user, team_a).await.unwrap();
    env.repo.create_initial_categories(user, team_b).await.unwrap();

    env.repo
        .create_category(user, team_a, "Pinned", &[dm.id])
        .await
        .unwrap();

    // Assignment on team A leaves team B's orphan view untouched
    let categories = env.repo.get_categories(user, team_b).await.unwrap();
    let dms = categories.find_by_type(CategoryType::DirectMessages).unwrap();
    assert_eq!(dms.channels, vec![dm.id]);
}

// ============================================================================
// Custom-category placement
// ============================================================================

#[tokio::test]
async fn test_custom_placement_after_favorites_when_first() {
    let env = TestEnv::new();
    let (user, team) = (next_id(), next_id());
    env.repo.create_initial_categories(user, team).await.unwrap();

    let custom = env
        .repo
        .create_category(user, team, "Projects", &[])
        .await
        .unwrap();

    let categories = env.repo.get_categories(user, team).await.unwrap();
    assert_eq!(categories.order[1], custom.category.id);
    assert_eq!(
        categories.categories[0].category.category_type,
        CategoryType::Favorites
    );
}

#[tokio::test]
async fn test_custom_placement_first_when_favorites_not_first() {
    let env = TestEnv::new();
    let (user, team) = (next_id(), next_id());
    let initial = env.repo.create_initial_categories(user, team).await.unwrap();

    let mut order = initial.order.clone();
    let favorites = order.remove(0);
    order.push(favorites);
    env.repo.update_category_order(user, team, &order).await.unwrap();

    let custom = env
        .repo
        .create_category(user, team, "Projects", &[])
        .await
        .unwrap();

    let categories = env.repo.get_categories(user, team).await.unwrap();
    assert_eq!(categories.order[0], custom.category.id);
}

#[tokio::test]
async fn test_create_category_without_defaults_fails() {
    let env = TestEnv::new();
    let err = env
        .repo
        .create_category(next_id(), next_id(), "Projects", &[])
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_create_category_rejects_empty_name() {
    let env = TestEnv::new();
    let (user, team) = (next_id(), next_id());
    env.repo.create_initial_categories(user, team).await.unwrap();

    let err = env
        .repo
        .create_category(user, team, "   ", &[])
        .await
        .unwrap_err();
    assert!(err.is_invalid_input());
}

// ============================================================================
// Bulk updates and immutable fields
// ============================================================================

#[tokio::test]
async fn test_update_bulk_silently_discards_immutable_fields() {
    let env = TestEnv::new();
    let (user, team) = (next_id(), next_id());
    let initial = env.repo.create_initial_categories(user, team).await.unwrap();

    let mut update = initial
        .find_by_type(CategoryType::Favorites)
        .unwrap()
        .clone();
    update.category.category_type = CategoryType::Custom;
    update.category.user_id = next_id();
    update.category.team_id = next_id();
    update.category.display_name = "Hijacked".to_string();

    // The call succeeds; the persisted values win
    let outcome = env
        .repo
        .update_categories(user, team, &[update])
        .await
        .unwrap();
    let updated = &outcome.updated[0].category;
    assert_eq!(updated.category_type, CategoryType::Favorites);
    assert_eq!(updated.user_id, user);
    assert_eq!(updated.team_id, team);
    assert_eq!(updated.display_name, "Favorites");
}

#[tokio::test]
async fn test_update_bulk_renames_custom_category() {
    let env = TestEnv::new();
    let (user, team) = (next_id(), next_id());
    env.repo.create_initial_categories(user, team).await.unwrap();
    let custom = env
        .repo
        .create_category(user, team, "Projects", &[])
        .await
        .unwrap();

    let mut update = custom.clone();
    update.category.display_name = "Archive".to_string();
    let outcome = env
        .repo
        .update_categories(user, team, &[update])
        .await
        .unwrap();

    assert_eq!(outcome.original[0].category.display_name, "Projects");
    assert_eq!(outcome.updated[0].category.display_name, "Archive");
}

#[tokio::test]
async fn test_update_bulk_ignores_direct_messages_channel_list() {
    let env = TestEnv::new();
    let (user, team) = (next_id(), next_id());

    let dm = direct_channel("alice");
    env.directory.join(user, dm.clone());
    let initial = env.repo.create_initial_categories(user, team).await.unwrap();

    let mut update = initial
        .find_by_type(CategoryType::DirectMessages)
        .unwrap()
        .clone();
    update.channels = vec![];

    let outcome = env
        .repo
        .update_categories(user, team, &[update])
        .await
        .unwrap();
    // The submitted empty list is dropped; the membership still resolves
    assert_eq!(outcome.updated[0].channels, vec![dm.id]);
}

#[tokio::test]
async fn test_update_bulk_moves_channel_between_categories() {
    let env = TestEnv::new();
    let (user, team) = (next_id(), next_id());

    let general = open_channel(team, "general");
    env.directory.join(user, general.clone());
    env.repo.create_initial_categories(user, team).await.unwrap();
    let first = env
        .repo
        .create_category(user, team, "First", &[general.id])
        .await
        .unwrap();
    let second = env
        .repo
        .create_category(user, team, "Second", &[])
        .await
        .unwrap();

    let mut update = second.clone();
    update.channels = vec![general.id];
    env.repo
        .update_categories(user, team, &[update])
        .await
        .unwrap();

    // At most one explicit assignment per (user, team, channel)
    let first = env.repo.get_category(first.category.id).await.unwrap();
    assert!(first.channels.is_empty());
    let second = env.repo.get_category(second.category.id).await.unwrap();
    assert_eq!(second.channels, vec![general.id]);
}

#[tokio::test]
async fn test_update_bulk_unknown_category_fails_not_found() {
    let env = TestEnv::new();
    let (user, team) = (next_id(), next_id());
    let initial = env.repo.create_initial_categories(user, team).await.unwrap();

    let mut update = initial.categories[0].clone();
    update.category.id = next_id();
    let err = env
        .repo
        .update_categories(user, team, &[update])
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_update_bulk_failure_leaves_no_partial_writes() {
    let env = TestEnv::new();
    let (user, team) = (next_id(), next_id());

    let general = open_channel(team, "general");
    env.directory.join(user, general.clone());
    env.repo.create_initial_categories(user, team).await.unwrap();
    let custom = env
        .repo
        .create_category(user, team, "Projects", &[])
        .await
        .unwrap();

    // A valid channel move followed by an unknown category ID
    let mut valid = custom.clone();
    valid.channels = vec![general.id];
    let mut unknown = custom.clone();
    unknown.category.id = next_id();

    let err = env
        .repo
        .update_categories(user, team, &[valid, unknown])
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    // The batch fails as a whole: the valid entry's move did not stick
    let fetched = env.repo.get_category(custom.category.id).await.unwrap();
    assert!(fetched.channels.is_empty());
    let categories = env.repo.get_categories(user, team).await.unwrap();
    let channels = categories.find_by_type(CategoryType::Channels).unwrap();
    assert_eq!(channels.channels, vec![general.id]);
}

// ============================================================================
// Ordering
// ============================================================================

#[tokio::test]
async fn test_update_order_rewrites_positions() {
    let env = TestEnv::new();
    let (user, team) = (next_id(), next_id());
    let initial = env.repo.create_initial_categories(user, team).await.unwrap();

    let mut reversed = initial.order.clone();
    reversed.reverse();
    env.repo
        .update_category_order(user, team, &reversed)
        .await
        .unwrap();

    let categories = env.repo.get_categories(user, team).await.unwrap();
    assert_eq!(categories.order, reversed);
}

#[tokio::test]
async fn test_update_order_rejects_non_permutation() {
    let env = TestEnv::new();
    let (user, team) = (next_id(), next_id());
    let initial = env.repo.create_initial_categories(user, team).await.unwrap();

    // Too few IDs
    let err = env
        .repo
        .update_category_order(user, team, &initial.order[..2])
        .await
        .unwrap_err();
    assert!(err.is_invalid_input());

    // Duplicate IDs
    let duplicated = vec![initial.order[0], initial.order[0], initial.order[1]];
    let err = env
        .repo
        .update_category_order(user, team, &duplicated)
        .await
        .unwrap_err();
    assert!(err.is_invalid_input());

    // Unknown ID
    let mut foreign = initial.order.clone();
    foreign[2] = next_id();
    let err = env
        .repo
        .update_category_order(user, team, &foreign)
        .await
        .unwrap_err();
    assert!(err.is_invalid_input());
}

#[tokio::test]
async fn test_update_order_does_not_touch_content() {
    let env = TestEnv::new();
    let (user, team) = (next_id(), next_id());

    let general = open_channel(team, "general");
    env.directory.join(user, general.clone());
    env.repo.create_initial_categories(user, team).await.unwrap();
    let custom = env
        .repo
        .create_category(user, team, "Projects", &[general.id])
        .await
        .unwrap();

    let categories = env.repo.get_categories(user, team).await.unwrap();
    let mut reversed = categories.order.clone();
    reversed.reverse();
    env.repo
        .update_category_order(user, team, &reversed)
        .await
        .unwrap();

    let fetched = env.repo.get_category(custom.category.id).await.unwrap();
    assert_eq!(fetched.category.display_name, "Projects");
    assert_eq!(fetched.channels, vec![general.id]);
}

// ============================================================================
// Favorites <-> preference sync
// ============================================================================

#[tokio::test]
async fn test_favorites_round_trip_sets_and_clears_preference() {
    let env = TestEnv::new();
    let (user, team) = (next_id(), next_id());

    let general = open_channel(team, "general");
    env.directory.join(user, general.clone());
    let initial = env.repo.create_initial_categories(user, team).await.unwrap();

    let mut update = initial
        .find_by_type(CategoryType::Favorites)
        .unwrap()
        .clone();
    update.channels = vec![general.id];
    env.repo
        .update_categories(user, team, &[update.clone()])
        .await
        .unwrap();
    assert!(env.preferences.is_favorite(user, general.id));

    update.channels = vec![];
    env.repo
        .update_categories(user, team, &[update])
        .await
        .unwrap();
    assert!(!env.preferences.is_favorite(user, general.id));
}

#[tokio::test]
async fn test_favorite_preference_is_cross_team_and_idempotent() {
    let env = TestEnv::new();
    let user = next_id();
    let (team_a, team_b) = (next_id(), next_id());

    let dm = direct_channel("alice");
    env.directory.join(user, dm.clone());
    let initial_a = env.repo.create_initial_categories(user, team_a).await.unwrap();
    env.repo.create_initial_categories(user, team_b).await.unwrap();

    // Favoriting on team A sets the single cross-team preference
    let mut update = initial_a
        .find_by_type(CategoryType::Favorites)
        .unwrap()
        .clone();
    update.channels = vec![dm.id];
    env.repo
        .update_categories(user, team_a, &[update])
        .await
        .unwrap();
    assert!(env.preferences.is_favorite(user, dm.id));

    // Team B observes the already-true preference: the DM folds into its
    // Favorites view without duplicating preference state
    let categories_b = env.repo.get_categories(user, team_b).await.unwrap();
    let favorites_b = categories_b.find_by_type(CategoryType::Favorites).unwrap();
    assert_eq!(favorites_b.channels, vec![dm.id]);
    assert_eq!(env.preferences.favorites(user).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_external_preference_change_updates_categories() {
    let env = TestEnv::new();
    let (user, team) = (next_id(), next_id());

    let general = open_channel(team, "general");
    env.directory.join(user, general.clone());
    env.repo.create_initial_categories(user, team).await.unwrap();

    env.repo
        .apply_preference_change(&FavoriteChange::favorited(user, general.id))
        .await
        .unwrap();
    let categories = env.repo.get_categories(user, team).await.unwrap();
    let favorites = categories.find_by_type(CategoryType::Favorites).unwrap();
    assert_eq!(favorites.channels, vec![general.id]);

    env.repo
        .apply_preference_change(&FavoriteChange::unfavorited(user, general.id))
        .await
        .unwrap();
    let categories = env.repo.get_categories(user, team).await.unwrap();
    let favorites = categories.find_by_type(CategoryType::Favorites).unwrap();
    assert!(favorites.channels.is_empty());
}

#[tokio::test]
async fn test_external_preference_change_unknown_channel_is_silent() {
    let env = TestEnv::new();
    let (user, team) = (next_id(), next_id());
    env.repo.create_initial_categories(user, team).await.unwrap();

    // No category row, no channel row: both directions stay silent
    env.repo
        .apply_preference_change(&FavoriteChange::favorited(user, next_id()))
        .await
        .unwrap();
    env.repo
        .apply_preference_change(&FavoriteChange::unfavorited(user, next_id()))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_moving_channel_out_of_favorites_clears_preference() {
    let env = TestEnv::new();
    let (user, team) = (next_id(), next_id());

    let general = open_channel(team, "general");
    env.directory.join(user, general.clone());
    env.preferences.set_favorite(user, general.id).await.unwrap();
    env.repo.create_initial_categories(user, team).await.unwrap();

    // Bootstrap placed the channel in Favorites; pulling it into a custom
    // category clears the preference
    env.repo
        .create_category(user, team, "Projects", &[general.id])
        .await
        .unwrap();
    assert!(!env.preferences.is_favorite(user, general.id));
}

// ============================================================================
// Team-leave cascade
// ============================================================================

#[tokio::test]
async fn test_team_leave_cascade_is_scoped_to_one_team() {
    let env = TestEnv::new();
    let user = next_id();
    let (team_a, team_b) = (next_id(), next_id());

    let dm = direct_channel("alice");
    env.directory.join(user, dm.clone());
    env.repo.create_initial_categories(user, team_a).await.unwrap();
    env.repo.create_initial_categories(user, team_b).await.unwrap();

    // The same channel is pinned in custom categories on both teams
    env.repo
        .create_category(user, team_a, "Pinned", &[dm.id])
        .await
        .unwrap();
    let pinned_b = env
        .repo
        .create_category(user, team_b, "Pinned", &[dm.id])
        .await
        .unwrap();

    env.repo.delete_for_team(user, team_a).await.unwrap();

    let gone = env.repo.get_categories(user, team_a).await.unwrap();
    assert!(gone.categories.is_empty());

    // Team B's rows survive even though they reference the same channel ID
    let kept = env.repo.get_categories(user, team_b).await.unwrap();
    assert_eq!(kept.categories.len(), 4);
    let pinned_b = env.repo.get_category(pinned_b.category.id).await.unwrap();
    assert_eq!(pinned_b.channels, vec![dm.id]);
}

// ============================================================================
// Deletion
// ============================================================================

#[tokio::test]
async fn test_delete_rules() {
    let env = TestEnv::new();
    let (user, team) = (next_id(), next_id());
    let initial = env.repo.create_initial_categories(user, team).await.unwrap();

    for category in &initial.categories {
        let err = env
            .repo
            .delete_category(category.category.id)
            .await
            .unwrap_err();
        assert!(err.is_invalid_input());
    }

    let custom = env
        .repo
        .create_category(user, team, "Projects", &[])
        .await
        .unwrap();
    env.repo.delete_category(custom.category.id).await.unwrap();

    // Double delete is invalid input, like deleting a default
    let err = env
        .repo
        .delete_category(custom.category.id)
        .await
        .unwrap_err();
    assert!(err.is_invalid_input());
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_delete_update_race_completes_without_deadlock() {
    let env = TestEnv::new();
    let (user, team) = (next_id(), next_id());

    let general = open_channel(team, "general");
    env.directory.join(user, general.clone());
    env.repo.create_initial_categories(user, team).await.unwrap();

    let run = async {
        for _ in 0..50 {
            let custom = env
                .repo
                .create_category(user, team, "Racer", &[])
                .await
                .unwrap();

            let mut update = custom.clone();
            update.channels = vec![general.id];
            let repo_a = env.repo.clone();
            let updater = tokio::spawn(async move {
                repo_a.update_categories(user, team, &[update]).await
            });
            let repo_b = env.repo.clone();
            let id = custom.category.id;
            let deleter = tokio::spawn(async move { repo_b.delete_category(id).await });

            // Both must finish; the update may lose the race with NotFound
            if let Err(err) = updater.await.unwrap() {
                assert!(err.is_not_found());
            }
            deleter.await.unwrap().unwrap();
        }
    };

    tokio::time::timeout(Duration::from_secs(30), run)
        .await
        .expect("operations deadlocked");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_parallel_scopes_do_not_contend() {
    let env = TestEnv::new();
    let user = next_id();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let team = next_id();
        let repo = env.repo.clone();
        handles.push(tokio::spawn(async move {
            repo.create_initial_categories(user, team).await.unwrap();
            let custom = repo
                .create_category(user, team, "Projects", &[])
                .await
                .unwrap();
            repo.delete_category(custom.category.id).await.unwrap();
            repo.get_categories(user, team).await.unwrap()
        }));
    }

    for handle in handles {
        let categories = handle.await.unwrap();
        assert_eq!(categories.categories.len(), 3);
    }
}
