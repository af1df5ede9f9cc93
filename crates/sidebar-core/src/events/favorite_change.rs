//! Favorite-preference sync commands
//!
//! A channel's presence in a user's Favorites category must mirror a single
//! cross-team favorite preference keyed by (user, channel). Each category
//! write that changes Favorites membership emits one `FavoriteChange` per
//! affected channel; applying a change is idempotent, so replays and
//! concurrent duplicates are harmless.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// Command to bring the favorite preference in line with Favorites membership
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteChange {
    pub user_id: Snowflake,
    pub channel_id: Snowflake,
    pub favorited: bool,
}

impl FavoriteChange {
    /// Channel entered the Favorites category
    #[must_use]
    pub fn favorited(user_id: Snowflake, channel_id: Snowflake) -> Self {
        Self {
            user_id,
            channel_id,
            favorited: true,
        }
    }

    /// Channel left the Favorites category
    #[must_use]
    pub fn unfavorited(user_id: Snowflake, channel_id: Snowflake) -> Self {
        Self {
            user_id,
            channel_id,
            favorited: false,
        }
    }
}

/// Diff the explicit Favorites membership before and after a write into the
/// sync commands it implies.
#[must_use]
pub fn favorite_changes(
    user_id: Snowflake,
    before: &HashSet<Snowflake>,
    after: &HashSet<Snowflake>,
) -> Vec<FavoriteChange> {
    let mut changes: Vec<FavoriteChange> = after
        .difference(before)
        .map(|&channel_id| FavoriteChange::favorited(user_id, channel_id))
        .collect();
    changes.extend(
        before
            .difference(after)
            .map(|&channel_id| FavoriteChange::unfavorited(user_id, channel_id)),
    );
    changes
}
