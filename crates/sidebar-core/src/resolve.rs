//! Effective channel-list resolution
//!
//! Default categories are populated as a view at read time: explicit
//! assignments first, then "orphaned" memberships (channels not explicitly
//! assigned to any category in the team) folded in by kind. Computing the
//! list at read time avoids dual-write drift between the membership tables
//! and the category assignment rows.

use std::collections::HashSet;

use crate::entities::{CategoryType, ChannelView};
use crate::value_objects::Snowflake;

/// Sort channels by display name ascending (case-sensitive codepoint order),
/// channel ID as tiebreak, and return their IDs.
#[must_use]
pub fn sorted_by_display_name<'a, I>(channels: I) -> Vec<Snowflake>
where
    I: IntoIterator<Item = &'a ChannelView>,
{
    let mut views: Vec<&ChannelView> = channels.into_iter().collect();
    views.sort_by(|a, b| {
        a.display_name
            .cmp(&b.display_name)
            .then_with(|| a.id.cmp(&b.id))
    });
    views.into_iter().map(|c| c.id).collect()
}

/// Drop duplicate channel IDs, keeping the first occurrence's position.
#[must_use]
pub fn dedupe_channels(channels: &[Snowflake]) -> Vec<Snowflake> {
    let mut seen = HashSet::new();
    channels
        .iter()
        .copied()
        .filter(|ch| seen.insert(*ch))
        .collect()
}

/// Compute the effective channel list for one category.
///
/// Custom categories use their explicit stored order verbatim. Default
/// categories get their explicit assignments followed by the orphaned
/// memberships that fold into this category: favorited orphans go to
/// Favorites, direct/group orphans to DirectMessages, the rest to Channels.
///
/// `memberships` must already be scoped to the category's team; `assigned`
/// is the union of explicit assignments across *all* of the team's
/// categories, which is what makes a membership an orphan or not.
#[must_use]
pub fn effective_channels(
    category_type: CategoryType,
    explicit: &[Snowflake],
    memberships: &[ChannelView],
    assigned: &HashSet<Snowflake>,
    favorites: &HashSet<Snowflake>,
) -> Vec<Snowflake> {
    if category_type == CategoryType::Custom {
        return explicit.to_vec();
    }

    let mut result = explicit.to_vec();
    let seen: HashSet<Snowflake> = result.iter().copied().collect();

    let orphans = memberships.iter().filter(|ch| {
        !assigned.contains(&ch.id)
            && !seen.contains(&ch.id)
            && ch.default_category(favorites.contains(&ch.id)) == category_type
    });

    result.extend(sorted_by_display_name(orphans));
    result
}
