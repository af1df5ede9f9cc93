//! Channel view - what the channel collaborator reports about a membership

use serde::{Deserialize, Serialize};

use crate::entities::CategoryType;
use crate::value_objects::Snowflake;

/// Channel kind enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Public team channel
    #[default]
    Open,
    /// Private team channel
    Private,
    /// One-to-one direct message
    Direct,
    /// Group message
    Group,
}

impl ChannelKind {
    /// Direct and group channels live outside any single team
    #[inline]
    #[must_use]
    pub fn is_direct_like(self) -> bool {
        matches!(self, Self::Direct | Self::Group)
    }
}

/// A channel membership as seen by the category engine.
///
/// Display names arrive already resolved: for direct/group channels the
/// collaborator substitutes the other participants' identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelView {
    pub id: Snowflake,
    /// None for direct/group channels, which are team-agnostic
    pub team_id: Option<Snowflake>,
    pub kind: ChannelKind,
    pub display_name: String,
}

impl ChannelView {
    /// The default category an unassigned membership of this channel
    /// surfaces under
    #[must_use]
    pub fn default_category(&self, favorited: bool) -> CategoryType {
        if favorited {
            CategoryType::Favorites
        } else if self.kind.is_direct_like() {
            CategoryType::DirectMessages
        } else {
            CategoryType::Channels
        }
    }

    /// Whether this channel belongs to the given team's sidebar scope
    #[must_use]
    pub fn in_team(&self, team_id: Snowflake) -> bool {
        match self.team_id {
            Some(t) => t == team_id,
            None => true,
        }
    }
}
