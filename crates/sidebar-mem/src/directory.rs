//! Seedable in-memory channel directory

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};

use sidebar_core::entities::ChannelView;
use sidebar_core::error::DomainError;
use sidebar_core::traits::ChannelDirectory;
use sidebar_core::value_objects::Snowflake;

/// In-memory channel directory, seeded by tests and demos.
#[derive(Default)]
pub struct MemChannelDirectory {
    channels: DashMap<Snowflake, ChannelView>,
    /// (user, channel) membership pairs
    members: DashSet<(Snowflake, Snowflake)>,
}

impl MemChannelDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a channel.
    pub fn add_channel(&self, view: ChannelView) {
        self.channels.insert(view.id, view);
    }

    pub fn add_member(&self, user_id: Snowflake, channel_id: Snowflake) {
        self.members.insert((user_id, channel_id));
    }

    pub fn remove_member(&self, user_id: Snowflake, channel_id: Snowflake) {
        self.members.remove(&(user_id, channel_id));
    }

    /// Register a channel and make the user a member of it in one step.
    pub fn join(&self, user_id: Snowflake, view: ChannelView) {
        self.add_member(user_id, view.id);
        self.add_channel(view);
    }

    pub fn rename_channel(&self, channel_id: Snowflake, display_name: &str) {
        if let Some(mut view) = self.channels.get_mut(&channel_id) {
            view.display_name = display_name.to_string();
        }
    }
}

#[async_trait]
impl ChannelDirectory for MemChannelDirectory {
    async fn member_channels(
        &self,
        user_id: Snowflake,
        team_id: Snowflake,
    ) -> Result<Vec<ChannelView>, DomainError> {
        let mut views: Vec<ChannelView> = self
            .members
            .iter()
            .filter(|pair| pair.0 == user_id)
            .filter_map(|pair| self.channels.get(&pair.1).map(|v| v.value().clone()))
            .filter(|view| view.in_team(team_id))
            .collect();
        views.sort_by_key(|v| v.id);
        Ok(views)
    }

    async fn channel(&self, channel_id: Snowflake) -> Result<Option<ChannelView>, DomainError> {
        Ok(self.channels.get(&channel_id).map(|v| v.value().clone()))
    }
}
