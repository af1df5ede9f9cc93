//! Domain entities for the sidebar category engine

mod category;
mod channel;

pub use category::{
    custom_insert_index, CategoryType, CategoryWithChannels, OrderedCategories, SidebarCategory,
    UpdateOutcome,
};
pub use channel::{ChannelKind, ChannelView};
