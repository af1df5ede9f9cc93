//! Database models (SQLx `FromRow` structs)

mod category;

pub use category::{SidebarCategoryModel, SidebarChannelModel};
