//! PostgreSQL repository implementations

mod category;
mod error;

pub use category::PgSidebarCategoryRepository;
pub use error::{category_not_found, map_db_error};
