//! In-memory sidebar category backend
//!
//! Implements the same contract as the PostgreSQL backend on top of a
//! sharded map of per-(user, team) scopes, each guarded by its own mutex.
//! Also provides seedable in-memory collaborators for the channel directory
//! and the favorite-preference store, used as fixtures by the test suites.

pub mod directory;
pub mod preferences;
pub mod store;

pub use directory::MemChannelDirectory;
pub use preferences::MemFavoritePreferences;
pub use store::MemSidebarCategoryRepository;
