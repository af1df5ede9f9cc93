//! # sidebar-db
//!
//! Database layer implementing the sidebar category repository with
//! PostgreSQL via SQLx.
//!
//! ## Overview
//!
//! - Connection pool management
//! - Database models with SQLx `FromRow` derives
//! - Entity ↔ Model mappers
//! - `PgSidebarCategoryRepository`, the transactional category engine
//!
//! Every multi-row mutation runs in a transaction; conflicting writers on
//! the same (user, team) scope serialize on `FOR UPDATE` row locks taken in
//! deterministic order, and the idempotent bootstrap settles races through
//! the partial unique index on default category types.

pub mod mappers;
pub mod models;
pub mod pool;
pub mod repositories;

// Re-export commonly used types
pub use pool::{create_pool, create_pool_from_env, DatabaseConfig, PgPool};
pub use repositories::PgSidebarCategoryRepository;

/// Embedded migrations for the sidebar tables
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
