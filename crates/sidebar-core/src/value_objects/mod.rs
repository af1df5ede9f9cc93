//! Value objects for the sidebar domain

mod snowflake;

pub use snowflake::{Snowflake, SnowflakeGenerator, SnowflakeParseError};
