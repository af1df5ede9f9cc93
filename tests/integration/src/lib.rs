//! Integration test support for the sidebar category engine
//!
//! The tests run against the in-memory backend so they exercise the full
//! repository contract without external services.

pub mod fixtures;
