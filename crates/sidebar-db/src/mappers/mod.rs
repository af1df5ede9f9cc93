//! Entity <-> model mappers

mod category;

pub use category::group_assignments;
