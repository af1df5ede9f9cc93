//! Domain events - side-effect commands emitted by category writes

mod favorite_change;

pub use favorite_change::{favorite_changes, FavoriteChange};
