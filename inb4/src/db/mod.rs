//! Play storage
//!
//! Find-or-create persistence for artists, albums, tracks and users, and
//! the [`PlayStore`] that ties them together per play.

pub mod entities;
pub mod plays;
pub mod users;

pub use entities::{EntityTable, NewEntity};
pub use plays::PlayStore;
