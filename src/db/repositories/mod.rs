//! Store operations, implemented as `impl Database` blocks per table group.

pub mod sessions;
pub mod users;
