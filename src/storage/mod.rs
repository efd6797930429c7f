pub(crate) mod accounts;
pub(crate) mod entries;
mod error;
mod repository;
mod scope;
pub(crate) mod transfers;

pub use error::*;
pub use repository::*;
pub use scope::*;

/// SQL migration for initial schema
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");
