//! # inb4 Common Library
//!
//! Shared code for the inb4 listening-history importer:
//! - Error types
//! - Configuration resolution
//! - Database initialization and row models
//! - Date range handling

pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
pub use time::DateRange;
