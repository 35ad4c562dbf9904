//! # Cabinet Common Library
//!
//! Shared code for the cabinet import tooling:
//! - Database schema, initialization and migrations
//! - Record models and lookup queries
//! - Configuration loading and root folder resolution
//! - Date format detection and normalization

pub mod config;
pub mod dates;
pub mod db;
pub mod error;

pub use error::{Error, Result};
