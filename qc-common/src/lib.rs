//! # QC Index Common Library
//!
//! Shared code for the QC indexing tools:
//! - Database schema creation and persisted row models
//! - Bootstrap configuration and database path resolution
//! - Common error type

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
