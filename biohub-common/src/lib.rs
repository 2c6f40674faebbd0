//! # BioHub Common Library
//!
//! Shared code for BioHub services including:
//! - Error types
//! - Bootstrap configuration loading (TOML + environment)
//! - Tracing subscriber initialisation
//! - Database connection pool construction

pub mod config;
pub mod db;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
