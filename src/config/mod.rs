//! Configuration module for sitepipe
//!
//! Provides types, discovery and loading for `sitepipe.toml` project configuration.

pub mod loader;
pub mod schema;

pub use loader::*;
pub use schema::*;
