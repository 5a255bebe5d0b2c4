//! # Weft Common Library
//!
//! Shared code for the Weft pattern-generation service:
//! - Error types
//! - SSE wire event definitions (StreamEvent enum)
//! - Configuration loading
//! - Saved-composition file format
//! - Pattern-runtime error formatting

pub mod composition;
pub mod config;
pub mod error;
pub mod events;
pub mod runtime_error;

pub use error::{Error, Result};
