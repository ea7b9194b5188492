//! # reel common library
//!
//! Shared code for the reel list importer:
//! - List item and movie candidate models
//! - Configuration schema and loading
//! - Import lifecycle events (ImportEvent enum) and the in-process EventBus
//! - Common error type

pub mod config;
pub mod error;
pub mod events;
pub mod models;

pub use error::{Error, Result};
pub use models::{ListItem, MovieCandidate, Ratings};
