//! reel-import library interface
//!
//! Decision pipeline that pulls movie lists from external sources, filters them with
//! user-authored rules and adds accepted movies to the media manager:
//! - `rules`: rule language compiler and evaluator
//! - `dedup`: in-memory dedup cache
//! - `registry`: list type tag → list source
//! - `importer`: per-list / per-item state machine
//! - `notification`: event dispatcher and notification agents
//! - `clients`, `sources`: HTTP collaborators
//! - `bootstrap`: wiring from configuration

pub mod bootstrap;
pub mod clients;
pub mod dedup;
pub mod error;
pub mod importer;
pub mod notification;
pub mod registry;
pub mod rules;
pub mod sources;
pub mod types;

pub use crate::error::{ClientError, ImportError};
pub use crate::importer::{Importer, ItemOutcome, ListSummary, RunSummary};
