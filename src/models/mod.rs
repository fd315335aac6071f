// src/models/mod.rs

//! Domain models for the watcher.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod program;
mod selectors;
mod snapshot;
mod subscriber;

// Re-export all public types
pub use config::{
    BOT_TOKEN_ENV, Config, HttpConfig, NotifyConfig, PipelineConfig, SourceConfig, StorageConfig,
    TelegramConfig, is_valid_source_id,
};
pub use program::{IdentityKey, ProgramEntry, Screening, normalize_title};
pub use selectors::{DetailSelectors, ListingSelectors, ScreeningSelectors};
pub use snapshot::Snapshot;
pub use subscriber::{ALL_SOURCES, Subscriber};
