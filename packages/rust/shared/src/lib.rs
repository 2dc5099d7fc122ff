//! Shared types, error model, and configuration for modbind.
//!
//! This crate is the foundation depended on by all other modbind crates.
//! It provides:
//! - [`ModbindError`]: the unified error type
//! - Domain types ([`TraversalCursor`], [`PageId`], [`CrawlRequest`], [`StatusEvent`])
//! - Configuration ([`AppConfig`], config loading)
//! - The [`StatusSink`] progress seam

pub mod config;
pub mod error;
pub mod status;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ContentServiceConfig, HttpConfig, LmsConfig, OutputConfig, OutputFormat,
    RegionPolicy, TraversalConfig, config_dir, config_file_path, init_config, load_config,
    load_config_from,
};
pub use error::{ModbindError, Result};
pub use status::{SilentStatus, StatusSink};
pub use types::{
    ContentDelivery, CrawlId, CrawlRequest, CredentialContext, PageId, StatusEvent,
    TraversalCursor,
};
