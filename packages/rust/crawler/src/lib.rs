//! Orchestrator-side retrieval of page content.
//!
//! This crate provides:
//! - [`ContentServiceClient`]: two-stage client for the rich-content service
//! - [`ContentSlots`]: index-correlated result storage
//! - [`OrderPreservingFetcher`]: concurrent, cancellation-aware fan-out

mod content;
mod fetcher;
mod slots;

pub use content::{ContentServiceClient, ContentSource};
pub use fetcher::OrderPreservingFetcher;
pub use slots::ContentSlots;
