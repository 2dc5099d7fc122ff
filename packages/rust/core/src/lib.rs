//! Crawl orchestration for modbind.
//!
//! Wires the page context (discovery), the background orchestrator
//! (fetching) and the viewer context (assembly and rendering) together over
//! typed channels, and exposes the end-to-end `run_crawl` workflow.

pub mod channel;
pub mod orchestrator;
pub mod page;
pub mod pipeline;
pub mod viewer;

pub use channel::{StatusBus, WireMessage};
pub use orchestrator::{Orchestrator, ViewerSettings};
pub use pipeline::{CrawlConfig, CrawlOutcome, CrawlServices, discover_pages, run_crawl};
