//! Viewer-side assembly and rendering.
//!
//! Takes the ordered document texts delivered by the orchestrator, merges
//! their `<main>` regions with page breaks between documents, and renders the
//! result as a standalone HTML page or as Markdown (via `htmd`).

mod assemble;
mod cleanup;
mod document;

pub use assemble::{MergedContent, MergedNode, PAGE_BREAK_HTML, assemble};
pub use document::{RenderOptions, RenderedDocument, render};
