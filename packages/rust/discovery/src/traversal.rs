//! Sequential module traversal.
//!
//! Each step depends on the previous step's result, so the walk is strictly
//! sequential: resolve the current item, dereference its page locator for a
//! page id, then move to the next item. The walk stops right after the step
//! whose next item lives in a different module.

use std::collections::HashSet;

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use modbind_shared::{ModbindError, PageId, Result, StatusSink, TraversalCursor};

/// Resolves a module item to its position in the module sequence.
#[async_trait]
pub trait ModuleItemResolver: Send + Sync {
    async fn resolve_module_item(&self, course: &str, item_id: &str) -> Result<TraversalCursor>;
}

/// Dereferences a page locator (following redirects) to the page's id.
#[async_trait]
pub trait PageMetadataSource: Send + Sync {
    /// Returns `None` when the page has no retrievable content id.
    async fn page_id_at(&self, page_url: &str) -> Result<Option<PageId>>;
}

/// Walks one module's linear page chain.
pub struct TraversalEngine<'a> {
    resolver: &'a dyn ModuleItemResolver,
    metadata: &'a dyn PageMetadataSource,
    max_steps: usize,
}

impl<'a> TraversalEngine<'a> {
    pub fn new(
        resolver: &'a dyn ModuleItemResolver,
        metadata: &'a dyn PageMetadataSource,
        max_steps: usize,
    ) -> Self {
        Self {
            resolver,
            metadata,
            max_steps,
        }
    }

    /// Discover the page ids of the module containing `start_item`, in order.
    ///
    /// At least one step always runs. Any resolver or metadata failure aborts
    /// the walk; no partial list is returned.
    #[instrument(skip_all, fields(course = %course, start_item = %start_item))]
    pub async fn traverse(
        &self,
        course: &str,
        start_item: &str,
        status: &dyn StatusSink,
    ) -> Result<Vec<PageId>> {
        let mut page_ids = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut item_id = start_item.to_string();
        let mut step = 0usize;

        loop {
            if step >= self.max_steps {
                return Err(ModbindError::traversal(format!(
                    "module still continues after {} steps",
                    self.max_steps
                )));
            }
            if !visited.insert(item_id.clone()) {
                return Err(ModbindError::traversal(format!(
                    "module item {item_id} was reached twice; the sequence loops"
                )));
            }

            step += 1;
            status.say(&format!("Getting page {step}..."));

            let cursor = self
                .resolver
                .resolve_module_item(course, &item_id)
                .await
                .map_err(ModbindError::into_traversal)?;

            let page_id = self
                .metadata
                .page_id_at(&cursor.current_page_url)
                .await
                .map_err(ModbindError::into_traversal)?;

            debug!(
                step,
                item_id = %cursor.current_item_id,
                module_id = %cursor.current_module_id,
                page_id = ?page_id,
                "resolved module item"
            );

            if let Some(page_id) = page_id {
                page_ids.push(page_id);
            }

            if !cursor.stays_in_module() {
                break;
            }

            item_id = cursor.next_item_id.ok_or_else(|| {
                ModbindError::traversal(format!(
                    "item {} continues the module but has no next item id",
                    cursor.current_item_id
                ))
            })?;
        }

        info!(steps = step, pages = page_ids.len(), "module traversal complete");
        Ok(page_ids)
    }
}
