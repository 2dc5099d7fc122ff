//! Order-preserving concurrent fetcher.
//!
//! Every page id gets its own task; all tasks start at once. Results land in
//! [`ContentSlots`] by launch index. The first failure aborts the remaining
//! tasks and discards whatever was already fetched.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::{Id, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use modbind_shared::{CrawlRequest, ModbindError, PageId, Result, StatusSink};

use crate::content::ContentSource;
use crate::slots::ContentSlots;

/// Fans a [`CrawlRequest`] out over a [`ContentSource`].
#[derive(Clone)]
pub struct OrderPreservingFetcher {
    source: Arc<dyn ContentSource>,
}

impl OrderPreservingFetcher {
    pub fn new(source: Arc<dyn ContentSource>) -> Self {
        Self { source }
    }

    /// Fetch every page in `request`, returning documents in request order.
    #[instrument(skip_all, fields(course = %request.current_course, pages = request.page_ids.len()))]
    pub async fn fetch_all(
        &self,
        request: &CrawlRequest,
        status: &dyn StatusSink,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>> {
        if cancel.is_cancelled() {
            return Err(ModbindError::Cancelled);
        }

        let mut slots = ContentSlots::new(&request.page_ids);
        let mut tasks: JoinSet<(usize, Result<String>)> = JoinSet::new();
        let mut launched: HashMap<Id, usize> = HashMap::with_capacity(slots.len());

        for (index, page_id) in request.page_ids.iter().cloned().enumerate() {
            let source = Arc::clone(&self.source);
            let course = request.current_course.clone();
            let token = request.token.clone();

            let handle = tasks.spawn(async move {
                let result = source
                    .fetch_document(&course, &page_id, &token)
                    .await
                    .map_err(|e| e.into_fetch(page_id.as_str()));
                (index, result)
            });
            launched.insert(handle.id(), index);
        }

        status.say("Getting page contents...");
        info!(tasks = slots.len(), "fetch fan-out started");

        let total = slots.len();
        loop {
            let joined = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tasks.abort_all();
                    info!(fetched = slots.filled(), "fetch cancelled");
                    return Err(ModbindError::Cancelled);
                }
                joined = tasks.join_next_with_id() => joined,
            };

            let Some(joined) = joined else { break };

            let (index, result) = match joined {
                Ok((_, outcome)) => outcome,
                Err(join_err) => {
                    let page_id = launched
                        .get(&join_err.id())
                        .and_then(|&i| slots.page_id(i))
                        .map(PageId::to_string)
                        .unwrap_or_default();
                    tasks.abort_all();
                    return Err(ModbindError::fetch(
                        page_id,
                        format!("retrieval task failed: {join_err}"),
                    ));
                }
            };

            match result {
                Ok(document) => {
                    if !slots.fill(index, document) {
                        warn!(index, "retrieval finished for an unknown or filled slot");
                    }
                    let done = slots.filled();
                    debug!(index, done, total, "page fetched");
                    status.say(&format!("Fetched {done}/{total} pages"));
                }
                Err(e) => {
                    let pending = tasks.len();
                    tasks.abort_all();
                    warn!(error = %e, aborted = pending, "page retrieval failed, aborting siblings");
                    return Err(e);
                }
            }
        }

        info!(pages = total, "all pages fetched");
        slots.into_documents()
    }
}
