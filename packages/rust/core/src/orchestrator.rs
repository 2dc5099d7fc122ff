//! Background orchestrator: receives the crawl request, fetches every page,
//! opens a viewer and hands it the ordered documents.

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use modbind_crawler::OrderPreservingFetcher;
use modbind_render::RenderOptions;
use modbind_shared::{ContentDelivery, ModbindError, OutputFormat, RegionPolicy, Result, StatusSink};

use crate::channel::{CrawlRequestReceiver, viewer_handshake};
use crate::viewer::{ViewerContext, ViewerOutput};

/// How opened viewers render their content.
#[derive(Debug, Clone)]
pub struct ViewerSettings {
    pub format: OutputFormat,
    pub policy: RegionPolicy,
    /// Fixed title; defaults to one naming the course.
    pub title: Option<String>,
}

/// Result of one orchestrated crawl.
#[derive(Debug, Clone)]
pub struct OrchestratedCrawl {
    pub course: String,
    pub pages: usize,
    pub viewer: ViewerOutput,
}

#[derive(Clone)]
pub struct Orchestrator {
    fetcher: OrderPreservingFetcher,
    settings: ViewerSettings,
}

impl Orchestrator {
    pub fn new(fetcher: OrderPreservingFetcher, settings: ViewerSettings) -> Self {
        Self { fetcher, settings }
    }

    /// Serve one crawl request end to end.
    #[instrument(skip_all)]
    pub async fn run(
        self,
        inbox: CrawlRequestReceiver,
        status: &dyn StatusSink,
        cancel: &CancellationToken,
    ) -> Result<OrchestratedCrawl> {
        let request = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ModbindError::Cancelled),
            request = inbox.receive() => request?,
        };
        info!(
            course = %request.current_course,
            pages = request.page_ids.len(),
            "crawl request received"
        );

        let documents = self.fetcher.fetch_all(&request, status, cancel).await?;

        // The viewer is only opened once every document is in hand.
        let title = self
            .settings
            .title
            .clone()
            .unwrap_or_else(|| format!("Course {} module", request.current_course));
        let viewer = ViewerContext::new(
            self.settings.policy,
            RenderOptions {
                title,
                format: self.settings.format,
                generated_at: Utc::now(),
            },
        );

        let (pending, endpoint) = viewer_handshake();
        let viewer_task = tokio::spawn(viewer.run(endpoint));

        let ready = pending.wait_ready().await?;
        debug!(documents = documents.len(), "delivering content to viewer");
        ready.deliver(ContentDelivery { content: documents })?;

        let output = viewer_task
            .await
            .map_err(|e| ModbindError::Delivery(format!("viewer task failed: {e}")))??;

        Ok(OrchestratedCrawl {
            course: request.current_course,
            pages: request.page_ids.len(),
            viewer: output,
        })
    }
}
