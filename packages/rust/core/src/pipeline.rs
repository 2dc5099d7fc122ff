//! End-to-end crawl: probe → traverse → fetch → viewer → rendered document.
//!
//! The page context and the orchestrator run as separate tasks joined only
//! by the crawl request channel, the same split the contexts have in a
//! browser.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use modbind_crawler::{ContentServiceClient, ContentSource, OrderPreservingFetcher};
use modbind_discovery::{CredentialProbe, LmsClient, ModuleItemResolver, PageMetadataSource};
use modbind_render::RenderedDocument;
use modbind_shared::{AppConfig, CrawlId, CrawlRequest, ModbindError, Result, StatusSink};

use crate::channel::{StatusBus, crawl_request_channel};
use crate::orchestrator::{Orchestrator, ViewerSettings};
use crate::page::PageContext;

/// The collaborators a crawl talks to.
#[derive(Clone)]
pub struct CrawlServices {
    pub probe: Arc<dyn CredentialProbe>,
    pub resolver: Arc<dyn ModuleItemResolver>,
    pub metadata: Arc<dyn PageMetadataSource>,
    pub content: Arc<dyn ContentSource>,
}

impl CrawlServices {
    /// Build HTTP-backed services from the app config.
    ///
    /// `lms_token` is sent as a bearer credential on LMS requests.
    pub fn from_config(
        config: &AppConfig,
        probe: Arc<dyn CredentialProbe>,
        lms_token: Option<String>,
    ) -> Result<Self> {
        let lms = Arc::new(LmsClient::new(&config.lms.base_url, &config.http, lms_token)?);
        let content = Arc::new(ContentServiceClient::new(
            &config.content_service,
            &config.http,
        )?);

        Ok(Self {
            probe,
            resolver: lms.clone(),
            metadata: lms,
            content,
        })
    }

    fn page_context(&self, max_steps: usize) -> PageContext {
        PageContext::new(
            Arc::clone(&self.probe),
            Arc::clone(&self.resolver),
            Arc::clone(&self.metadata),
            max_steps,
        )
    }
}

/// Configuration for one crawl.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Upper bound on traversal steps.
    pub max_steps: usize,
    pub viewer: ViewerSettings,
}

/// Result of [`run_crawl`].
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub crawl_id: CrawlId,
    pub course: String,
    /// Pages discovered and fetched.
    pub page_count: usize,
    /// Documents that made it into the output.
    pub merged_documents: usize,
    /// Positions dropped for lacking a main region.
    pub skipped: Vec<usize>,
    pub document: RenderedDocument,
    pub elapsed: Duration,
}

/// Discover the module's pages without fetching anything.
#[instrument(skip_all, fields(max_steps = max_steps))]
pub async fn discover_pages(
    services: &CrawlServices,
    max_steps: usize,
    status: &dyn StatusSink,
) -> Result<CrawlRequest> {
    let request = services.page_context(max_steps).discover(status).await?;
    info!(
        course = %request.current_course,
        pages = request.page_ids.len(),
        "discovery complete"
    );
    Ok(request)
}

/// Run a full crawl.
///
/// Exactly one terminal status is published: `Done: N pages` on success or
/// `Crawl failed: ...` otherwise.
#[instrument(skip_all, fields(crawl_id = tracing::field::Empty))]
pub async fn run_crawl(
    services: &CrawlServices,
    config: &CrawlConfig,
    status: &StatusBus,
    cancel: &CancellationToken,
) -> Result<CrawlOutcome> {
    let crawl_id = CrawlId::new();
    tracing::Span::current().record("crawl_id", tracing::field::display(crawl_id));
    info!(%crawl_id, "starting crawl");

    match crawl(crawl_id, services, config, status, cancel).await {
        Ok(outcome) => {
            status.say(&format!("Done: {} pages", outcome.page_count));
            info!(
                %crawl_id,
                course = %outcome.course,
                pages = outcome.page_count,
                merged = outcome.merged_documents,
                skipped = outcome.skipped.len(),
                elapsed_ms = outcome.elapsed.as_millis(),
                "crawl complete"
            );
            Ok(outcome)
        }
        Err(e) => {
            status.say(&format!("Crawl failed: {e}"));
            warn!(%crawl_id, error = %e, "crawl failed");
            Err(e)
        }
    }
}

async fn crawl(
    crawl_id: CrawlId,
    services: &CrawlServices,
    config: &CrawlConfig,
    status: &StatusBus,
    cancel: &CancellationToken,
) -> Result<CrawlOutcome> {
    let start = Instant::now();
    let (outbox, inbox) = crawl_request_channel();

    // --- Page context ---
    let page = services.page_context(config.max_steps);
    let page_status = status.clone();
    let page_cancel = cancel.clone();
    let page_task = tokio::spawn(async move {
        tokio::select! {
            biased;
            _ = page_cancel.cancelled() => Err(ModbindError::Cancelled),
            result = page.run(&page_status, outbox) => result,
        }
    });

    // --- Orchestrator ---
    let orchestrator = Orchestrator::new(
        OrderPreservingFetcher::new(Arc::clone(&services.content)),
        config.viewer.clone(),
    );
    let orchestrator_status = status.clone();
    let orchestrator_cancel = cancel.clone();
    let orchestrator_task = tokio::spawn(async move {
        orchestrator
            .run(inbox, &orchestrator_status, &orchestrator_cancel)
            .await
    });

    let (page_joined, orchestrator_joined) = tokio::join!(page_task, orchestrator_task);

    // A page-context failure leaves the orchestrator with nothing to do, so
    // it is the error worth reporting.
    page_joined.map_err(|e| ModbindError::Delivery(format!("page context task failed: {e}")))??;
    let crawl = orchestrator_joined
        .map_err(|e| ModbindError::Delivery(format!("orchestrator task failed: {e}")))??;

    Ok(CrawlOutcome {
        crawl_id,
        course: crawl.course,
        page_count: crawl.pages,
        merged_documents: crawl.viewer.merged_documents,
        skipped: crawl.viewer.skipped,
        document: crawl.viewer.document,
        elapsed: start.elapsed(),
    })
}
