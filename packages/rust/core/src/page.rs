//! Page context: probes credentials, walks the module and submits the
//! resulting crawl request.

use std::sync::Arc;

use tracing::{info, instrument};

use modbind_discovery::{CredentialProbe, ModuleItemResolver, PageMetadataSource, TraversalEngine};
use modbind_shared::{CrawlRequest, Result, StatusSink};

use crate::channel::CrawlRequestSender;

/// Everything the page context needs to discover a module's pages.
#[derive(Clone)]
pub struct PageContext {
    probe: Arc<dyn CredentialProbe>,
    resolver: Arc<dyn ModuleItemResolver>,
    metadata: Arc<dyn PageMetadataSource>,
    max_steps: usize,
}

impl PageContext {
    pub fn new(
        probe: Arc<dyn CredentialProbe>,
        resolver: Arc<dyn ModuleItemResolver>,
        metadata: Arc<dyn PageMetadataSource>,
        max_steps: usize,
    ) -> Self {
        Self {
            probe,
            resolver,
            metadata,
            max_steps,
        }
    }

    /// Probe the credential context and discover the module's page ids.
    #[instrument(skip_all)]
    pub async fn discover(&self, status: &dyn StatusSink) -> Result<CrawlRequest> {
        let credentials = self.probe.probe()?;
        info!(
            course = %credentials.course_id,
            start_item = %credentials.start_item_id,
            user = credentials.user_id.as_deref().unwrap_or("-"),
            "credential context ready"
        );

        let engine = TraversalEngine::new(
            self.resolver.as_ref(),
            self.metadata.as_ref(),
            self.max_steps,
        );
        let page_ids = engine
            .traverse(&credentials.course_id, &credentials.start_item_id, status)
            .await?;

        Ok(CrawlRequest {
            current_course: credentials.course_id,
            page_ids,
            token: credentials.token,
        })
    }

    /// Discover, then hand the request to the orchestrator. Nothing is
    /// submitted when discovery fails.
    pub async fn run(self, status: &dyn StatusSink, outbox: CrawlRequestSender) -> Result<usize> {
        let request = self.discover(status).await?;
        let pages = request.page_ids.len();
        outbox.submit(request)?;
        info!(pages, "crawl request submitted");
        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use modbind_discovery::StaticProbe;
    use modbind_shared::{ModbindError, PageId, SilentStatus, TraversalCursor};

    use super::*;
    use crate::channel::crawl_request_channel;

    /// Two-page module: item 1 → item 2 → next module.
    struct TwoPageModule;

    #[async_trait]
    impl ModuleItemResolver for TwoPageModule {
        async fn resolve_module_item(&self, _course: &str, item_id: &str) -> Result<TraversalCursor> {
            let (next_module, next_item) = match item_id {
                "1" => ("M", "2"),
                "2" => ("OTHER", "3"),
                other => return Err(ModbindError::Network(format!("unknown item {other}"))),
            };
            Ok(TraversalCursor {
                current_module_id: "M".into(),
                current_item_id: item_id.into(),
                current_page_url: format!("https://lms/pages/{item_id}"),
                next_module_id: Some(next_module.into()),
                next_item_id: Some(next_item.into()),
                next_page_url: None,
            })
        }
    }

    #[async_trait]
    impl PageMetadataSource for TwoPageModule {
        async fn page_id_at(&self, page_url: &str) -> Result<Option<PageId>> {
            let pages: HashMap<&str, &str> =
                [("https://lms/pages/1", "p1"), ("https://lms/pages/2", "p2")].into();
            Ok(pages.get(page_url).map(|id| PageId::from(*id)))
        }
    }

    fn context(probe: StaticProbe) -> PageContext {
        let module = Arc::new(TwoPageModule);
        PageContext::new(Arc::new(probe), module.clone(), module, 50)
    }

    fn probe() -> StaticProbe {
        StaticProbe {
            course_id: "100".into(),
            token: "jwt".into(),
            start_item_id: "1".into(),
        }
    }

    #[tokio::test]
    async fn submits_discovered_pages() {
        let (tx, rx) = crawl_request_channel();

        let pages = context(probe()).run(&SilentStatus, tx).await.unwrap();
        assert_eq!(pages, 2);

        let request = rx.receive().await.unwrap();
        assert_eq!(request.current_course, "100");
        assert_eq!(request.token, "jwt");
        assert_eq!(request.page_ids, vec![PageId::from("p1"), PageId::from("p2")]);
    }

    #[tokio::test]
    async fn probe_failure_submits_nothing() {
        let (tx, rx) = crawl_request_channel();
        let bad = StaticProbe {
            token: " ".into(),
            ..probe()
        };

        let err = context(bad).run(&SilentStatus, tx).await.unwrap_err();
        assert!(matches!(err, ModbindError::Credential { .. }));
        assert!(matches!(rx.receive().await, Err(ModbindError::Delivery(_))));
    }
}
