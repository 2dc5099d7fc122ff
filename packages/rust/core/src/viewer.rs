//! Viewer context: waits for its single content delivery, then merges the
//! documents and renders the result.

use tracing::{debug, info, instrument};

use modbind_render::{RenderOptions, RenderedDocument, assemble, render};
use modbind_shared::{RegionPolicy, Result};

use crate::channel::ViewerEndpoint;

/// What a viewer produced from its delivery.
#[derive(Debug, Clone)]
pub struct ViewerOutput {
    pub document: RenderedDocument,
    /// Documents that contributed content.
    pub merged_documents: usize,
    /// Zero-based positions skipped for lacking a main region.
    pub skipped: Vec<usize>,
}

/// A freshly opened viewer.
#[derive(Debug, Clone)]
pub struct ViewerContext {
    policy: RegionPolicy,
    options: RenderOptions,
}

impl ViewerContext {
    pub fn new(policy: RegionPolicy, options: RenderOptions) -> Self {
        Self { policy, options }
    }

    /// Signal ready, receive the content and render it.
    #[instrument(skip_all, fields(format = ?self.options.format))]
    pub async fn run(self, endpoint: ViewerEndpoint) -> Result<ViewerOutput> {
        let inbox = endpoint.ready()?;
        debug!("viewer ready");

        let delivery = inbox.receive().await?;
        info!(documents = delivery.content.len(), "content received");

        let merged = assemble(&delivery.content, self.policy)?;
        let document = render(&merged, &self.options)?;

        Ok(ViewerOutput {
            document,
            merged_documents: merged.merged_documents(),
            skipped: merged.skipped().to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use modbind_shared::{ContentDelivery, ModbindError, OutputFormat};

    use super::*;
    use crate::channel::viewer_handshake;

    fn viewer(policy: RegionPolicy) -> ViewerContext {
        ViewerContext::new(
            policy,
            RenderOptions {
                title: "Module".into(),
                format: OutputFormat::Html,
                generated_at: Utc::now(),
            },
        )
    }

    #[tokio::test]
    async fn renders_delivered_content() {
        let (pending, endpoint) = viewer_handshake();
        let task = tokio::spawn(viewer(RegionPolicy::Fail).run(endpoint));

        pending
            .wait_ready()
            .await
            .unwrap()
            .deliver(ContentDelivery {
                content: vec![
                    "<main><h1>One</h1></main>".into(),
                    "<main><h1>Two</h1></main>".into(),
                ],
            })
            .unwrap();

        let output = task.await.unwrap().unwrap();
        assert_eq!(output.merged_documents, 2);
        assert!(output.skipped.is_empty());
        assert!(output.document.body.contains("<h1>One</h1>"));
    }

    #[tokio::test]
    async fn skipped_positions_are_reported() {
        let (pending, endpoint) = viewer_handshake();
        let task = tokio::spawn(viewer(RegionPolicy::Skip).run(endpoint));

        pending
            .wait_ready()
            .await
            .unwrap()
            .deliver(ContentDelivery {
                content: vec!["<p>no main</p>".into(), "<main><p>ok</p></main>".into()],
            })
            .unwrap();

        let output = task.await.unwrap().unwrap();
        assert_eq!(output.skipped, vec![0]);
        assert_eq!(output.merged_documents, 1);
    }

    #[tokio::test]
    async fn abandoned_delivery_is_an_error() {
        let (pending, endpoint) = viewer_handshake();
        let task = tokio::spawn(viewer(RegionPolicy::Fail).run(endpoint));

        let ready = pending.wait_ready().await.unwrap();
        drop(ready);

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, ModbindError::Delivery(_)));
    }
}
