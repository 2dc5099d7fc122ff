//! Typed message channels between the page context, the orchestrator and
//! the viewer context.
//!
//! | direction                      | channel                                  |
//! |--------------------------------|------------------------------------------|
//! | page context → orchestrator    | [`crawl_request_channel`] (single shot)  |
//! | any context → status display   | [`StatusBus`] (broadcast, lossy)         |
//! | orchestrator → viewer context  | [`viewer_handshake`] (ready, then deliver) |

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, oneshot};
use tracing::trace;

use modbind_shared::{
    ContentDelivery, CrawlRequest, ModbindError, Result, StatusEvent, StatusSink,
};

/// Status events buffered per subscriber before old ones are dropped.
const STATUS_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// Wire catalogue
// ---------------------------------------------------------------------------

/// JSON form of the messages exchanged with host-side scripts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "message_type", rename_all = "snake_case")]
pub enum WireMessage {
    CrawlPages(CrawlRequest),
    StatusUpdate(StatusEvent),
}

impl WireMessage {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| ModbindError::parse(format!("failed to encode message: {e}")))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| ModbindError::parse(format!("unrecognised message: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Status bus
// ---------------------------------------------------------------------------

/// Fire-and-forget status broadcast. Sending with nobody subscribed is not
/// an error; the event is just dropped.
#[derive(Debug, Clone)]
pub struct StatusBus {
    tx: broadcast::Sender<StatusEvent>,
}

impl StatusBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(STATUS_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.tx.subscribe()
    }
}

impl Default for StatusBus {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusSink for StatusBus {
    fn status(&self, event: StatusEvent) {
        if let Err(broadcast::error::SendError(event)) = self.tx.send(event) {
            trace!(status = %event.status, "no status listener, event dropped");
        }
    }
}

// ---------------------------------------------------------------------------
// Page context → orchestrator
// ---------------------------------------------------------------------------

/// Create the single-shot channel carrying the discovered pages.
pub fn crawl_request_channel() -> (CrawlRequestSender, CrawlRequestReceiver) {
    let (tx, rx) = oneshot::channel();
    (CrawlRequestSender { tx }, CrawlRequestReceiver { rx })
}

/// Page-context end of the crawl request channel.
#[derive(Debug)]
pub struct CrawlRequestSender {
    tx: oneshot::Sender<CrawlRequest>,
}

impl CrawlRequestSender {
    /// Hand the request to the orchestrator. Consumes the sender, so a
    /// request is submitted at most once.
    pub fn submit(self, request: CrawlRequest) -> Result<()> {
        self.tx
            .send(request)
            .map_err(|_| ModbindError::Delivery("orchestrator is no longer listening".into()))
    }
}

/// Orchestrator end of the crawl request channel.
#[derive(Debug)]
pub struct CrawlRequestReceiver {
    rx: oneshot::Receiver<CrawlRequest>,
}

impl CrawlRequestReceiver {
    pub async fn receive(self) -> Result<CrawlRequest> {
        self.rx.await.map_err(|_| {
            ModbindError::Delivery("page context ended without submitting a crawl request".into())
        })
    }
}

// ---------------------------------------------------------------------------
// Orchestrator → viewer context
// ---------------------------------------------------------------------------

/// Create the two-phase handoff between the orchestrator and a new viewer.
///
/// The orchestrator keeps the [`PendingViewer`] and waits for the viewer to
/// report ready; only then can it deliver. The viewer takes the
/// [`ViewerEndpoint`].
pub fn viewer_handshake() -> (PendingViewer, ViewerEndpoint) {
    let (ready_tx, ready_rx) = oneshot::channel();
    (PendingViewer { ready_rx }, ViewerEndpoint { ready_tx })
}

/// Orchestrator's handle on a viewer that has not signalled ready yet.
#[derive(Debug)]
pub struct PendingViewer {
    ready_rx: oneshot::Receiver<oneshot::Sender<ContentDelivery>>,
}

impl PendingViewer {
    /// Wait for the viewer's ready signal.
    pub async fn wait_ready(self) -> Result<ReadyViewer> {
        let inbox = self.ready_rx.await.map_err(|_| {
            ModbindError::Delivery("viewer context closed before it was ready".into())
        })?;
        Ok(ReadyViewer { inbox })
    }
}

/// A viewer that is listening for its content.
#[derive(Debug)]
pub struct ReadyViewer {
    inbox: oneshot::Sender<ContentDelivery>,
}

impl ReadyViewer {
    pub fn deliver(self, delivery: ContentDelivery) -> Result<()> {
        self.inbox.send(delivery).map_err(|_| {
            ModbindError::Delivery("viewer context closed before content arrived".into())
        })
    }
}

/// Viewer's end of the handshake.
#[derive(Debug)]
pub struct ViewerEndpoint {
    ready_tx: oneshot::Sender<oneshot::Sender<ContentDelivery>>,
}

impl ViewerEndpoint {
    /// Register the content listener and tell the orchestrator we are ready.
    pub fn ready(self) -> Result<ContentInbox> {
        let (tx, rx) = oneshot::channel();
        self.ready_tx
            .send(tx)
            .map_err(|_| ModbindError::Delivery("orchestrator left before viewer was ready".into()))?;
        Ok(ContentInbox { rx })
    }
}

/// Where the viewer receives its single content delivery.
#[derive(Debug)]
pub struct ContentInbox {
    rx: oneshot::Receiver<ContentDelivery>,
}

impl ContentInbox {
    pub async fn receive(self) -> Result<ContentDelivery> {
        self.rx
            .await
            .map_err(|_| ModbindError::Delivery("orchestrator dropped the content delivery".into()))
    }
}
