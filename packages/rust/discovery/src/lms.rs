//! HTTP client for the host LMS: module item sequence and page metadata.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use modbind_shared::{HttpConfig, ModbindError, PageId, Result, TraversalCursor};

use crate::traversal::{ModuleItemResolver, PageMetadataSource};
use crate::build_client;

// ---------------------------------------------------------------------------
// Response shapes (only the fields we consume)
// ---------------------------------------------------------------------------

/// Ids arrive as JSON numbers from some hosts and strings from others.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum IdValue {
    Number(i64),
    Text(String),
}

impl IdValue {
    fn into_string(self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ModuleItemSequence {
    #[serde(default)]
    items: Vec<SequenceItem>,
}

#[derive(Debug, Deserialize)]
struct SequenceItem {
    current: Option<SequenceEntry>,
    next: Option<SequenceEntry>,
}

#[derive(Debug, Deserialize)]
struct SequenceEntry {
    id: IdValue,
    module_id: IdValue,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PageMetadata {
    #[serde(default)]
    page_id: Option<IdValue>,
}

impl ModuleItemSequence {
    fn into_cursor(self) -> Result<TraversalCursor> {
        let item = self
            .items
            .into_iter()
            .next()
            .ok_or_else(|| ModbindError::parse("module item sequence has no items"))?;

        let current = item
            .current
            .ok_or_else(|| ModbindError::parse("module item sequence has no current item"))?;

        let current_page_url = current
            .url
            .ok_or_else(|| ModbindError::parse("current module item has no url"))?;

        let (next_module_id, next_item_id, next_page_url) = match item.next {
            Some(next) => (
                Some(next.module_id.into_string()),
                Some(next.id.into_string()),
                next.url,
            ),
            None => (None, None, None),
        };

        Ok(TraversalCursor {
            current_module_id: current.module_id.into_string(),
            current_item_id: current.id.into_string(),
            current_page_url,
            next_module_id,
            next_item_id,
            next_page_url,
        })
    }
}

impl PageMetadata {
    fn into_page_id(self) -> Option<PageId> {
        self.page_id
            .map(IdValue::into_string)
            .filter(|id| !id.is_empty())
            .map(PageId)
    }
}

// ---------------------------------------------------------------------------
// LmsClient
// ---------------------------------------------------------------------------

/// Talks to the host LMS REST API.
///
/// An optional access token is sent as a bearer credential on every request;
/// without one the requests rely on whatever session the host accepts.
#[derive(Debug, Clone)]
pub struct LmsClient {
    client: Client,
    base_url: Url,
    access_token: Option<String>,
}

impl LmsClient {
    /// Create a client for the LMS at `base_url`.
    pub fn new(base_url: &str, http: &HttpConfig, access_token: Option<String>) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ModbindError::config(format!("invalid LMS base URL '{base_url}': {e}")))?;

        if base_url.cannot_be_a_base() {
            return Err(ModbindError::config(format!(
                "LMS base URL cannot carry a path: {base_url}"
            )));
        }

        Ok(Self {
            client: build_client(http)?,
            base_url,
            access_token,
        })
    }

    /// URL of the module item sequence endpoint for one item.
    fn sequence_url(&self, course: &str, item_id: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["api", "v1", "courses", course, "module_item_sequence"]);
        }
        url.query_pairs_mut()
            .append_pair("asset_type", "ModuleItem")
            .append_pair("asset_id", item_id)
            .append_pair("frame_external_urls", "true");
        url
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let mut request = self.client.get(url);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ModbindError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ModbindError::Network(format!("{url}: HTTP {status}")));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ModbindError::parse(format!("{url}: unexpected JSON: {e}")))
    }
}

#[async_trait]
impl ModuleItemResolver for LmsClient {
    async fn resolve_module_item(&self, course: &str, item_id: &str) -> Result<TraversalCursor> {
        let url = self.sequence_url(course, item_id);
        debug!(%url, item_id, "resolving module item");

        let sequence: ModuleItemSequence = self.get_json(url.as_str()).await?;
        sequence.into_cursor()
    }
}

#[async_trait]
impl PageMetadataSource for LmsClient {
    async fn page_id_at(&self, page_url: &str) -> Result<Option<PageId>> {
        debug!(page_url, "fetching page metadata");

        let metadata: PageMetadata = self.get_json(page_url).await?;
        Ok(metadata.into_page_id())
    }
}
