//! Credential and page-context probes.
//!
//! The page context is the only place that knows who is signed in, which
//! course is open and which module item is on screen. Probes turn whatever
//! view of that context we have into an explicit [`CredentialContext`].

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use modbind_shared::{CredentialContext, ModbindError, Result};

/// Local storage key holding the open course id.
const COURSE_STORAGE_KEY: &str = "CURRENT_COURSE_ID";

/// Query parameter naming the module item on screen.
const MODULE_ITEM_PARAM: &str = "module_item_id";

/// Marker identifying the inline script that boots the page environment.
const ENV_SCRIPT_MARKER: &str = "ENV =";

/// Strategy for obtaining the credential context.
pub trait CredentialProbe: Send + Sync {
    fn probe(&self) -> Result<CredentialContext>;
}

// ---------------------------------------------------------------------------
// StaticProbe
// ---------------------------------------------------------------------------

/// Credentials supplied directly (flags, environment, config).
#[derive(Clone)]
pub struct StaticProbe {
    pub course_id: String,
    pub token: String,
    pub start_item_id: String,
}

impl std::fmt::Debug for StaticProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticProbe")
            .field("course_id", &self.course_id)
            .field("start_item_id", &self.start_item_id)
            .finish_non_exhaustive()
    }
}

impl CredentialProbe for StaticProbe {
    fn probe(&self) -> Result<CredentialContext> {
        for (name, value) in [
            ("course id", &self.course_id),
            ("token", &self.token),
            ("module item id", &self.start_item_id),
        ] {
            if value.trim().is_empty() {
                return Err(ModbindError::credential(format!("{name} is empty")));
            }
        }

        Ok(CredentialContext {
            user_id: None,
            course_id: self.course_id.clone(),
            token: self.token.clone(),
            start_item_id: self.start_item_id.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// SnapshotProbe
// ---------------------------------------------------------------------------

/// Key/value stores captured from the page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageStorage {
    #[serde(default, rename = "localStorage")]
    pub local: HashMap<String, String>,
    #[serde(default, rename = "sessionStorage")]
    pub session: HashMap<String, String>,
}

#[derive(Deserialize)]
struct SessionToken {
    token: String,
}

/// Reads credentials out of a saved copy of the page: its HTML, a JSON dump
/// of its storage, and its URL.
#[derive(Debug, Clone)]
pub struct SnapshotProbe {
    page_html: String,
    storage: PageStorage,
    page_url: Url,
    client_id: String,
}

impl SnapshotProbe {
    pub fn new(page_html: String, storage: PageStorage, page_url: Url, client_id: &str) -> Self {
        Self {
            page_html,
            storage,
            page_url,
            client_id: client_id.to_string(),
        }
    }

    /// Load the page HTML and storage dump from disk.
    pub fn from_files(
        html_path: &Path,
        storage_path: &Path,
        page_url: &str,
        client_id: &str,
    ) -> Result<Self> {
        let page_html =
            std::fs::read_to_string(html_path).map_err(|e| ModbindError::io(html_path, e))?;
        let storage_json =
            std::fs::read_to_string(storage_path).map_err(|e| ModbindError::io(storage_path, e))?;
        let storage: PageStorage = serde_json::from_str(&storage_json).map_err(|e| {
            ModbindError::credential(format!(
                "invalid storage dump {}: {e}",
                storage_path.display()
            ))
        })?;
        let page_url = Url::parse(page_url)
            .map_err(|e| ModbindError::credential(format!("invalid page URL '{page_url}': {e}")))?;

        Ok(Self::new(page_html, storage, page_url, client_id))
    }

    fn session_key(&self, course_id: &str, user_id: &str) -> String {
        format!("ally.jwt.{}.{course_id}.{user_id}.student", self.client_id)
    }
}

impl CredentialProbe for SnapshotProbe {
    fn probe(&self) -> Result<CredentialContext> {
        let user_id = extract_user_id(&self.page_html)?;

        let course_id = self
            .storage
            .local
            .get(COURSE_STORAGE_KEY)
            .cloned()
            .ok_or_else(|| {
                ModbindError::credential(format!("local storage has no {COURSE_STORAGE_KEY}"))
            })?;

        let key = self.session_key(&course_id, &user_id);
        let raw = self
            .storage
            .session
            .get(&key)
            .ok_or_else(|| ModbindError::credential(format!("session storage has no {key}")))?;
        let session: SessionToken = serde_json::from_str(raw)
            .map_err(|e| ModbindError::credential(format!("{key} is not a token record: {e}")))?;

        let start_item_id = self
            .page_url
            .query_pairs()
            .find(|(name, _)| name == MODULE_ITEM_PARAM)
            .map(|(_, value)| value.into_owned())
            .ok_or_else(|| {
                ModbindError::credential(format!(
                    "page URL has no {MODULE_ITEM_PARAM} parameter: {}",
                    self.page_url
                ))
            })?;

        debug!(%user_id, %course_id, %start_item_id, "probed page context");

        Ok(CredentialContext {
            user_id: Some(user_id),
            course_id,
            token: session.token,
            start_item_id,
        })
    }
}

/// Pull the signed-in user id out of the page's environment bootstrap script.
pub fn extract_user_id(page_html: &str) -> Result<String> {
    static USER_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#""current_user_id":"(.\d+)""#).expect("valid regex")
    });

    let doc = Html::parse_document(page_html);
    let script_sel = Selector::parse("script").expect("valid selector");

    let script = doc
        .select(&script_sel)
        .map(|el| el.inner_html())
        .find(|body| body.contains(ENV_SCRIPT_MARKER))
        .ok_or_else(|| ModbindError::credential("page has no environment script"))?;

    USER_ID_RE
        .captures(&script)
        .map(|c| c[1].to_string())
        .ok_or_else(|| ModbindError::credential("environment script has no current_user_id"))
}
