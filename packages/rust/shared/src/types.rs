//! Core domain types shared across the crawl pipeline.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// CrawlId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one crawl operation (time-sortable).
///
/// Only used to correlate log lines; nothing is persisted under it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CrawlId(pub Uuid);

impl CrawlId {
    /// Generate a new crawl identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for CrawlId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CrawlId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// PageId
// ---------------------------------------------------------------------------

/// Opaque identifier of one retrievable page in a course.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(pub String);

impl PageId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ---------------------------------------------------------------------------
// TraversalCursor
// ---------------------------------------------------------------------------

/// One step of a module traversal, as reported by the module item resolver.
///
/// `next_*` fields are `None` when the host reports no following item,
/// which always counts as a module boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalCursor {
    pub current_module_id: String,
    pub current_item_id: String,
    pub current_page_url: String,
    pub next_module_id: Option<String>,
    pub next_item_id: Option<String>,
    pub next_page_url: Option<String>,
}

impl TraversalCursor {
    /// Whether the next item still belongs to the current module.
    pub fn stays_in_module(&self) -> bool {
        self.next_module_id.as_deref() == Some(self.current_module_id.as_str())
    }
}

// ---------------------------------------------------------------------------
// CredentialContext
// ---------------------------------------------------------------------------

/// Everything the page context knows about the signed-in user and the
/// module item being viewed.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialContext {
    pub user_id: Option<String>,
    pub course_id: String,
    pub token: String,
    pub start_item_id: String,
}

impl std::fmt::Debug for CredentialContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialContext")
            .field("user_id", &self.user_id)
            .field("course_id", &self.course_id)
            .field("token", &"<redacted>")
            .field("start_item_id", &self.start_item_id)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Cross-context payloads
// ---------------------------------------------------------------------------

/// Discovered page ids handed from the page context to the orchestrator.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlRequest {
    pub current_course: String,
    pub page_ids: Vec<PageId>,
    pub token: String,
}

impl std::fmt::Debug for CrawlRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrawlRequest")
            .field("current_course", &self.current_course)
            .field("page_ids", &self.page_ids)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Human-readable progress text for the status display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub status: String,
}

impl StatusEvent {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
        }
    }
}

/// Ordered document texts delivered to the viewer context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentDelivery {
    pub content: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor(current: &str, next: Option<&str>) -> TraversalCursor {
        TraversalCursor {
            current_module_id: current.into(),
            current_item_id: "1".into(),
            current_page_url: "https://lms.example.com/items/1".into(),
            next_module_id: next.map(String::from),
            next_item_id: next.map(|_| "2".into()),
            next_page_url: None,
        }
    }

    #[test]
    fn module_boundary_detection() {
        assert!(cursor("M1", Some("M1")).stays_in_module());
        assert!(!cursor("M1", Some("M2")).stays_in_module());
        assert!(!cursor("M1", None).stays_in_module());
    }

    #[test]
    fn crawl_request_uses_wire_field_names() {
        let request = CrawlRequest {
            current_course: "100".into(),
            page_ids: vec!["p1".into(), "p2".into()],
            token: "secret".into(),
        };
        let json = serde_json::to_value(&request).expect("serialize");
        assert_eq!(json["current_course"], "100");
        assert_eq!(json["page_ids"], serde_json::json!(["p1", "p2"]));
    }

    #[test]
    fn debug_output_hides_token() {
        let request = CrawlRequest {
            current_course: "100".into(),
            page_ids: vec![],
            token: "secret-token".into(),
        };
        assert!(!format!("{request:?}").contains("secret-token"));

        let ctx = CredentialContext {
            user_id: Some("42".into()),
            course_id: "100".into(),
            token: "secret-token".into(),
            start_item_id: "5".into(),
        };
        assert!(!format!("{ctx:?}").contains("secret-token"));
    }

    #[test]
    fn crawl_ids_are_unique() {
        assert_ne!(CrawlId::new(), CrawlId::new());
    }
}
