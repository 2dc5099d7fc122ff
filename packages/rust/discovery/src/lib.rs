//! Page-context side of the pipeline: credential probing and module traversal.
//!
//! Everything here runs with access to the host LMS. The result is the ordered
//! list of page ids for one module, ready to hand to the orchestrator.

mod lms;
mod probe;
mod traversal;

use reqwest::Client;

use modbind_shared::{HttpConfig, ModbindError, Result};

pub use lms::LmsClient;
pub use probe::{CredentialProbe, PageStorage, SnapshotProbe, StaticProbe, extract_user_id};
pub use traversal::{ModuleItemResolver, PageMetadataSource, TraversalEngine};

/// User-Agent string for LMS requests.
const USER_AGENT: &str = concat!("modbind/", env!("CARGO_PKG_VERSION"));

/// Build a reqwest client with redirect-following and the configured timeout.
pub(crate) fn build_client(http: &HttpConfig) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(http.max_redirects))
        .timeout(http.timeout())
        .build()
        .map_err(|e| ModbindError::Network(format!("failed to build HTTP client: {e}")))
}
