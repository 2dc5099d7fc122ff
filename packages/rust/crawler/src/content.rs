//! Two-stage client for the rich-content service.
//!
//! Stage 1 asks the service (authenticated) where the alternate format of a
//! page lives; stage 2 downloads it from that locator without credentials.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use modbind_shared::{ContentServiceConfig, HttpConfig, ModbindError, PageId, Result};

/// User-Agent string for content service requests.
const USER_AGENT: &str = concat!("modbind/", env!("CARGO_PKG_VERSION"));

/// Fixed query string the format endpoint expects.
const FORMAT_QUERY: &str = "acceptTOU=true&formatParam=&asAttachment=false&contentHash=";

/// Retrieves the document text for one page.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch_document(&self, course: &str, page_id: &PageId, token: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct FormatLocator {
    url: String,
}

/// HTTP implementation of [`ContentSource`].
#[derive(Debug, Clone)]
pub struct ContentServiceClient {
    client: Client,
    base_url: String,
    client_id: String,
    format: String,
}

impl ContentServiceClient {
    pub fn new(service: &ContentServiceConfig, http: &HttpConfig) -> Result<Self> {
        Url::parse(&service.base_url).map_err(|e| {
            ModbindError::config(format!(
                "invalid content service URL '{}': {e}",
                service.base_url
            ))
        })?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(http.max_redirects))
            .timeout(http.timeout())
            .build()
            .map_err(|e| ModbindError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: service.base_url.trim_end_matches('/').to_string(),
            client_id: service.client_id.clone(),
            format: service.format.clone(),
        })
    }

    /// Stage 1 endpoint for a page: the composite `page:<id>` token is one
    /// percent-encoded path segment.
    fn format_url(&self, course: &str, page_id: &PageId) -> String {
        let content_key = format!("page:{page_id}");
        format!(
            "{}/api/v1/{}/courses/{}/rich-content/{}/formats/{}?{FORMAT_QUERY}",
            self.base_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(course),
            urlencoding::encode(&content_key),
            urlencoding::encode(&self.format),
        )
    }

    async fn locate(&self, course: &str, page_id: &PageId, token: &str) -> Result<String> {
        let url = self.format_url(course, page_id);
        debug!(%url, "requesting format locator");

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ModbindError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ModbindError::Network(format!("{url}: HTTP {status}")));
        }

        let locator: FormatLocator = response
            .json()
            .await
            .map_err(|e| ModbindError::parse(format!("{url}: unexpected JSON: {e}")))?;

        Ok(locator.url)
    }

    async fn download(&self, locator: &str) -> Result<String> {
        debug!(locator, "downloading document");

        let response = self
            .client
            .get(locator)
            .send()
            .await
            .map_err(|e| ModbindError::Network(format!("{locator}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ModbindError::Network(format!("{locator}: HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| ModbindError::Network(format!("{locator}: body read failed: {e}")))
    }
}

#[async_trait]
impl ContentSource for ContentServiceClient {
    async fn fetch_document(&self, course: &str, page_id: &PageId, token: &str) -> Result<String> {
        let locator = self.locate(course, page_id, token).await?;
        self.download(&locator).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, path_regex, query_param};
    use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

    /// Matches requests that carry no credentials.
    struct Unauthenticated;

    impl Match for Unauthenticated {
        fn matches(&self, request: &Request) -> bool {
            !request.headers.contains_key("authorization")
        }
    }

    fn client_for(server: &MockServer) -> ContentServiceClient {
        let service = ContentServiceConfig {
            base_url: server.uri(),
            ..ContentServiceConfig::default()
        };
        ContentServiceClient::new(&service, &HttpConfig::default()).unwrap()
    }

    #[test]
    fn format_url_encodes_content_key() {
        let service = ContentServiceConfig {
            base_url: "https://content.example.com/".into(),
            ..ContentServiceConfig::default()
        };
        let client = ContentServiceClient::new(&service, &HttpConfig::default()).unwrap();

        assert_eq!(
            client.format_url("100", &PageId::from("42")),
            "https://content.example.com/api/v1/603/courses/100/rich-content/page%3A42/formats/Beeline?acceptTOU=true&formatParam=&asAttachment=false&contentHash="
        );
    }

    #[tokio::test]
    async fn fetches_document_in_two_stages() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path_regex(
                r"^/api/v1/603/courses/100/rich-content/page(%3A|:)42/formats/Beeline$",
            ))
            .and(query_param("acceptTOU", "true"))
            .and(header("authorization", "Bearer jwt-abc"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "url": format!("{}/files/42.html", server.uri()) })),
            )
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/files/42.html"))
            .and(Unauthenticated)
            .respond_with(
                ResponseTemplate::new(200).set_body_string("<html><main><p>42</p></main></html>"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let html = client
            .fetch_document("100", &PageId::from("42"), "jwt-abc")
            .await
            .unwrap();

        assert!(html.contains("<p>42</p>"));
    }

    #[tokio::test]
    async fn rejected_token_fails_stage_one() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path_regex(r"^/api/v1/603/courses/100/rich-content/"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .fetch_document("100", &PageId::from("42"), "expired")
            .await
            .unwrap_err();

        assert!(matches!(err, ModbindError::Network(_)));
        assert!(err.to_string().contains("403"));
    }

    #[tokio::test]
    async fn locator_without_url_is_a_parse_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path_regex(r"^/api/v1/603/courses/100/rich-content/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "status": "pending" })),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .fetch_document("100", &PageId::from("42"), "jwt")
            .await
            .unwrap_err();

        assert!(matches!(err, ModbindError::Parse { .. }));
    }

    #[tokio::test]
    async fn missing_document_fails_stage_two() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path_regex(r"^/api/v1/603/courses/100/rich-content/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "url": format!("{}/files/gone.html", server.uri()) })),
            )
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/files/gone.html"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .fetch_document("100", &PageId::from("42"), "jwt")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("404"));
    }
}
