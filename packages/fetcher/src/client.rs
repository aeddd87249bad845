//! HTTP transport for dataset pages.
//!
//! [`DatasetClient`] wraps a [`reqwest::Client`] configured with the JSON
//! headers the open-data portal expects and a per-request timeout.
//! [`HttpPageSource`] implements [`PageSource`] on top of it for one
//! resolved endpoint URL.

use async_trait::async_trait;
use serde::Deserialize;

use crate::{FetchError, PageSource, RawPage};

/// Per-request timeout. The portal occasionally hangs mid-response;
/// waiting forever leaves the consumer stuck on the progress screen, so
/// expiry is treated as a transport failure.
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// HTTP client for the open-data portal.
#[derive(Debug, Clone)]
pub struct DatasetClient {
    http: reqwest::Client,
}

/// The indirection document pointing at the real paginated endpoint.
#[derive(Debug, Deserialize)]
struct DatasetInfo {
    url: Option<String>,
}

/// Wire shape of one datastore page: `{ "result": { "results": [...],
/// "count": n } }`.
#[derive(Debug, Deserialize)]
struct DatastoreResponse {
    result: DatastoreResult,
}

#[derive(Debug, Deserialize)]
struct DatastoreResult {
    results: Vec<serde_json::Value>,
    #[serde(default)]
    count: Option<u64>,
}

impl DatasetClient {
    /// Builds a client with the portal's JSON headers and the default
    /// request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Http`] if the underlying client cannot be
    /// constructed.
    pub fn new() -> Result<Self, FetchError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json; charset=utf-8"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self { http })
    }

    /// Performs a GET and parses the response body as JSON.
    ///
    /// The body is read as text first so that invalid JSON surfaces as a
    /// [`FetchError::Parse`] with the decode message, distinct from
    /// transport failures.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Http`] for request failures, timeouts, and
    /// non-2xx statuses; [`FetchError::Parse`] for malformed bodies.
    pub async fn get_json(&self, url: &str) -> Result<serde_json::Value, FetchError> {
        let response = self.http.get(url).send().await?.error_for_status()?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| FetchError::Parse {
            message: format!("invalid JSON response: {e}"),
        })
    }

    /// Resolves the real paginated-endpoint URL via the dataset info
    /// document (`{ "url": "<string>" }`). Called once per session,
    /// before page 0.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the document cannot be fetched or lacks
    /// the `url` key.
    pub async fn resolve_dataset_url(&self, info_url: &str) -> Result<String, FetchError> {
        let body = self.get_json(info_url).await?;
        let info: DatasetInfo = serde_json::from_value(body).map_err(|e| FetchError::Parse {
            message: format!("malformed dataset info document: {e}"),
        })?;
        info.url.ok_or_else(|| FetchError::Parse {
            message: format!("dataset info document at {info_url} has no 'url' key"),
        })
    }
}

/// A [`PageSource`] backed by one resolved datastore endpoint.
#[derive(Debug, Clone)]
pub struct HttpPageSource {
    client: DatasetClient,
    base_url: String,
}

impl HttpPageSource {
    /// Creates a page source for the given endpoint URL.
    #[must_use]
    pub fn new(client: DatasetClient, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch_page(&self, limit: u64, offset: u64) -> Result<RawPage, FetchError> {
        // Discovered dataset URLs often already carry a query string.
        let separator = if self.base_url.contains('?') { '&' } else { '?' };
        let url = format!("{}{separator}limit={limit}&offset={offset}", self.base_url);

        log::debug!("Fetching page: {url}");

        let body = self.client.get_json(&url).await?;
        let response: DatastoreResponse =
            serde_json::from_value(body).map_err(|e| FetchError::Parse {
                message: format!("response missing result.results: {e}"),
            })?;

        Ok(RawPage {
            records: response.result.results,
            total_count: response.result.count,
        })
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn page_body(records: usize, count: Option<u64>) -> serde_json::Value {
        let results: Vec<serde_json::Value> = (0..records)
            .map(|i| serde_json::json!({ "緯度": "25.03", "經度": "121.56", "路名": format!("路{i}") }))
            .collect();
        match count {
            Some(n) => serde_json::json!({ "result": { "results": results, "count": n } }),
            None => serde_json::json!({ "result": { "results": results } }),
        }
    }

    #[tokio::test]
    async fn fetch_page_sends_limit_offset_and_json_headers() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/datastore"))
            .and(query_param("limit", "1000"))
            .and(query_param("offset", "2000"))
            .and(header("accept", "application/json"))
            .and(header("content-type", "application/json; charset=utf-8"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(3, Some(2340))))
            .mount(&server)
            .await;

        let client = DatasetClient::new().unwrap();
        let source = HttpPageSource::new(client, format!("{}/datastore", server.uri()));

        let page = source.fetch_page(1000, 2000).await.unwrap();
        assert_eq!(page.records.len(), 3);
        assert_eq!(page.total_count, Some(2340));
    }

    #[tokio::test]
    async fn fetch_page_appends_to_existing_query_string() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/datastore"))
            .and(query_param("scope", "resourceAquire"))
            .and(query_param("limit", "1000"))
            .and(query_param("offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(1, None)))
            .mount(&server)
            .await;

        let client = DatasetClient::new().unwrap();
        let source = HttpPageSource::new(
            client,
            format!("{}/datastore?scope=resourceAquire", server.uri()),
        );

        let page = source.fetch_page(1000, 0).await.unwrap();
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.total_count, None);
    }

    #[tokio::test]
    async fn non_2xx_status_is_a_transport_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = DatasetClient::new().unwrap();
        let source = HttpPageSource::new(client, server.uri());

        let err = source.fetch_page(1000, 0).await.unwrap_err();
        assert!(matches!(err, FetchError::Http(_)));
    }

    #[tokio::test]
    async fn malformed_body_is_a_parse_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let client = DatasetClient::new().unwrap();
        let source = HttpPageSource::new(client, server.uri());

        let err = source.fetch_page(1000, 0).await.unwrap_err();
        assert!(matches!(err, FetchError::Parse { .. }));
    }

    #[tokio::test]
    async fn missing_results_key_is_a_parse_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "result": { "total": 5 } })),
            )
            .mount(&server)
            .await;

        let client = DatasetClient::new().unwrap();
        let source = HttpPageSource::new(client, server.uri());

        let err = source.fetch_page(1000, 0).await.unwrap_err();
        assert!(matches!(err, FetchError::Parse { .. }));
    }

    #[tokio::test]
    async fn resolves_dataset_url_from_info_document() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/info.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({ "url": "https://data.example.gov/api?scope=resourceAquire" }),
            ))
            .mount(&server)
            .await;

        let client = DatasetClient::new().unwrap();
        let url = client
            .resolve_dataset_url(&format!("{}/info.json", server.uri()))
            .await
            .unwrap();
        assert_eq!(url, "https://data.example.gov/api?scope=resourceAquire");
    }

    #[tokio::test]
    async fn info_document_without_url_is_a_parse_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "name": "dataset" })),
            )
            .mount(&server)
            .await;

        let client = DatasetClient::new().unwrap();
        let err = client.resolve_dataset_url(&server.uri()).await.unwrap_err();
        assert!(matches!(err, FetchError::Parse { .. }));
    }
}
