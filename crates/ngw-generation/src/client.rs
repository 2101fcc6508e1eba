//! HTTP client for the generation and lead-capture endpoints.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::endpoints;
use crate::error::GenerationError;
use crate::streaming::SectionStream;
use crate::types::{
    AnswerPageRequest, AnswerPageResponse, GeneratePageRequest, GeneratePageResponse,
    LeadSubmission,
};

/// Client for the generation backend.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct Client {
    /// HTTP client for making requests
    http_client: reqwest::Client,
    /// API base, always ending in `/`
    base_url: Url,
    /// Optional bearer token
    api_key: Option<String>,
    /// Per-request timeout for the single-shot endpoints
    request_timeout: Option<Duration>,
}

impl Client {
    /// Create a client for the API rooted at `endpoint`.
    ///
    /// # Example
    /// ```rust,no_run
    /// use ngw_generation::Client;
    ///
    /// # fn example() -> Result<(), ngw_generation::GenerationError> {
    /// let client = Client::new("https://api.example.com/v1")?;
    /// assert_eq!(client.base_url().as_str(), "https://api.example.com/v1/");
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(endpoint: &str) -> Result<Self, GenerationError> {
        let trimmed = endpoint.trim();
        if trimmed.is_empty() {
            return Err(GenerationError::ConfigError(
                "API endpoint is empty".to_string(),
            ));
        }
        let mut base_url = Url::parse(trimmed)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(GenerationError::HttpError)?;

        Ok(Self {
            http_client,
            base_url,
            api_key: None,
            request_timeout: None,
        })
    }

    /// Attach a bearer token to every request.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Bound the single-shot endpoints. Streams are bounded by the caller.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Get the API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build the URL for an endpoint path.
    pub(crate) fn endpoint_url(&self, path: &str) -> Result<Url, GenerationError> {
        Ok(self.base_url.join(path)?)
    }

    /// Build request headers.
    pub(crate) fn build_headers(&self, accept: &'static str) -> Result<HeaderMap, GenerationError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static(accept));
        if let Some(key) = &self.api_key {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", key))
                    .map_err(|e| GenerationError::ConfigError(e.to_string()))?,
            );
        }
        Ok(headers)
    }

    /// Open a `generate-page-stream` request.
    ///
    /// Returns once the response headers arrived with a success status; the
    /// body is consumed through the returned stream.
    pub async fn generate_page_stream(
        &self,
        request: &GeneratePageRequest,
    ) -> Result<SectionStream, GenerationError> {
        let url = self.endpoint_url(endpoints::GENERATE_PAGE_STREAM)?;
        tracing::debug!(segment = %request.segment, topic = ?request.topic, "POST {}", url);

        let response = self
            .http_client
            .post(url)
            .headers(self.build_headers("text/event-stream")?)
            .json(request)
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        Ok(SectionStream::new(response))
    }

    /// Generate a page through the single-shot JSON endpoint.
    pub async fn generate_page(
        &self,
        request: &GeneratePageRequest,
    ) -> Result<String, GenerationError> {
        let response: GeneratePageResponse =
            self.post_json(endpoints::GENERATE_PAGE, request).await?;
        Ok(response.html)
    }

    /// Generate (or fetch the cached) answer page for a chat question.
    pub async fn generate_answer_page(
        &self,
        request: &AnswerPageRequest,
    ) -> Result<AnswerPageResponse, GenerationError> {
        self.post_json(endpoints::GENERATE_ANSWER_PAGE, request).await
    }

    /// Submit a lead. The response body is ignored.
    pub async fn submit_lead(&self, lead: &LeadSubmission) -> Result<(), GenerationError> {
        let url = self.endpoint_url(endpoints::LEADS)?;
        let mut builder = self
            .http_client
            .post(url)
            .headers(self.build_headers("application/json")?)
            .json(lead);
        if let Some(timeout) = self.request_timeout {
            builder = builder.timeout(timeout);
        }
        let response = builder.send().await?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, GenerationError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.endpoint_url(path)?;
        tracing::debug!("POST {}", url);

        let mut builder = self
            .http_client
            .post(url)
            .headers(self.build_headers("application/json")?)
            .json(body);
        if let Some(timeout) = self.request_timeout {
            builder = builder.timeout(timeout);
        }
        let response = Self::check_status(builder.send().await?).await?;
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GenerationError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<unreadable body: {}>", e));
        tracing::warn!("API error {}: {}", status, message);
        Err(GenerationError::ApiError {
            status: status.as_u16(),
            message,
        })
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url.as_str())
            .field("has_api_key", &self.api_key.is_some())
            .finish_non_exhaustive()
    }
}
