use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, Url};

use crate::error::ApiError;
use crate::messages::ErrorPayload;
use crate::route::Route;
use crate::transport::{ApiRequest, ApiResponse, Method, SecretsApi};

/// Public GitHub REST API endpoint
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// REST API version pinned on every request
pub const API_VERSION: &str = "2022-11-28";

const DEFAULT_USER_AGENT: &str = concat!("ghseal/", env!("CARGO_PKG_VERSION"));

/// GitHub REST API client for the Actions secrets endpoints
pub struct GitHubClient {
    client: Client,
    base_url: Url,
    token: String,
}

impl GitHubClient {
    /// Create a client against `https://api.github.com`
    pub fn new(token: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_base_url(DEFAULT_API_URL, token)
    }

    /// Create a client against a custom API root (GitHub Enterprise, test servers)
    pub fn with_base_url(base_url: &str, token: impl Into<String>) -> Result<Self, ApiError> {
        let base_url =
            Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(format!(
                "{} cannot be used as a base URL",
                base_url
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            base_url,
            token: token.into(),
        })
    }

    /// Build the full URL for a route, percent-encoding each segment
    pub fn url_for(&self, route: &Route) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(route.segments());
        Ok(url)
    }
}

#[async_trait]
impl SecretsApi for GitHubClient {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let url = self.url_for(&request.route)?;

        tracing::debug!(method = %request.method, path = %request.route, "Sending API request");

        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .client
            .request(method, url)
            .bearer_auth(&self.token);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;

        tracing::debug!(status, path = %request.route, "Received API response");

        if status >= 400 {
            let message = serde_json::from_slice::<ErrorPayload>(&bytes)
                .map(|e| e.message)
                .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).trim().to_string());
            return Err(ApiError::status(status, message));
        }

        let body = if bytes.is_empty() {
            None
        } else {
            Some(serde_json::from_slice(&bytes)?)
        };

        Ok(ApiResponse::new(status, body))
    }
}
