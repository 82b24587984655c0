//! Pulp 3 REST client.
//!
//! Async HTTP client using `reqwest` with basic authentication. Resource
//! calls live in [`crate::resources`]; this module holds the request
//! plumbing shared by all of them.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use pulpdeploy_protocol::constants::API_REQUEST_TIMEOUT;
use pulpdeploy_protocol::{TaskHandle, TaskQuery};
use reqwest::{Method, RequestBuilder, Response, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ApiError;
use crate::poller::TaskSource;

/// Connection settings for a Pulp server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Scheme and authority, e.g. `https://pulp.example.com`.
    pub server: String,
    pub user: String,
    pub password: String,
    /// Timeout applied to every regular API request.
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(
        server: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            server: server.into(),
            user: user.into(),
            password: password.into(),
            timeout: API_REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Validates a server URL and strips any trailing slash.
///
/// Only `http` and `https` URLs with a host are accepted.
pub fn normalize_server(server: &str) -> Result<String, ApiError> {
    let parsed = Url::parse(server).map_err(|e| ApiError::InvalidUrl(format!("{server}: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ApiError::InvalidUrl(server.to_string()));
    }
    Ok(server.trim_end_matches('/').to_string())
}

/// Pulp API client.
#[derive(Debug, Clone)]
pub struct PulpClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl PulpClient {
    /// Creates a client for the configured server.
    pub fn new(mut config: ClientConfig) -> Result<Self, ApiError> {
        config.server = normalize_server(&config.server)?;
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Resolves an href returned by the server into a full URL.
    ///
    /// Pagination links are already absolute and are returned unchanged.
    pub fn url(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else {
            format!("{}{}", self.config.server, href)
        }
    }

    /// Adds the basic auth credentials to a request.
    pub fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        req.basic_auth(&self.config.user, Some(&self.config.password))
    }

    /// Builds an authenticated request for `href`.
    pub fn request(&self, method: Method, href: &str) -> RequestBuilder {
        self.authorize(self.http.request(method, self.url(href)))
    }

    /// Sends a request and returns the body if the status is `expected`.
    pub async fn execute(&self, req: RequestBuilder, expected: u16) -> Result<Vec<u8>, ApiError> {
        let resp = req.send().await?;
        expect_status(resp, expected).await
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, href: &str) -> Result<T, ApiError> {
        let body = self.execute(self.request(Method::GET, href), 200).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    pub(crate) async fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        href: &str,
        body: &B,
        expected: u16,
    ) -> Result<T, ApiError> {
        let req = self.request(method, href).json(body);
        let body = self.execute(req, expected).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Sends a request that spawns a server-side task (HTTP 202).
    pub(crate) async fn submit<B: Serialize>(
        &self,
        method: Method,
        href: &str,
        body: &B,
    ) -> Result<TaskHandle, ApiError> {
        let handle: TaskHandle = self.send_json(method, href, body, 202).await?;
        debug!(task = %handle.task, %href, "task submitted");
        Ok(handle)
    }

    pub(crate) async fn delete(&self, href: &str, expected: u16) -> Result<Vec<u8>, ApiError> {
        self.execute(self.request(Method::DELETE, href), expected)
            .await
    }

    /// Fetches the current document of a task.
    pub async fn task(&self, href: &str) -> Result<TaskQuery, ApiError> {
        self.get(href).await
    }
}

impl TaskSource for PulpClient {
    fn fetch_task<'a>(
        &'a self,
        href: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<TaskQuery, ApiError>> + Send + 'a>> {
        Box::pin(self.task(href))
    }
}

/// Returns the body of `resp` if its status is `expected`, otherwise an
/// [`ApiError::Status`] carrying the raw body.
pub async fn expect_status(resp: Response, expected: u16) -> Result<Vec<u8>, ApiError> {
    let status = resp.status().as_u16();
    if status != expected {
        let body = resp.text().await.unwrap_or_default();
        return Err(ApiError::Status {
            status,
            expected,
            body,
        });
    }
    Ok(resp.bytes().await?.to_vec())
}
