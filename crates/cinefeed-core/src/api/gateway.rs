//! Request/response pipeline shared by every backend call.
//!
//! The gateway reads the current credential from the `SessionStore`,
//! attaches it as a bearer token and turns responses into `ApiError`s.
//! A 401 from any endpoint clears the session and, when that ended an
//! authenticated session, asks the front-end to show the login view.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Client, Method, StatusCode, Url};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::{ApiError, LoginRedirect};
use crate::auth::SessionStore;

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Describes one backend call: method, path below the base URL, query and body.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to encode body: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Clone is cheap - the session, redirect and reqwest connection pool are shared.
#[derive(Clone)]
pub struct RequestGateway {
    client: Client,
    base_url: Url,
    session: Arc<SessionStore>,
    redirect: Arc<dyn LoginRedirect>,
}

impl RequestGateway {
    pub fn new(
        base_url: &str,
        session: Arc<SessionStore>,
        redirect: Arc<dyn LoginRedirect>,
    ) -> Result<Self, ApiError> {
        Self::with_timeout(
            base_url,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            session,
            redirect,
        )
    }

    pub fn with_timeout(
        base_url: &str,
        timeout: Duration,
        session: Arc<SessionStore>,
        redirect: Arc<dyn LoginRedirect>,
    ) -> Result<Self, ApiError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to build HTTP client: {}", e)))?;

        Self::with_client(client, base_url, session, redirect)
    }

    pub fn with_client(
        client: Client,
        base_url: &str,
        session: Arc<SessionStore>,
        redirect: Arc<dyn LoginRedirect>,
    ) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ApiError::InvalidRequest(format!("Invalid base URL {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidRequest(format!(
                "Base URL cannot carry paths: {}",
                base_url
            )));
        }

        Ok(Self {
            client,
            base_url,
            session,
            redirect,
        })
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Dispatch a request and parse the JSON response body.
    ///
    /// An empty success body parses as JSON `null`, so `T = ()` works for
    /// endpoints that return nothing useful.
    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let method = request.method.clone();
        let path = request.path.clone();
        let text = self.execute(request).await?;

        let trimmed = text.trim();
        let source = if trimmed.is_empty() { "null" } else { trimmed };
        serde_json::from_str(source).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse response from {} {}: {}", method, path, e))
        })
    }

    /// Dispatch a request and return the raw success body.
    pub async fn execute(&self, request: ApiRequest) -> Result<String, ApiError> {
        let url = self.url_for(&request.path)?;
        let credential = self.session.credential();

        let mut builder = self.client.request(request.method.clone(), url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(ref credential) = credential {
            builder = builder.bearer_auth(&credential.token);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        debug!(
            method = %request.method,
            path = %request.path,
            authenticated = credential.is_some(),
            "Sending request"
        );

        let response = builder.send().await.map_err(ApiError::Unreachable)?;
        let status = response.status();

        if status.is_success() {
            return response.text().await.map_err(ApiError::Unreachable);
        }

        let body = response.text().await.unwrap_or_default();

        if status == StatusCode::UNAUTHORIZED {
            let session_ended = self.handle_unauthorized(&request);
            return Err(ApiError::unauthorized(&body, session_ended));
        }

        debug!(method = %request.method, path = %request.path, %status, "Request rejected");
        Err(ApiError::from_status(status, &body))
    }

    /// Returns whether an authenticated session was ended.
    fn handle_unauthorized(&self, request: &ApiRequest) -> bool {
        if self.session.invalidate() {
            warn!(
                method = %request.method,
                path = %request.path,
                "Session rejected by server, redirecting to login"
            );
            self.redirect.redirect_to_login();
            true
        } else {
            // Anonymous callers get the error without a redirect loop
            debug!(path = %request.path, "401 without an active session");
            false
        }
    }

    fn url_for(&self, path: &str) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidRequest(format!("Base URL cannot carry paths: {}", self.base_url)))?
            .pop_if_empty()
            .extend(path.split('/').filter(|s| !s.is_empty()));
        Ok(url)
    }
}
