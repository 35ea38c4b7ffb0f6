//! Portal HTTP client
//!
//! Every call goes through [`ApiClient::send`], which attaches the stored
//! access token and, on a 401, renews it through the [`RefreshCoordinator`]
//! and replays the request once.

pub mod auth;
pub mod users;

use crate::config::ClientConfig;
use crate::error::{ClientError, extract_error_message};
use crate::refresh::RefreshCoordinator;
use crate::store::TokenStore;
use reqwest::{Client, ClientBuilder, Method, StatusCode, header};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// A request that can be rebuilt for a replay
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body
    pub fn json<B: serde::Serialize>(mut self, body: &B) -> Result<Self, ClientError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Portal API client
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    store: TokenStore,
    refresher: RefreshCoordinator,
}

impl ApiClient {
    /// Create a new client builder
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Create a client from loaded configuration
    pub fn from_config(config: &ClientConfig, store: TokenStore) -> Result<Self, ClientError> {
        let mut builder = Self::builder()
            .base_url(&config.api_url)
            .user_agent(&config.user_agent)
            .store(store);
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        builder.build()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The session this client reads credentials from
    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    pub fn refresher(&self) -> &RefreshCoordinator {
        &self.refresher
    }

    fn build(&self, request: &ApiRequest, access_token: Option<&str>) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self.client.request(request.method.clone(), url);

        if let Some(token) = access_token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        builder
    }

    /// Send a request, renewing the access token and replaying once on a 401
    pub async fn send(&self, request: &ApiRequest) -> Result<reqwest::Response, ClientError> {
        let access_token = self.store.access_token();
        debug!(method = %request.method, path = %request.path, "Sending request");
        let response = self.build(request, access_token.as_deref()).send().await?;

        if response.status() == StatusCode::UNAUTHORIZED && self.store.refresh_token().is_some() {
            let tokens = self.refresher.refresh(access_token.as_deref()).await?;
            debug!(method = %request.method, path = %request.path, "Replaying request with renewed token");
            let replay = self
                .build(request, Some(&tokens.access_token))
                .send()
                .await?;
            // The replay is final: a second 401 is returned as-is.
            return check_status(replay).await;
        }

        check_status(response).await
    }

    /// Execute a request and decode the JSON response
    pub async fn execute<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, ClientError> {
        let response = self.send(request).await?;
        Ok(response.json().await?)
    }

    /// Execute a request whose response has no body
    pub async fn execute_empty(&self, request: &ApiRequest) -> Result<(), ClientError> {
        self.send(request).await?;
        Ok(())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = extract_error_message(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .map_or_else(|| status.to_string(), str::to_string)
    });
    Err(ClientError::from_status(status, message))
}

/// Builder for ApiClient
#[derive(Default)]
pub struct ApiClientBuilder {
    base_url: Option<String>,
    store: Option<TokenStore>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl ApiClientBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the session store credentials are read from and written to
    pub fn store(mut self, store: TokenStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client
    pub fn build(self) -> Result<ApiClient, ClientError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;
        let store = self
            .store
            .ok_or_else(|| ClientError::Configuration("store is required".into()))?;

        url::Url::parse(&base_url)
            .map_err(|err| ClientError::Configuration(format!("invalid base_url: {err}")))?;

        // Ensure base_url ends without a trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();

        let mut client_builder = ClientBuilder::new();

        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| concat!("portal-client/", env!("CARGO_PKG_VERSION")).to_string());
        client_builder = client_builder.user_agent(user_agent);

        let client = client_builder.build()?;
        let refresher = RefreshCoordinator::new(client.clone(), &base_url, store.clone());

        Ok(ApiClient {
            client,
            base_url,
            store,
            refresher,
        })
    }
}
