use crate::core::errors::{Dsp2Error, TransportError};
use async_trait::async_trait;
use reqwest::{header, Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, instrument, trace};

/// REST transport used by the authenticator and the client facade
///
/// Implementations own a single session bound to one base URL. The bearer token
/// attached to `get` requests is replaced through `set_token`, which is the only
/// mutator of the session headers.
#[async_trait]
pub trait RestClient: Send + Sync {
    /// Replace the bearer token sent with every subsequent `get`
    async fn set_token(&self, token: &str);

    /// Make an authenticated GET request
    ///
    /// # Arguments
    /// * `endpoint` - The API endpoint path
    /// * `query_params` - Query parameters as key-value pairs
    ///
    /// # Returns
    /// The response body as an untyped JSON value
    async fn get(&self, endpoint: &str, query_params: &[(&str, &str)])
        -> Result<Value, Dsp2Error>;

    /// POST a form-urlencoded body without a bearer token
    ///
    /// # Arguments
    /// * `endpoint` - The API endpoint path
    /// * `form` - Form fields as key-value pairs
    ///
    /// # Returns
    /// The response body as an untyped JSON value
    async fn post_form(&self, endpoint: &str, form: &[(&str, &str)]) -> Result<Value, Dsp2Error>;
}

/// Configuration for the REST client
#[derive(Clone, Debug)]
pub struct RestClientConfig {
    /// Base URL for the API
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string to include in requests
    pub user_agent: String,
}

impl RestClientConfig {
    /// Create a new configuration
    ///
    /// # Arguments
    /// * `base_url` - Base URL for the API
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            timeout_seconds: 30,
            user_agent: concat!("stetx/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }
}

/// Builder for creating REST client instances
pub struct RestClientBuilder {
    config: RestClientConfig,
}

impl RestClientBuilder {
    pub fn new(config: RestClientConfig) -> Self {
        Self { config }
    }

    /// Build the REST client
    pub fn build(self) -> Result<ReqwestRest, Dsp2Error> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(self.config.timeout_seconds))
            .user_agent(&self.config.user_agent)
            .build()
            .map_err(|e| Dsp2Error::ConstructionError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(ReqwestRest {
            client,
            config: self.config,
            token: Arc::new(RwLock::new(None)),
        })
    }
}

/// Implementation of `RestClient` using reqwest
///
/// Clones share the connection pool and the bearer token.
#[derive(Clone)]
pub struct ReqwestRest {
    client: Client,
    config: RestClientConfig,
    token: Arc<RwLock<Option<Secret<String>>>>,
}

impl std::fmt::Debug for ReqwestRest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestRest")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ReqwestRest {
    /// Create a new `ReqwestRest` instance with default transport settings
    pub fn new(base_url: String) -> Result<Self, Dsp2Error> {
        RestClientBuilder::new(RestClientConfig::new(base_url)).build()
    }

    /// Build the full URL for an endpoint
    fn build_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint)
    }

    /// Turn a response into JSON, or into a `RequestError` naming `endpoint`
    #[instrument(skip(self, response), fields(status = %response.status()))]
    async fn handle_response(
        &self,
        method: &'static str,
        endpoint: &str,
        response: Response,
    ) -> Result<Value, Dsp2Error> {
        let status = response.status();
        let response_text = response.text().await.map_err(|e| {
            error!(endpoint, error = %e, "Failed to read response body");
            Dsp2Error::request(method, endpoint, e)
        })?;

        trace!("Response body: {}", response_text);

        if status.is_success() {
            serde_json::from_str(&response_text).map_err(|e| {
                error!(endpoint, error = %e, "Response body is not valid JSON");
                Dsp2Error::request(method, endpoint, e)
            })
        } else {
            error!(endpoint, status = status.as_u16(), body = %response_text, "HTTP error");
            Err(Dsp2Error::request(
                method,
                endpoint,
                TransportError::Status {
                    status,
                    body: response_text,
                },
            ))
        }
    }
}

#[async_trait]
impl RestClient for ReqwestRest {
    async fn set_token(&self, token: &str) {
        *self.token.write().await = Some(Secret::new(token.to_string()));
    }

    #[instrument(skip(self, query_params), fields(endpoint = %endpoint, param_count = query_params.len()))]
    async fn get(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
    ) -> Result<Value, Dsp2Error> {
        debug!(?query_params, "GET {}", endpoint);

        let mut request = self.client.get(self.build_url(endpoint));
        if !query_params.is_empty() {
            request = request.query(query_params);
        }
        if let Some(token) = self.token.read().await.as_ref() {
            request = request.header(
                header::AUTHORIZATION,
                format!("Bearer {}", token.expose_secret()),
            );
        }

        let response = request.send().await.map_err(|e| {
            error!(endpoint, error = %e, "Transport error");
            Dsp2Error::request("GET", endpoint, e)
        })?;

        self.handle_response("GET", endpoint, response).await
    }

    #[instrument(skip(self, form), fields(endpoint = %endpoint))]
    async fn post_form(&self, endpoint: &str, form: &[(&str, &str)]) -> Result<Value, Dsp2Error> {
        let response = self
            .client
            .post(self.build_url(endpoint))
            .form(form)
            .send()
            .await
            .map_err(|e| {
                error!(endpoint, error = %e, "Transport error");
                Dsp2Error::request("POST", endpoint, e)
            })?;

        self.handle_response("POST", endpoint, response).await
    }
}
