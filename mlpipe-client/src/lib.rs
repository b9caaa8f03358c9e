//! mlpipe HTTP Client
//!
//! A type-safe client for the managed pipeline platform, plus the wait
//! monitor that submits pipeline jobs and polls them to completion.
//!
//! # Example
//!
//! ```no_run
//! use mlpipe_client::{PlatformClient, WaitConfig, WaitMonitor};
//! use mlpipe_core::definition::load_pipeline;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = PlatformClient::new("http://localhost:8080");
//!     let spec = load_pipeline("pipeline.yaml")?;
//!
//!     let monitor = WaitMonitor::new(client, WaitConfig::default());
//!     let job = monitor.submit_and_wait(&spec, None).await?;
//!
//!     println!("Job {} finished: {}", job.id, job.status);
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod config;
mod components;
pub mod error;
mod jobs;
pub mod monitor;
pub mod registry;
pub mod service;
pub mod sink;

// Re-export commonly used types
pub use clock::{Clock, TokioClock};
pub use config::{BackoffPolicy, WaitConfig};
pub use error::{ClientError, Result};
pub use monitor::{MonitorState, SubmissionError, WaitError, WaitMonitor};
pub use service::JobService;
pub use sink::{MonitorEvent, MonitorSink, TracingSink};

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

/// HTTP client for the pipeline platform API
///
/// Methods are grouped by resource:
/// - Component resolution by name and version
/// - Job submission, lookup and listing
#[derive(Debug, Clone)]
pub struct PlatformClient {
    /// Base URL of the platform (e.g., "http://localhost:8080")
    base_url: String,
    /// Bearer token sent with every request, if any
    token: Option<String>,
    /// HTTP client instance
    client: Client,
}

impl PlatformClient {
    /// Create a new platform client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the platform API (e.g., "http://localhost:8080")
    ///
    /// # Example
    /// ```
    /// use mlpipe_client::PlatformClient;
    ///
    /// let client = PlatformClient::new("http://localhost:8080");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new platform client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    ///
    /// # Example
    /// ```
    /// use mlpipe_client::PlatformClient;
    /// use reqwest::Client;
    /// use std::time::Duration;
    ///
    /// let http_client = Client::builder()
    ///     .timeout(Duration::from_secs(30))
    ///     .build()
    ///     .unwrap();
    ///
    /// let client = PlatformClient::with_client("http://localhost:8080", http_client);
    /// ```
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            client,
        }
    }

    /// Attach a bearer token to every request
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Get the base URL of the platform
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    ///
    /// This method checks the status code and returns an appropriate error if
    /// the request failed, or deserializes the response body if successful.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}
