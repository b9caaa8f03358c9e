//! CLI configuration

use mlpipe_client::PlatformClient;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the platform API
    pub endpoint: String,

    /// Bearer token, if the platform requires one
    pub token: Option<String>,
}

impl Config {
    /// Builds a platform client for this configuration
    pub fn client(&self) -> PlatformClient {
        let client = PlatformClient::new(&self.endpoint);
        match &self.token {
            Some(token) => client.with_token(token),
            None => client,
        }
    }
}
