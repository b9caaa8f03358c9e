//! Component-related API endpoints

use crate::PlatformClient;
use crate::error::{ClientError, Result};
use mlpipe_core::domain::component::{ComponentDescriptor, ComponentRef};

impl PlatformClient {
    // =============================================================================
    // Component Resolution
    // =============================================================================

    /// Get a registered component by name and version
    ///
    /// # Arguments
    /// * `name` - The registered component name
    /// * `version` - The exact component version
    ///
    /// # Returns
    /// The component descriptor with its declared inputs and outputs
    ///
    /// # Example
    /// ```no_run
    /// # use mlpipe_client::PlatformClient;
    /// # async fn example() -> anyhow::Result<()> {
    /// let client = PlatformClient::new("http://localhost:8080");
    /// let component = client.get_component("register_tabular_dataset", "3").await?;
    /// println!("{} inputs", component.inputs.len());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get_component(&self, name: &str, version: &str) -> Result<ComponentDescriptor> {
        let url = format!(
            "{}/api/components/{}/versions/{}",
            self.base_url, name, version
        );
        let response = self.authorize(self.client.get(&url)).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(format!("component {}:{}", name, version)));
        }

        self.handle_response(response).await
    }

    /// Get a registered component by reference
    pub async fn get_component_ref(&self, reference: &ComponentRef) -> Result<ComponentDescriptor> {
        self.get_component(&reference.name, &reference.version).await
    }
}
