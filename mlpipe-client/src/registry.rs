//! Component registry resolution
//!
//! Fetches every component a pipeline needs once, up front, and returns a
//! [`ComponentRegistry`] for the pipeline builder.

use async_trait::async_trait;
use mlpipe_core::domain::component::{ComponentDescriptor, ComponentRef};
use mlpipe_core::domain::pipeline::PipelineSpec;
use mlpipe_core::registry::ComponentRegistry;
use tracing::{debug, info};

use crate::PlatformClient;
use crate::error::{ClientError, Result};

/// Anything that can look up a registered component
#[async_trait]
pub trait ComponentSource: Send + Sync {
    async fn fetch_component(&self, reference: &ComponentRef) -> Result<ComponentDescriptor>;
}

#[async_trait]
impl ComponentSource for PlatformClient {
    async fn fetch_component(&self, reference: &ComponentRef) -> Result<ComponentDescriptor> {
        self.get_component_ref(reference).await
    }
}

/// Resolves each reference once and collects the descriptors
///
/// Fails on the first component that cannot be fetched. A descriptor whose
/// name or version differs from the requested reference is rejected.
pub async fn resolve_components<S>(source: &S, references: &[ComponentRef]) -> Result<ComponentRegistry>
where
    S: ComponentSource + ?Sized,
{
    let mut registry = ComponentRegistry::new();

    for reference in references {
        if registry.contains(reference) {
            continue;
        }

        debug!(component = %reference, "Resolving component");
        let descriptor = source.fetch_component(reference).await?;

        if descriptor.reference() != *reference {
            return Err(ClientError::ParseError(format!(
                "requested component {} but platform returned {}",
                reference,
                descriptor.reference()
            )));
        }

        registry.register(descriptor);
    }

    info!("Resolved {} component(s)", registry.len());
    Ok(registry)
}

/// Resolves every component referenced by a loaded pipeline
pub async fn resolve_for_pipeline<S>(source: &S, spec: &PipelineSpec) -> Result<ComponentRegistry>
where
    S: ComponentSource + ?Sized,
{
    resolve_components(source, &spec.component_refs()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FakeSource {
        known: Vec<ComponentDescriptor>,
        calls: Mutex<Vec<ComponentRef>>,
    }

    #[async_trait]
    impl ComponentSource for FakeSource {
        async fn fetch_component(&self, reference: &ComponentRef) -> Result<ComponentDescriptor> {
            self.calls.lock().unwrap().push(reference.clone());
            self.known
                .iter()
                .find(|d| d.reference() == *reference)
                .cloned()
                .ok_or_else(|| ClientError::NotFound(format!("component {}", reference)))
        }
    }

    fn source() -> FakeSource {
        FakeSource {
            known: vec![
                ComponentDescriptor::new("register_tabular_dataset", "5"),
                ComponentDescriptor::new("convert_tabular_to_parquet", "5"),
            ],
            calls: Mutex::new(Vec::new()),
        }
    }

    #[tokio::test]
    async fn test_resolves_each_reference_once() {
        let source = source();
        let register = ComponentRef::new("register_tabular_dataset", "5");
        let convert = ComponentRef::new("convert_tabular_to_parquet", "5");

        let registry = resolve_components(&source, &[register.clone(), convert.clone(), register.clone()])
            .await
            .unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.contains(&convert));
        assert_eq!(source.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_component_fails() {
        let source = source();
        let err = resolve_components(&source, &[ComponentRef::new("rai_insights_gather", "5")])
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
