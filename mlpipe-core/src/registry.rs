//! Typed component registry
//!
//! Components are resolved from the platform once, when a pipeline is
//! constructed, and the registry is handed to the pipeline builder. Nothing
//! downstream looks components up by name on its own.

use std::collections::HashMap;

use crate::domain::component::{ComponentDescriptor, ComponentRef};
use crate::error::{PipelineError, Result};

/// Mapping from `(name, version)` to a component descriptor
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    components: HashMap<ComponentRef, ComponentDescriptor>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a descriptor, replacing any previous one for the same reference
    pub fn register(&mut self, descriptor: ComponentDescriptor) {
        self.components.insert(descriptor.reference(), descriptor);
    }

    /// Builder-style variant of [`ComponentRegistry::register`]
    pub fn with(mut self, descriptor: ComponentDescriptor) -> Self {
        self.register(descriptor);
        self
    }

    pub fn get(&self, reference: &ComponentRef) -> Option<&ComponentDescriptor> {
        self.components.get(reference)
    }

    /// Resolves a component, failing if it was never registered
    pub fn resolve(&self, name: &str, version: &str) -> Result<&ComponentDescriptor> {
        let reference = ComponentRef::new(name, version);
        self.components
            .get(&reference)
            .ok_or(PipelineError::UnknownComponent(reference))
    }

    pub fn contains(&self, reference: &ComponentRef) -> bool {
        self.components.contains_key(reference)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl FromIterator<ComponentDescriptor> for ComponentRegistry {
    fn from_iter<I: IntoIterator<Item = ComponentDescriptor>>(iter: I) -> Self {
        let mut registry = ComponentRegistry::new();
        for descriptor in iter {
            registry.register(descriptor);
        }
        registry
    }
}
