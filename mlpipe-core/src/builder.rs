//! Pipeline builder
//!
//! Assembles a [`PipelineSpec`] from components resolved in a
//! [`ComponentRegistry`]. Nodes can only consume outputs of nodes added
//! before them, so a built pipeline is always in topological order.
//!
//! # Example
//!
//! ```
//! use mlpipe_core::builder::PipelineBuilder;
//! use mlpipe_core::domain::component::{ComponentDescriptor, ComponentRef, PortSpec, PortType};
//! use mlpipe_core::registry::ComponentRegistry;
//!
//! let registry = ComponentRegistry::new().with(
//!     ComponentDescriptor::new("register_tabular_dataset", "1")
//!         .with_input("dataset_base_name", PortSpec::required(PortType::String)),
//! );
//!
//! let mut builder = PipelineBuilder::new(&registry).compute("cpucluster");
//! builder
//!     .node("register", &ComponentRef::new("register_tabular_dataset", "1"))
//!     .literal("dataset_base_name", "tabular_train_adult");
//!
//! let spec = builder.build().unwrap();
//! assert_eq!(spec.jobs.len(), 1);
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::debug;

use crate::domain::component::ComponentRef;
use crate::domain::job::OutputMode;
use crate::domain::pipeline::{
    ComponentInvocation, InputBinding, JobInput, PipelineOutput, PipelineSpec,
};
use crate::error::{PipelineError, Result};
use crate::registry::ComponentRegistry;

/// Incrementally builds a validated pipeline graph
pub struct PipelineBuilder<'r> {
    registry: &'r ComponentRegistry,
    spec: PipelineSpec,
    /// First error hit while adding nodes, reported by `build`
    deferred: Option<PipelineError>,
}

impl<'r> PipelineBuilder<'r> {
    pub fn new(registry: &'r ComponentRegistry) -> Self {
        Self {
            registry,
            spec: PipelineSpec {
                display_name: None,
                description: None,
                experiment_name: None,
                compute: None,
                inputs: BTreeMap::new(),
                jobs: Vec::new(),
                outputs: BTreeMap::new(),
            },
            deferred: None,
        }
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.spec.display_name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.spec.description = Some(description.into());
        self
    }

    pub fn experiment_name(mut self, name: impl Into<String>) -> Self {
        self.spec.experiment_name = Some(name.into());
        self
    }

    /// Default compute target for every node
    pub fn compute(mut self, compute: impl Into<String>) -> Self {
        self.spec.compute = Some(compute.into());
        self
    }

    /// Declares a pipeline-level input
    pub fn input(&mut self, name: impl Into<String>, input: JobInput) -> &mut Self {
        self.spec.inputs.insert(name.into(), input);
        self
    }

    /// Adds a component invocation and returns a handle for binding its inputs
    ///
    /// The component must be present in the registry; otherwise the error is
    /// reported by [`PipelineBuilder::build`].
    pub fn node(&mut self, name: impl Into<String>, component: &ComponentRef) -> NodeBuilder<'_, 'r> {
        let name = name.into();

        if self.deferred.is_none() && !self.registry.contains(component) {
            self.deferred = Some(PipelineError::UnknownComponent(component.clone()));
        }

        debug!(node = %name, component = %component, "Adding pipeline node");
        self.spec
            .jobs
            .push(ComponentInvocation::new(name, component.clone()));
        let index = self.spec.jobs.len() - 1;

        NodeBuilder {
            builder: self,
            index,
        }
    }

    /// Exposes a node output as a pipeline output with the given storage mode
    pub fn output(
        &mut self,
        name: impl Into<String>,
        node: impl Into<String>,
        output: impl Into<String>,
        mode: OutputMode,
    ) -> &mut Self {
        let node = node.into();
        let output = output.into();

        if let Some(job) = self.spec.jobs.iter_mut().find(|job| job.name == node) {
            job.output_modes.insert(output.clone(), mode);
        }

        self.spec
            .outputs
            .insert(name.into(), PipelineOutput { node, output, mode });
        self
    }

    /// Validates the graph against the registry and returns the spec
    pub fn build(self) -> Result<PipelineSpec> {
        if let Some(err) = self.deferred {
            return Err(err);
        }

        self.spec.validate_with(self.registry)?;
        Ok(self.spec)
    }
}

/// Handle to the most recently added node
pub struct NodeBuilder<'b, 'r> {
    builder: &'b mut PipelineBuilder<'r>,
    index: usize,
}

impl NodeBuilder<'_, '_> {
    fn job(&mut self) -> &mut ComponentInvocation {
        &mut self.builder.spec.jobs[self.index]
    }

    fn bind(&mut self, input: impl Into<String>, binding: InputBinding) -> &mut Self {
        self.job().inputs.insert(input.into(), binding);
        self
    }

    /// Binds an input to a literal value
    pub fn literal(
        &mut self,
        input: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> &mut Self {
        self.bind(input, InputBinding::literal(value))
    }

    /// Binds an input to a declared pipeline input
    pub fn from_input(&mut self, input: impl Into<String>, pipeline_input: impl Into<String>) -> &mut Self {
        self.bind(input, InputBinding::pipeline_input(pipeline_input))
    }

    /// Binds an input to the output of an earlier node
    pub fn from_output(
        &mut self,
        input: impl Into<String>,
        node: impl Into<String>,
        output: impl Into<String>,
    ) -> &mut Self {
        self.bind(input, InputBinding::node_output(node, output))
    }

    /// Sets the per-invocation execution limit, rounded up to whole seconds
    pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
        let mut seconds = timeout.as_secs();
        if timeout.subsec_nanos() > 0 {
            seconds = seconds.saturating_add(1);
        }
        self.job().timeout_seconds = Some(seconds);
        self
    }

    /// Overrides the storage mode of one of this node's outputs
    pub fn output_mode(&mut self, output: impl Into<String>, mode: OutputMode) -> &mut Self {
        self.job().output_modes.insert(output.into(), mode);
        self
    }

    /// Node name, for wiring downstream bindings
    pub fn name(&self) -> &str {
        &self.builder.spec.jobs[self.index].name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::component::{ComponentDescriptor, PortSpec, PortType};
    use crate::timeouts::DEFAULT_TIMEOUT;

    fn registry() -> ComponentRegistry {
        ComponentRegistry::new()
            .with(
                ComponentDescriptor::new("fetch_registered_model", "7")
                    .with_input("model_id", PortSpec::required(PortType::String))
                    .with_output("model_info_output_path", PortSpec::required(PortType::UriFolder)),
            )
            .with(
                ComponentDescriptor::new("rai_insights_constructor", "7")
                    .with_input("model_info_path", PortSpec::required(PortType::UriFolder))
                    .with_input("train_dataset", PortSpec::required(PortType::UriFile))
                    .with_input("maximum_rows_for_test_dataset", PortSpec::optional(PortType::Integer))
                    .with_output("rai_insights_dashboard", PortSpec::required(PortType::UriFolder)),
            )
    }

    fn fetch() -> ComponentRef {
        ComponentRef::new("fetch_registered_model", "7")
    }

    fn construct() -> ComponentRef {
        ComponentRef::new("rai_insights_constructor", "7")
    }

    #[test]
    fn test_build_wired_pipeline() {
        let registry = registry();
        let mut builder = PipelineBuilder::new(&registry)
            .compute("cpucluster")
            .experiment_name("Use_Tabular_Dataset_7");

        builder.input("train", JobInput::uri_file("adult_train_pq:7", OutputMode::Download));
        builder
            .node("fetch_model", &fetch())
            .literal("model_id", "adult_model:1")
            .timeout(DEFAULT_TIMEOUT);
        builder
            .node("construct", &construct())
            .from_output("model_info_path", "fetch_model", "model_info_output_path")
            .from_input("train_dataset", "train")
            .literal("maximum_rows_for_test_dataset", 5000)
            .timeout(DEFAULT_TIMEOUT);
        builder.output("dashboard", "construct", "rai_insights_dashboard", OutputMode::Upload);

        let spec = builder.build().unwrap();
        assert_eq!(spec.jobs.len(), 2);
        assert_eq!(spec.jobs[0].timeout(), Some(DEFAULT_TIMEOUT));
        assert_eq!(
            spec.jobs[1].output_modes.get("rai_insights_dashboard"),
            Some(&OutputMode::Upload)
        );
        assert_eq!(spec.outputs["dashboard"].mode, OutputMode::Upload);
    }

    #[test]
    fn test_unregistered_component_rejected() {
        let registry = registry();
        let mut builder = PipelineBuilder::new(&registry);
        builder
            .node("gather", &ComponentRef::new("rai_insights_gather", "7"))
            .literal("comment", "x");

        assert_eq!(
            builder.build().unwrap_err(),
            PipelineError::UnknownComponent(ComponentRef::new("rai_insights_gather", "7"))
        );
    }

    #[test]
    fn test_missing_required_input_rejected() {
        let registry = registry();
        let mut builder = PipelineBuilder::new(&registry);
        builder.node("fetch_model", &fetch());

        assert_eq!(
            builder.build().unwrap_err(),
            PipelineError::MissingInput {
                node: "fetch_model".to_string(),
                input: "model_id".to_string(),
            }
        );
    }

    #[test]
    fn test_undeclared_upstream_output_rejected() {
        let registry = registry();
        let mut builder = PipelineBuilder::new(&registry);
        builder.input("train", JobInput::uri_file("adult_train_pq:7", OutputMode::Download));
        builder.node("fetch_model", &fetch()).literal("model_id", "m:1");
        builder
            .node("construct", &construct())
            .from_output("model_info_path", "fetch_model", "model_output")
            .from_input("train_dataset", "train");

        let err = builder.build().unwrap_err();
        assert!(err.is_binding_error());
    }

    #[test]
    fn test_consuming_later_node_rejected() {
        let registry = registry();
        let mut builder = PipelineBuilder::new(&registry);
        builder.input("train", JobInput::uri_file("adult_train_pq:7", OutputMode::Download));
        builder
            .node("construct", &construct())
            .from_output("model_info_path", "fetch_model", "model_info_output_path")
            .from_input("train_dataset", "train");
        builder.node("fetch_model", &fetch()).literal("model_id", "m:1");

        assert!(matches!(
            builder.build(),
            Err(PipelineError::NotTopological { .. })
        ));
    }

    #[test]
    fn test_timeout_rounds_up() {
        let registry = registry();
        let mut builder = PipelineBuilder::new(&registry);
        let mut node = builder.node("fetch_model", &fetch());
        node.literal("model_id", "m:1")
            .timeout(Duration::from_millis(1500));
        assert_eq!(node.name(), "fetch_model");

        let spec = builder.build().unwrap();
        assert_eq!(spec.jobs[0].timeout_seconds, Some(2));
    }

    #[test]
    fn test_max_timeout_saturates() {
        let registry = registry();
        let mut builder = PipelineBuilder::new(&registry);
        builder
            .node("fetch_model", &fetch())
            .literal("model_id", "m:1")
            .timeout(Duration::MAX);

        let spec = builder.build().unwrap();
        assert_eq!(spec.jobs[0].timeout_seconds, Some(u64::MAX));
    }
}
