//! Pipeline graph domain types
//!
//! A pipeline is a directed acyclic graph of component invocations. Edges
//! are bindings from an upstream node output to a downstream node input.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use super::component::{ComponentRef, PortType};
use super::job::OutputMode;

/// Submittable pipeline job description
///
/// `jobs` is kept in topological order once the spec has been validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSpec {
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub experiment_name: Option<String>,
    pub compute: Option<String>,
    #[serde(default)]
    pub inputs: BTreeMap<String, JobInput>,
    pub jobs: Vec<ComponentInvocation>,
    #[serde(default)]
    pub outputs: BTreeMap<String, PipelineOutput>,
}

impl PipelineSpec {
    /// Looks up an invocation by node name
    pub fn node(&self, name: &str) -> Option<&ComponentInvocation> {
        self.jobs.iter().find(|job| job.name == name)
    }

    /// Every distinct component referenced by the graph, in first-use order
    pub fn component_refs(&self) -> Vec<ComponentRef> {
        let mut refs: Vec<ComponentRef> = Vec::new();
        for job in &self.jobs {
            if !refs.contains(&job.component) {
                refs.push(job.component.clone());
            }
        }
        refs
    }
}

/// Pipeline-level input, e.g. a registered data asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobInput {
    #[serde(rename = "type")]
    pub input_type: PortType,
    /// Asset path (`adult_train_pq:3`) or literal value for scalar inputs
    pub path: Option<String>,
    pub value: Option<serde_json::Value>,
    pub mode: Option<OutputMode>,
}

impl JobInput {
    /// A `uri_file` asset input
    pub fn uri_file(path: impl Into<String>, mode: OutputMode) -> Self {
        Self {
            input_type: PortType::UriFile,
            path: Some(path.into()),
            value: None,
            mode: Some(mode),
        }
    }

    /// A `uri_folder` asset input
    pub fn uri_folder(path: impl Into<String>, mode: OutputMode) -> Self {
        Self {
            input_type: PortType::UriFolder,
            path: Some(path.into()),
            value: None,
            mode: Some(mode),
        }
    }

    /// A scalar pipeline parameter
    pub fn literal(input_type: PortType, value: serde_json::Value) -> Self {
        Self {
            input_type,
            path: None,
            value: Some(value),
            mode: None,
        }
    }
}

/// One node of the pipeline graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentInvocation {
    pub name: String,
    pub component: ComponentRef,
    #[serde(default)]
    pub inputs: BTreeMap<String, InputBinding>,
    /// Per-invocation execution limit
    pub timeout_seconds: Option<u64>,
    /// Storage mode overrides for this node's outputs
    #[serde(default)]
    pub output_modes: BTreeMap<String, OutputMode>,
}

impl ComponentInvocation {
    pub fn new(name: impl Into<String>, component: ComponentRef) -> Self {
        Self {
            name: name.into(),
            component,
            inputs: BTreeMap::new(),
            timeout_seconds: None,
            output_modes: BTreeMap::new(),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }

    /// Names of the nodes this invocation consumes outputs from
    pub fn upstream_nodes(&self) -> impl Iterator<Item = &str> {
        self.inputs.values().filter_map(|binding| match binding {
            InputBinding::NodeOutput { node, .. } => Some(node.as_str()),
            _ => None,
        })
    }
}

/// Source of a node input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputBinding {
    Literal { value: serde_json::Value },
    PipelineInput { name: String },
    NodeOutput { node: String, output: String },
}

impl InputBinding {
    pub fn literal(value: impl Into<serde_json::Value>) -> Self {
        InputBinding::Literal {
            value: value.into(),
        }
    }

    pub fn pipeline_input(name: impl Into<String>) -> Self {
        InputBinding::PipelineInput { name: name.into() }
    }

    pub fn node_output(node: impl Into<String>, output: impl Into<String>) -> Self {
        InputBinding::NodeOutput {
            node: node.into(),
            output: output.into(),
        }
    }
}

/// Pipeline-level output exposed from a node output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutput {
    pub node: String,
    pub output: String,
    pub mode: OutputMode,
}
