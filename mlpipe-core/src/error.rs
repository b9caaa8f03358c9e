//! Error types for pipeline construction and validation

use thiserror::Error;

use crate::domain::component::ComponentRef;

/// Result type alias for pipeline construction
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Reasons a pipeline graph is rejected before submission
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("Pipeline has no component invocations")]
    EmptyPipeline,

    #[error("Node name '{0}' is used more than once")]
    DuplicateNode(String),

    #[error("Component {0} is not registered")]
    UnknownComponent(ComponentRef),

    #[error("Node '{node}': component {component} has no input named '{input}'")]
    UnknownInput {
        node: String,
        component: ComponentRef,
        input: String,
    },

    #[error("Node '{node}': required input '{input}' is not bound")]
    MissingInput { node: String, input: String },

    #[error("Node '{node}': input '{input}' references undeclared pipeline input '{name}'")]
    UndeclaredPipelineInput {
        node: String,
        input: String,
        name: String,
    },

    #[error("Node '{node}': input '{input}' references unknown node '{upstream}'")]
    UnknownNode {
        node: String,
        input: String,
        upstream: String,
    },

    #[error("Node '{node}': upstream node '{upstream}' does not declare output '{output}'")]
    UndeclaredOutput {
        node: String,
        upstream: String,
        output: String,
    },

    #[error("Node '{node}' consumes '{upstream}' which is not earlier in topological order")]
    NotTopological { node: String, upstream: String },

    #[error("Circular dependency detected involving node '{0}'")]
    Cycle(String),

    #[error("Pipeline output '{name}' references undeclared output '{node}.{output}'")]
    UnresolvedOutput {
        name: String,
        node: String,
        output: String,
    },

    #[error("Node '{0}' has a zero timeout")]
    InvalidTimeout(String),
}

impl PipelineError {
    /// Errors caused by an input binding that does not resolve
    pub fn is_binding_error(&self) -> bool {
        matches!(
            self,
            Self::UndeclaredPipelineInput { .. }
                | Self::UnknownNode { .. }
                | Self::UndeclaredOutput { .. }
                | Self::NotTopological { .. }
        )
    }
}
