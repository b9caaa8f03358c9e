//! Pipeline definition loader
//!
//! Parses the declarative YAML pipeline format into a [`PipelineSpec`]:
//!
//! ```yaml
//! type: pipeline
//! experiment_name: Use_Tabular_Dataset
//! settings:
//!   default_compute: cpucluster
//! inputs:
//!   target_column_name: income
//! outputs:
//!   dashboard:
//!     mode: upload
//! jobs:
//!   fetch_model_job:
//!     component: azureml:fetch_registered_model:4
//!     limits:
//!       timeout: 3600
//!     inputs:
//!       model_id: adult_model:1
//!   gather_job:
//!     component: azureml:rai_insights_gather:4
//!     inputs:
//!       constructor: ${{parent.jobs.construct_job.outputs.rai_insights_dashboard}}
//!     outputs:
//!       dashboard: ${{parent.outputs.dashboard}}
//! ```
//!
//! Input values are either literals or `${{parent.inputs.NAME}}` /
//! `${{parent.jobs.NODE.outputs.PORT}}` expressions. Jobs may appear in any
//! order; the loaded spec is sorted topologically and structurally validated.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::component::{ComponentRef, PortType};
use crate::domain::job::OutputMode;
use crate::domain::pipeline::{
    ComponentInvocation, InputBinding, JobInput, PipelineOutput, PipelineSpec,
};
use crate::error::PipelineError;

/// Errors raised while loading a pipeline definition
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("Pipeline file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read pipeline file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse pipeline YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Unsupported definition type '{0}' (expected 'pipeline')")]
    UnsupportedType(String),

    #[error("Job '{node}': {reason}")]
    InvalidComponent { node: String, reason: String },

    #[error("Job '{node}': input '{input}' has an invalid expression '{expression}'")]
    InvalidExpression {
        node: String,
        input: String,
        expression: String,
    },

    #[error("Job '{node}': output '{output}' binds to undeclared pipeline output '{name}'")]
    UnknownPipelineOutput {
        node: String,
        output: String,
        name: String,
    },

    #[error("Pipeline input '{name}': {reason}")]
    InvalidInput { name: String, reason: String },

    #[error("Value of {location} cannot be represented as JSON: {source}")]
    InvalidValue {
        location: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Pipeline output '{0}' is not bound to any job output")]
    UnboundOutput(String),

    #[error(transparent)]
    Invalid(#[from] PipelineError),
}

pub type Result<T> = std::result::Result<T, DefinitionError>;

#[derive(Debug, Deserialize)]
struct RawPipeline {
    #[serde(rename = "type")]
    kind: Option<String>,
    display_name: Option<String>,
    description: Option<String>,
    experiment_name: Option<String>,
    #[serde(default)]
    settings: RawSettings,
    #[serde(default)]
    inputs: BTreeMap<String, RawInput>,
    #[serde(default)]
    outputs: BTreeMap<String, RawPipelineOutput>,
    jobs: BTreeMap<String, RawJob>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSettings {
    default_compute: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawInput {
    Asset {
        #[serde(rename = "type")]
        input_type: PortType,
        path: Option<String>,
        default: Option<serde_yaml::Value>,
        mode: Option<OutputMode>,
    },
    Scalar(serde_yaml::Value),
}

#[derive(Debug, Default, Deserialize)]
struct RawPipelineOutput {
    mode: Option<OutputMode>,
}

#[derive(Debug, Deserialize)]
struct RawJob {
    component: String,
    #[serde(default)]
    inputs: BTreeMap<String, serde_yaml::Value>,
    #[serde(default)]
    outputs: BTreeMap<String, RawJobOutput>,
    limits: Option<RawLimits>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawJobOutput {
    Binding(String),
    Settings { mode: Option<OutputMode> },
}

#[derive(Debug, Deserialize)]
struct RawLimits {
    timeout: Option<u64>,
}

/// Parses a pipeline definition from YAML text
pub fn parse_pipeline(yaml: &str) -> Result<PipelineSpec> {
    let raw: RawPipeline = serde_yaml::from_str(yaml)?;

    if let Some(kind) = &raw.kind {
        if kind != "pipeline" {
            return Err(DefinitionError::UnsupportedType(kind.clone()));
        }
    }

    let inputs = raw
        .inputs
        .into_iter()
        .map(|(name, input)| {
            let input = convert_input(&name, input)?;
            Ok((name, input))
        })
        .collect::<Result<BTreeMap<_, _>>>()?;

    let mut outputs: BTreeMap<String, PipelineOutput> = BTreeMap::new();
    let mut jobs = Vec::with_capacity(raw.jobs.len());

    for (node, job) in raw.jobs {
        let component: ComponentRef =
            job.component
                .parse()
                .map_err(|reason| DefinitionError::InvalidComponent {
                    node: node.clone(),
                    reason,
                })?;

        let mut invocation = ComponentInvocation::new(node.clone(), component);
        invocation.timeout_seconds = job.limits.and_then(|limits| limits.timeout);

        for (input, value) in job.inputs {
            let binding = parse_binding(&node, &input, value)?;
            invocation.inputs.insert(input, binding);
        }

        for (port, output) in job.outputs {
            match output {
                RawJobOutput::Binding(expression) => {
                    let name = parse_parent_output(&expression).ok_or_else(|| {
                        DefinitionError::InvalidExpression {
                            node: node.clone(),
                            input: port.clone(),
                            expression: expression.clone(),
                        }
                    })?;
                    let declared = raw.outputs.get(&name).ok_or_else(|| {
                        DefinitionError::UnknownPipelineOutput {
                            node: node.clone(),
                            output: port.clone(),
                            name: name.clone(),
                        }
                    })?;
                    let mode = declared.mode.unwrap_or(OutputMode::Upload);
                    invocation.output_modes.insert(port.clone(), mode);
                    outputs.insert(
                        name,
                        PipelineOutput {
                            node: node.clone(),
                            output: port,
                            mode,
                        },
                    );
                }
                RawJobOutput::Settings { mode: Some(mode) } => {
                    invocation.output_modes.insert(port, mode);
                }
                RawJobOutput::Settings { mode: None } => {}
            }
        }

        jobs.push(invocation);
    }

    if let Some(unbound) = raw.outputs.keys().find(|name| !outputs.contains_key(*name)) {
        return Err(DefinitionError::UnboundOutput(unbound.clone()));
    }

    let spec = PipelineSpec {
        display_name: raw.display_name,
        description: raw.description,
        experiment_name: raw.experiment_name,
        compute: raw.settings.default_compute,
        inputs,
        jobs,
        outputs,
    };

    Ok(spec.into_topological()?)
}

/// Loads a pipeline definition from a YAML file
pub fn load_pipeline(path: impl AsRef<Path>) -> Result<PipelineSpec> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => DefinitionError::NotFound(path.to_path_buf()),
        _ => DefinitionError::Read {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    parse_pipeline(&content)
}

fn convert_input(name: &str, input: RawInput) -> Result<JobInput> {
    let location = || format!("pipeline input '{}'", name);

    match input {
        RawInput::Asset {
            input_type,
            path,
            default,
            mode,
        } => Ok(JobInput {
            input_type,
            path,
            value: default.map(|v| yaml_to_json(v, location())).transpose()?,
            mode,
        }),
        RawInput::Scalar(serde_yaml::Value::Mapping(_)) => Err(DefinitionError::InvalidInput {
            name: name.to_string(),
            reason: "mapping inputs must declare a valid 'type'".to_string(),
        }),
        RawInput::Scalar(value) => {
            let input_type = scalar_type(&value);
            Ok(JobInput::literal(input_type, yaml_to_json(value, location())?))
        }
    }
}

fn scalar_type(value: &serde_yaml::Value) -> PortType {
    match value {
        serde_yaml::Value::Bool(_) => PortType::Boolean,
        serde_yaml::Value::Number(n) if n.is_i64() || n.is_u64() => PortType::Integer,
        serde_yaml::Value::Number(_) => PortType::Number,
        _ => PortType::String,
    }
}

fn yaml_to_json(value: serde_yaml::Value, location: String) -> Result<serde_json::Value> {
    serde_json::to_value(value).map_err(|source| DefinitionError::InvalidValue { location, source })
}

/// Strips `${{ ... }}` and returns the trimmed inner expression
fn expression_body(text: &str) -> Option<&str> {
    text.trim()
        .strip_prefix("${{")
        .and_then(|rest| rest.strip_suffix("}}"))
        .map(str::trim)
}

fn parse_binding(node: &str, input: &str, value: serde_yaml::Value) -> Result<InputBinding> {
    let text = match value {
        serde_yaml::Value::String(text) => text,
        other => {
            let location = format!("job '{}' input '{}'", node, input);
            return Ok(InputBinding::Literal {
                value: yaml_to_json(other, location)?,
            });
        }
    };

    let Some(body) = expression_body(&text) else {
        return Ok(InputBinding::literal(text.clone()));
    };

    let parts: Vec<&str> = body.split('.').collect();
    match parts.as_slice() {
        ["parent", "inputs", name] => Ok(InputBinding::pipeline_input(*name)),
        ["parent", "jobs", upstream, "outputs", output] => {
            Ok(InputBinding::node_output(*upstream, *output))
        }
        _ => Err(DefinitionError::InvalidExpression {
            node: node.to_string(),
            input: input.to_string(),
            expression: text.clone(),
        }),
    }
}

fn parse_parent_output(expression: &str) -> Option<String> {
    let body = expression_body(expression)?;
    match body.split('.').collect::<Vec<_>>().as_slice() {
        ["parent", "outputs", name] => Some(name.to_string()),
        _ => None,
    }
}
