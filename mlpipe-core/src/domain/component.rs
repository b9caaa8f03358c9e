//! Component domain types
//!
//! A component is a registered, versioned unit of remote computation. The
//! platform describes each one by its declared input and output ports.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Prefix used by the platform for registry references in pipeline files
const REGISTRY_PREFIX: &str = "azureml:";

/// Reference to a registered component by name and version
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentRef {
    pub name: String,
    pub version: String,
}

impl ComponentRef {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.version)
    }
}

impl FromStr for ComponentRef {
    type Err = String;

    /// Parses `name:version` or `azureml:name:version`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let body = trimmed.strip_prefix(REGISTRY_PREFIX).unwrap_or(trimmed);

        match body.rsplit_once(':') {
            Some((name, version)) if !name.is_empty() && !version.is_empty() => {
                Ok(ComponentRef::new(name, version))
            }
            _ => Err(format!(
                "invalid component reference '{}': expected 'name:version'",
                s
            )),
        }
    }
}

/// Data type carried by a component port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortType {
    UriFile,
    UriFolder,
    MlflowModel,
    String,
    Integer,
    Number,
    Boolean,
}

impl PortType {
    /// Artifact ports carry storage references rather than literal values
    pub fn is_artifact(self) -> bool {
        matches!(
            self,
            PortType::UriFile | PortType::UriFolder | PortType::MlflowModel
        )
    }
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PortType::UriFile => "uri_file",
            PortType::UriFolder => "uri_folder",
            PortType::MlflowModel => "mlflow_model",
            PortType::String => "string",
            PortType::Integer => "integer",
            PortType::Number => "number",
            PortType::Boolean => "boolean",
        };
        write!(f, "{}", name)
    }
}

/// Declared input or output of a component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortSpec {
    #[serde(rename = "type")]
    pub port_type: PortType,
    #[serde(default)]
    pub optional: bool,
    pub description: Option<String>,
}

impl PortSpec {
    pub fn required(port_type: PortType) -> Self {
        Self {
            port_type,
            optional: false,
            description: None,
        }
    }

    pub fn optional(port_type: PortType) -> Self {
        Self {
            port_type,
            optional: true,
            description: None,
        }
    }
}

/// Statically known shape of a registered component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    #[serde(default)]
    pub inputs: BTreeMap<String, PortSpec>,
    #[serde(default)]
    pub outputs: BTreeMap<String, PortSpec>,
}

impl ComponentDescriptor {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: None,
            inputs: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    /// Adds a declared input port
    pub fn with_input(mut self, name: impl Into<String>, spec: PortSpec) -> Self {
        self.inputs.insert(name.into(), spec);
        self
    }

    /// Adds a declared output port
    pub fn with_output(mut self, name: impl Into<String>, spec: PortSpec) -> Self {
        self.outputs.insert(name.into(), spec);
        self
    }

    pub fn reference(&self) -> ComponentRef {
        ComponentRef::new(&self.name, &self.version)
    }
}
