//! mlpipe Core
//!
//! Core types and pipeline authoring for the mlpipe client SDK.
//!
//! This crate contains:
//! - Domain types: pipeline jobs, registered components, the pipeline graph
//! - DTOs: request and listing shapes for the platform API
//! - A typed component registry and a validating pipeline builder
//! - The YAML pipeline loader and the placeholder templating helper

pub mod builder;
pub mod definition;
pub mod domain;
pub mod dto;
pub mod error;
pub mod registry;
pub mod template;
pub mod timeouts;
mod validation;

pub use error::{PipelineError, Result};
