//! Core domain types
//!
//! This module contains the core domain structures shared by the client and
//! the command line: submitted pipeline jobs, registered components and the
//! pipeline graph that wires component invocations together.

pub mod component;
pub mod job;
pub mod pipeline;
