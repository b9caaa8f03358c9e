//! Data Transfer Objects for the platform API
//!
//! Request and listing shapes exchanged with the remote execution service.
//! Domain records (jobs, components) travel as-is.

pub mod job;
