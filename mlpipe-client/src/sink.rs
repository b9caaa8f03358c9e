//! Monitor event sinks
//!
//! The wait monitor reports progress to a caller-supplied [`MonitorSink`]
//! instead of logging through process-wide state. [`TracingSink`] forwards
//! events to `tracing`.

use mlpipe_core::domain::job::JobStatus;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Progress notifications emitted by the wait monitor
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    /// The platform accepted the job
    Submitted { job_id: Uuid, status: JobStatus },
    /// A status poll returned
    Polled {
        job_id: Uuid,
        status: JobStatus,
        elapsed: Duration,
    },
    /// The job moved to a new status
    StatusChanged {
        job_id: Uuid,
        from: JobStatus,
        to: JobStatus,
    },
    /// The platform reported a status that moves backwards
    Regressed {
        job_id: Uuid,
        from: JobStatus,
        to: JobStatus,
    },
    /// The job reached a terminal status
    Finished {
        job_id: Uuid,
        status: JobStatus,
        elapsed: Duration,
    },
    /// The wait bound elapsed; the remote job is still running
    TimedOut {
        job_id: Uuid,
        status: JobStatus,
        elapsed: Duration,
    },
}

/// Receiver for monitor progress
pub trait MonitorSink: Send + Sync {
    fn record(&self, event: &MonitorEvent);
}

/// Sink that forwards monitor events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl MonitorSink for TracingSink {
    fn record(&self, event: &MonitorEvent) {
        match event {
            MonitorEvent::Submitted { job_id, status } => {
                info!(%job_id, %status, "Pipeline job submitted");
            }
            MonitorEvent::Polled {
                job_id,
                status,
                elapsed,
            } => {
                debug!(%job_id, %status, elapsed_secs = elapsed.as_secs(), "Polled job status");
            }
            MonitorEvent::StatusChanged { job_id, from, to } => {
                info!(%job_id, %from, %to, "Job status changed");
            }
            MonitorEvent::Regressed { job_id, from, to } => {
                warn!(%job_id, %from, %to, "Platform reported a status regression");
            }
            MonitorEvent::Finished {
                job_id,
                status,
                elapsed,
            } => {
                info!(%job_id, %status, elapsed_secs = elapsed.as_secs(), "Job finished");
            }
            MonitorEvent::TimedOut {
                job_id,
                status,
                elapsed,
            } => {
                warn!(
                    %job_id,
                    %status,
                    elapsed_secs = elapsed.as_secs(),
                    "Gave up waiting; remote job left running"
                );
            }
        }
    }
}
