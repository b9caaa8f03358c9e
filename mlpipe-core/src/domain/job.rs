//! Pipeline job domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Pipeline job record
///
/// Owned by the remote execution service. Locally this is a read-only
/// snapshot taken at the time of the last status query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineJob {
    pub id: Uuid,
    pub name: String,
    pub experiment_name: Option<String>,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub outputs: HashMap<String, JobOutput>,
    pub error: Option<JobDiagnostics>,
}

impl PipelineJob {
    /// Whether the remote service reports a terminal state
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Pipeline job execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Canceled,
}

impl JobStatus {
    /// Terminal states never transition again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Canceled
        )
    }

    /// Whether `next` is a legal successor of `self`
    ///
    /// Staying in the same state is always allowed. Non-terminal states only
    /// move forward (`Queued` -> `Running` -> terminal); terminal states are
    /// final.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        if self == next {
            return true;
        }
        match self {
            JobStatus::Queued => true,
            JobStatus::Running => next.is_terminal(),
            JobStatus::Completed | JobStatus::Failed | JobStatus::Canceled => false,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "Queued"),
            JobStatus::Running => write!(f, "Running"),
            JobStatus::Completed => write!(f, "Completed"),
            JobStatus::Failed => write!(f, "Failed"),
            JobStatus::Canceled => write!(f, "Canceled"),
        }
    }
}

/// Storage mode of a job input or output artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    Upload,
    Download,
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputMode::Upload => write!(f, "upload"),
            OutputMode::Download => write!(f, "download"),
        }
    }
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upload" => Ok(OutputMode::Upload),
            "download" => Ok(OutputMode::Download),
            other => Err(format!(
                "unknown storage mode '{}' (expected 'upload' or 'download')",
                other
            )),
        }
    }
}

/// A named output artifact produced by a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOutput {
    pub path: Option<String>,
    pub mode: OutputMode,
}

/// Diagnostic payload attached to a failed or canceled job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDiagnostics {
    pub code: Option<String>,
    pub message: String,
    /// Name of the pipeline node that failed, if known
    pub node: Option<String>,
}

impl fmt::Display for JobDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(node) = &self.node {
            write!(f, "[{}] ", node)?;
        }
        if let Some(code) = &self.code {
            write!(f, "{}: ", code)?;
        }
        write!(f, "{}", self.message)
    }
}
