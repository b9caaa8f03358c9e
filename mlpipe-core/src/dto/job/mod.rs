//! Job DTOs for the platform API

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::job::{JobStatus, PipelineJob};
use crate::domain::pipeline::PipelineSpec;

/// Request to submit a pipeline job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitJob {
    pub pipeline: PipelineSpec,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

impl From<PipelineSpec> for SubmitJob {
    fn from(pipeline: PipelineSpec) -> Self {
        Self {
            pipeline,
            tags: HashMap::new(),
        }
    }
}

/// Lightweight job summary for listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: Uuid,
    pub name: String,
    pub experiment_name: Option<String>,
    pub status: JobStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<PipelineJob> for JobSummary {
    fn from(job: PipelineJob) -> Self {
        Self {
            id: job.id,
            name: job.name,
            experiment_name: job.experiment_name,
            status: job.status,
            created_at: job.created_at,
        }
    }
}
