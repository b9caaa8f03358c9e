//! Job service seam
//!
//! The wait monitor talks to the platform only through [`JobService`], so it
//! can be driven by the HTTP client in production and by an in-memory fake
//! in tests.

use async_trait::async_trait;
use mlpipe_core::domain::job::PipelineJob;
use mlpipe_core::domain::pipeline::PipelineSpec;
use mlpipe_core::dto::job::SubmitJob;
use std::sync::Arc;
use uuid::Uuid;

use crate::PlatformClient;
use crate::error::Result;

/// Remote operations the wait monitor depends on
#[async_trait]
pub trait JobService: Send + Sync {
    /// Submits a pipeline job; each call creates a new remote job
    async fn submit(&self, spec: &PipelineSpec) -> Result<PipelineJob>;

    /// Reads the current job record
    async fn get_job(&self, job_id: Uuid) -> Result<PipelineJob>;
}

#[async_trait]
impl JobService for PlatformClient {
    async fn submit(&self, spec: &PipelineSpec) -> Result<PipelineJob> {
        self.submit_job(&SubmitJob::from(spec.clone())).await
    }

    async fn get_job(&self, job_id: Uuid) -> Result<PipelineJob> {
        PlatformClient::get_job(self, job_id).await
    }
}

#[async_trait]
impl<T: JobService + ?Sized> JobService for Arc<T> {
    async fn submit(&self, spec: &PipelineSpec) -> Result<PipelineJob> {
        (**self).submit(spec).await
    }

    async fn get_job(&self, job_id: Uuid) -> Result<PipelineJob> {
        (**self).get_job(job_id).await
    }
}
