//! Job-related API endpoints

use crate::PlatformClient;
use crate::error::Result;
use mlpipe_core::domain::job::PipelineJob;
use mlpipe_core::dto::job::{JobSummary, SubmitJob};
use uuid::Uuid;

impl PlatformClient {
    // =============================================================================
    // Job Lifecycle
    // =============================================================================

    /// Submit a pipeline job for execution
    ///
    /// Every call creates a new remote job; submission is not idempotent.
    ///
    /// # Arguments
    /// * `req` - The submission request
    ///
    /// # Returns
    /// The created job, usually in `Queued` state
    pub async fn submit_job(&self, req: &SubmitJob) -> Result<PipelineJob> {
        let url = format!("{}/api/jobs", self.base_url);
        let response = self.authorize(self.client.post(&url)).json(req).send().await?;

        self.handle_response(response).await
    }

    /// Get a job by ID
    ///
    /// # Arguments
    /// * `job_id` - The job UUID
    ///
    /// # Returns
    /// The current job record
    pub async fn get_job(&self, job_id: Uuid) -> Result<PipelineJob> {
        let url = format!("{}/api/jobs/{}", self.base_url, job_id);
        let response = self.authorize(self.client.get(&url)).send().await?;

        self.handle_response(response).await
    }

    /// List jobs, optionally restricted to one experiment
    ///
    /// # Arguments
    /// * `experiment` - Experiment name filter
    ///
    /// # Returns
    /// Job summaries, newest first as ordered by the platform
    pub async fn list_jobs(&self, experiment: Option<&str>) -> Result<Vec<JobSummary>> {
        let url = format!("{}/api/jobs", self.base_url);
        let mut request = self.client.get(&url);
        if let Some(experiment) = experiment {
            request = request.query(&[("experiment", experiment)]);
        }
        let response = self.authorize(request).send().await?;

        self.handle_response(response).await
    }
}
