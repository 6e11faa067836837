//! Remote export job start and status polling.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info};

use crate::config::ExportScheme;
use crate::error::PipelineError;
use crate::export::ExportService;
use crate::pipeline::{ExportJob, JobStatus};

/// Starts an export and waits for its artifact.
pub struct ExportPoller<'a, S> {
    service: &'a S,
    interval: Duration,
    max_attempts: Option<u32>,
}

impl<'a, S: ExportService> ExportPoller<'a, S> {
    pub fn new(service: &'a S, interval: Duration) -> Self {
        Self {
            service,
            interval,
            max_attempts: None,
        }
    }

    /// Give up after `max_attempts` status checks. `None` polls forever.
    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub async fn start(
        &self,
        root_page_id: &str,
        scheme: &ExportScheme,
    ) -> Result<ExportJob, PipelineError> {
        let id = self.service.start_export(root_page_id, scheme).await?;
        info!(job_id = %id, root_page_id, "export started");
        Ok(ExportJob::new(id))
    }

    /// Issue one status check and fold the response into `job`.
    pub async fn poll(&self, job: &mut ExportJob) -> Result<JobStatus, PipelineError> {
        let response = self.service.check_status(&job.id).await?;
        let status = job.observe(&response);
        debug!(
            job_id = %job.id,
            progress = ?job.progress,
            check = job.checks,
            "export progress"
        );
        Ok(status)
    }

    /// Sleep one interval before every status check until the job reports an
    /// artifact. `on_progress` runs after each check.
    pub async fn wait_for_artifact(
        &self,
        job: &mut ExportJob,
        mut on_progress: impl FnMut(&ExportJob),
    ) -> Result<String, PipelineError> {
        loop {
            if let Some(limit) = self.max_attempts
                && job.checks >= limit
            {
                return Err(PipelineError::PollLimitExceeded {
                    job_id: job.id.clone(),
                    attempts: job.checks,
                });
            }

            sleep(self.interval).await;
            let status = self.poll(job).await?;
            on_progress(job);

            if status == JobStatus::Complete
                && let Some(artifact) = &job.artifact
            {
                info!(job_id = %job.id, %artifact, checks = job.checks, "export finished");
                return Ok(artifact.clone());
            }
        }
    }
}
