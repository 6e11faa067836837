use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::Stage;
use crate::error::MinifyError;
use crate::export::ExportStatus;
use crate::transform::AssetKind;

/// Lifecycle of a remote export job as seen by the poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    /// Started, no status response yet.
    Pending,
    /// At least one status response without an artifact.
    Running,
    /// The service reported an artifact filename.
    Complete,
}

/// A remote export job. Mutated only by polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportJob {
    pub id: String,
    pub status: JobStatus,
    /// Last progress value reported by the service; informational only.
    pub progress: Option<f64>,
    pub artifact: Option<String>,
    /// Number of status checks issued so far.
    pub checks: u32,
    pub started_at: DateTime<Utc>,
}

impl ExportJob {
    pub fn new(id: String) -> Self {
        Self {
            id,
            status: JobStatus::Pending,
            progress: None,
            artifact: None,
            checks: 0,
            started_at: Utc::now(),
        }
    }

    /// Record one status response and return the resulting job status.
    pub fn observe(&mut self, response: &ExportStatus) -> JobStatus {
        self.checks += 1;
        if response.progress.is_some() {
            self.progress = response.progress;
        }
        match response.artifact() {
            Some(name) => {
                self.artifact = Some(name.to_string());
                self.status = JobStatus::Complete;
            }
            None => self.status = JobStatus::Running,
        }
        self.status
    }
}

/// The result of executing one pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Success,
    Failure(String),
}

/// Overall status of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Running,
    Completed,
    Aborted,
}

/// One execution of the pipeline, tracked by the [`StateMachine`](super::StateMachine).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: String,
    pub stage: Stage,
    pub history: Vec<Stage>,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
}

impl PipelineRun {
    /// A full run that begins by starting a remote export.
    pub fn new() -> Self {
        Self::at(Stage::Start)
    }

    /// A run over a staging tree that is already populated.
    pub fn from_staged() -> Self {
        Self::at(Stage::Staged)
    }

    fn at(stage: Stage) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            stage,
            history: Vec::new(),
            status: RunStatus::Running,
            started_at: Utc::now(),
        }
    }
}

impl Default for PipelineRun {
    fn default() -> Self {
        Self::new()
    }
}

/// How a script or stylesheet (or any other file) reached the output tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransformOutcome {
    /// Minified bytes were written. Files of kind `Other` are never minified.
    Minified,
    /// Copied verbatim, either because the kind is `Other` or minification failed.
    Copied { fallback: Option<MinifyError> },
}

impl TransformOutcome {
    pub fn fallback(reason: MinifyError) -> Self {
        TransformOutcome::Copied {
            fallback: Some(reason),
        }
    }

    pub fn verbatim() -> Self {
        TransformOutcome::Copied { fallback: None }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, TransformOutcome::Copied { fallback: Some(_) })
    }
}

/// Per-file result: a transform outcome, or the I/O error that prevented writing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileResult {
    Written(TransformOutcome),
    Failed(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    /// Path relative to the staging root (and to the output root).
    pub path: PathBuf,
    pub kind: AssetKind,
    pub result: FileResult,
}

/// Structured record produced at the end of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub job_id: Option<String>,
    pub status: RunStatus,
    pub stages: Vec<Stage>,
    pub files: Vec<FileReport>,
    pub walk_errors: Vec<String>,
    pub overlaid: usize,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl RunReport {
    /// Build the report from a finished run and the per-file results.
    pub fn from_run(
        run: &PipelineRun,
        job: Option<&ExportJob>,
        files: Vec<FileReport>,
        walk_errors: Vec<String>,
        overlaid: usize,
    ) -> Self {
        let now = Utc::now();
        let mut stages = run.history.clone();
        stages.push(run.stage);

        Self {
            run_id: run.id.clone(),
            job_id: job.map(|j| j.id.clone()),
            status: run.status,
            stages,
            files,
            walk_errors,
            overlaid,
            started_at: run.started_at,
            completed_at: now,
            duration_ms: (now - run.started_at).num_milliseconds(),
        }
    }

    pub fn minified(&self) -> usize {
        self.count(|r| matches!(r, FileResult::Written(TransformOutcome::Minified)))
    }

    pub fn fallbacks(&self) -> usize {
        self.count(|r| matches!(r, FileResult::Written(o) if o.is_fallback()))
    }

    pub fn failures(&self) -> usize {
        self.count(|r| matches!(r, FileResult::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&FileResult) -> bool) -> usize {
        self.files.iter().filter(|f| pred(&f.result)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(progress: f64, filename: Option<&str>) -> ExportStatus {
        ExportStatus {
            progress: Some(progress),
            filename: filename.map(str::to_string),
        }
    }

    #[test]
    fn job_creation_defaults() {
        let job = ExportJob::new("job-1".into());
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.checks, 0);
        assert!(job.artifact.is_none());
    }

    #[test]
    fn observe_moves_pending_to_running_to_complete() {
        let mut job = ExportJob::new("job-1".into());

        assert_eq!(job.observe(&status(10.0, None)), JobStatus::Running);
        assert_eq!(job.progress, Some(10.0));

        assert_eq!(job.observe(&status(50.0, Some(""))), JobStatus::Running);
        assert!(job.artifact.is_none());

        assert_eq!(job.observe(&status(100.0, Some("out.zip"))), JobStatus::Complete);
        assert_eq!(job.artifact.as_deref(), Some("out.zip"));
        assert_eq!(job.checks, 3);
    }

    #[test]
    fn observe_keeps_last_known_progress() {
        let mut job = ExportJob::new("job-1".into());
        job.observe(&status(30.0, None));
        job.observe(&ExportStatus::default());
        assert_eq!(job.progress, Some(30.0));
    }

    #[test]
    fn report_counts_outcomes() {
        let run = PipelineRun::from_staged();
        let file = |name: &str, result| FileReport {
            path: PathBuf::from(name),
            kind: AssetKind::Other,
            result,
        };
        let report = RunReport::from_run(
            &run,
            None,
            vec![
                file("a.js", FileResult::Written(TransformOutcome::Minified)),
                file("b.css", FileResult::Written(TransformOutcome::fallback(MinifyError::Empty))),
                file("c.png", FileResult::Written(TransformOutcome::verbatim())),
                file("d.png", FileResult::Failed("disk full".into())),
            ],
            Vec::new(),
            0,
        );
        assert_eq!(report.minified(), 1);
        assert_eq!(report.fallbacks(), 1);
        assert_eq!(report.failures(), 1);
        assert_eq!(report.stages, vec![Stage::Staged]);
        assert!(report.job_id.is_none());
    }

    #[test]
    fn report_serializes() {
        let run = PipelineRun::new();
        let job = ExportJob::new("job-9".into());
        let report = RunReport::from_run(&run, Some(&job), Vec::new(), Vec::new(), 2);
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains(r#""job_id":"job-9""#));
        assert!(json.contains(r#""overlaid":2"#));
    }
}
