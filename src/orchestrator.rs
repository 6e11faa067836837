use std::path::Path;

use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::archive::ArchiveRetriever;
use crate::config::{ExportConfig, OverlayTarget};
use crate::error::PipelineError;
use crate::export::ExportService;
use crate::pipeline::{
    ExportJob, FileReport, FileResult, PipelineRun, RunReport, Stage, StageOutcome, StateMachine,
    Transition,
};
use crate::poller::ExportPoller;
use crate::transform::{StagedFile, Transformer};
use crate::ui::ProgressSink;
use crate::walker::list_files;

/// Drives an export run through START → EXPORTING → STAGED → WALKING → DONE.
pub struct Pipeline<S> {
    service: S,
    config: ExportConfig,
}

/// Per-file results and unreadable entries collected while walking.
struct WalkResult {
    files: Vec<FileReport>,
    errors: Vec<String>,
}

impl<S> Pipeline<S> {
    pub fn new(service: S, config: ExportConfig) -> Self {
        Self { service, config }
    }

    /// Process an already populated staging root: walk, transform, overlay.
    pub async fn process_staged(
        &self,
        progress: &impl ProgressSink,
    ) -> Result<RunReport, PipelineError> {
        let mut run = PipelineRun::from_staged();
        progress.stage(run.stage);

        let staging = &self.config.staging_root;
        let present = match tokio::fs::metadata(staging).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(PipelineError::Staging {
                path: staging.clone(),
                source: std::io::Error::other("not a directory"),
            }),
            Err(source) => Err(PipelineError::Staging {
                path: staging.clone(),
                source,
            }),
        };
        advance(&mut run, progress, present)?;

        self.finish(run, None, progress).await
    }

    /// WALKING → DONE, shared by full and staged-only runs.
    async fn finish(
        &self,
        mut run: PipelineRun,
        job: Option<&ExportJob>,
        progress: &impl ProgressSink,
    ) -> Result<RunReport, PipelineError> {
        let walked = self.walk_and_transform(progress).await;

        let overlay_root = match self.config.overlay_target {
            OverlayTarget::Staging => &self.config.staging_root,
            OverlayTarget::Output => &self.config.output_root,
        };
        let overlaid = overlay_dir(&self.config.redirect_root, overlay_root).await;
        let overlaid = advance(&mut run, progress, overlaid)?;

        let report = RunReport::from_run(&run, job, walked.files, walked.errors, overlaid);
        info!(
            run_id = %report.run_id,
            files = report.files.len(),
            minified = report.minified(),
            fallbacks = report.fallbacks(),
            failures = report.failures(),
            overlaid,
            "run finished"
        );
        Ok(report)
    }

    /// Transform every staged file, one at a time.
    async fn walk_and_transform(&self, progress: &impl ProgressSink) -> WalkResult {
        let staging = &self.config.staging_root;
        let transformer = Transformer::new(&self.config.output_root, self.config.wrap_width);
        let mut walked = WalkResult {
            files: Vec::new(),
            errors: Vec::new(),
        };

        for entry in list_files(staging) {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    warn!(error = %e, "unreadable staging entry");
                    walked.errors.push(e.to_string());
                    continue;
                }
            };
            let Some(file) = StagedFile::new(staging, path) else {
                continue;
            };

            let result = match transformer.process(&file).await {
                Ok(outcome) => FileResult::Written(outcome),
                Err(e) => {
                    error!(path = %file.relative.display(), error = %e, "failed to write output file");
                    FileResult::Failed(e.to_string())
                }
            };
            progress.file_processed(&file.relative, &result);
            walked.files.push(FileReport {
                path: file.relative,
                kind: file.kind,
                result,
            });
        }

        walked
    }
}

impl<S: ExportService> Pipeline<S> {
    /// Export the space, stage the artifact and process every staged file.
    ///
    /// Any failure before WALKING aborts the run.
    pub async fn run(&self, progress: &impl ProgressSink) -> Result<RunReport, PipelineError> {
        let mut run = PipelineRun::new();
        info!(run_id = %run.id, root_page_id = %self.config.root_page_id, "export run started");
        progress.stage(run.stage);

        // START / EXPORTING
        let poller = ExportPoller::new(&self.service, self.config.poll_interval())
            .with_max_attempts(self.config.max_poll_attempts);
        let mut job = match poller
            .start(&self.config.root_page_id, &self.config.export_scheme)
            .await
        {
            Ok(job) => job,
            Err(e) => return Err(abort(&mut run, e)),
        };

        let artifact = poller
            .wait_for_artifact(&mut job, |job| {
                if run.stage == Stage::Start
                    && let Transition::Next(stage) = StateMachine::next(&mut run, StageOutcome::Success)
                {
                    progress.stage(stage);
                }
                progress.export_progress(job);
            })
            .await;
        let artifact = advance(&mut run, progress, artifact)?;

        // STAGED
        let retriever = ArchiveRetriever::new(&self.config.staging_root);
        let staged = retriever.retrieve(&self.service, &job, &artifact).await;
        if staged.is_ok() {
            sleep(self.config.settle_delay()).await;
        }
        advance(&mut run, progress, staged)?;

        // WALKING / DONE
        self.finish(run, Some(&job), progress).await
    }
}

/// Apply a stage result to the state machine: success advances, failure aborts.
fn advance<T>(
    run: &mut PipelineRun,
    progress: &impl ProgressSink,
    result: Result<T, PipelineError>,
) -> Result<T, PipelineError> {
    match result {
        Ok(value) => {
            if let Transition::Next(stage) = StateMachine::next(run, StageOutcome::Success) {
                progress.stage(stage);
            }
            Ok(value)
        }
        Err(e) => Err(abort(run, e)),
    }
}

fn abort(run: &mut PipelineRun, e: PipelineError) -> PipelineError {
    if let Transition::Abort { stage, reason } =
        StateMachine::next(run, StageOutcome::Failure(e.to_string()))
    {
        error!(run_id = %run.id, %stage, error = %reason, "run aborted");
    }
    e
}

/// Copy every file under `from` into `to`, overwriting what is there.
///
/// A missing `from` directory is not an error.
pub async fn overlay_dir(from: &Path, to: &Path) -> Result<usize, PipelineError> {
    if !tokio::fs::try_exists(from).await? {
        warn!(path = %from.display(), "redirect directory not found, skipping overlay");
        return Ok(0);
    }

    let mut copied = 0;
    for entry in list_files(from) {
        let source = entry.map_err(|e| PipelineError::Staging {
            path: from.to_path_buf(),
            source: e.into(),
        })?;
        let Ok(relative) = source.strip_prefix(from) else {
            continue;
        };
        let dest = to.join(relative);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| PipelineError::Staging {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        tokio::fs::copy(&source, &dest)
            .await
            .map_err(|source| PipelineError::Staging {
                path: dest.clone(),
                source,
            })?;
        copied += 1;
    }

    info!(from = %from.display(), to = %to.display(), copied, "redirects overlaid");
    Ok(copied)
}
