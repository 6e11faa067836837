mod job;
mod state;

pub use job::{
    ExportJob, FileReport, FileResult, JobStatus, PipelineRun, RunReport, RunStatus, StageOutcome,
    TransformOutcome,
};
pub use state::{Stage, StateMachine, Transition};
