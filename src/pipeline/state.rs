use std::fmt;

use serde::{Deserialize, Serialize};

use super::job::{PipelineRun, RunStatus, StageOutcome};

/// The five stages of an export run.
///
/// Each run flows through: START → EXPORTING → STAGED → WALKING → DONE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Start,
    Exporting,
    Staged,
    Walking,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Start => write!(f, "START"),
            Stage::Exporting => write!(f, "EXPORTING"),
            Stage::Staged => write!(f, "STAGED"),
            Stage::Walking => write!(f, "WALKING"),
            Stage::Done => write!(f, "DONE"),
        }
    }
}

/// The result of evaluating a stage transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Advance to the next stage.
    Next(Stage),
    /// A stage failed; the run stops without usable output.
    Abort { stage: Stage, reason: String },
    /// The run already reached `Done`.
    Complete,
}

/// Drives a [`PipelineRun`] through its stages.
pub struct StateMachine;

impl StateMachine {
    /// Compute and apply the next transition for `run` given the outcome of
    /// its current stage.
    ///
    /// The machine is linear: success always advances to the following stage
    /// and any failure aborts the run. `Done` is terminal.
    pub fn next(run: &mut PipelineRun, outcome: StageOutcome) -> Transition {
        let transition = match (run.stage, outcome) {
            (Stage::Done, _) => Transition::Complete,
            (stage, StageOutcome::Failure(reason)) => Transition::Abort { stage, reason },
            (Stage::Start, StageOutcome::Success) => Transition::Next(Stage::Exporting),
            (Stage::Exporting, StageOutcome::Success) => Transition::Next(Stage::Staged),
            (Stage::Staged, StageOutcome::Success) => Transition::Next(Stage::Walking),
            (Stage::Walking, StageOutcome::Success) => Transition::Next(Stage::Done),
        };

        match &transition {
            Transition::Next(next_stage) => {
                run.history.push(run.stage);
                run.stage = *next_stage;
                run.status = if *next_stage == Stage::Done {
                    RunStatus::Completed
                } else {
                    RunStatus::Running
                };
            }
            Transition::Abort { .. } => {
                run.history.push(run.stage);
                run.status = RunStatus::Aborted;
            }
            Transition::Complete => {}
        }

        transition
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_walks_all_stages() {
        let mut run = PipelineRun::new();
        assert_eq!(run.stage, Stage::Start);

        let t = StateMachine::next(&mut run, StageOutcome::Success);
        assert_eq!(t, Transition::Next(Stage::Exporting));
        assert_eq!(run.status, RunStatus::Running);

        let t = StateMachine::next(&mut run, StageOutcome::Success);
        assert_eq!(t, Transition::Next(Stage::Staged));

        let t = StateMachine::next(&mut run, StageOutcome::Success);
        assert_eq!(t, Transition::Next(Stage::Walking));

        let t = StateMachine::next(&mut run, StageOutcome::Success);
        assert_eq!(t, Transition::Next(Stage::Done));
        assert_eq!(run.status, RunStatus::Completed);

        // Done is terminal.
        let t = StateMachine::next(&mut run, StageOutcome::Success);
        assert_eq!(t, Transition::Complete);
        assert_eq!(run.stage, Stage::Done);
    }

    #[test]
    fn failure_while_exporting_aborts() {
        let mut run = PipelineRun::new();
        StateMachine::next(&mut run, StageOutcome::Success);

        let t = StateMachine::next(&mut run, StageOutcome::Failure("connection refused".into()));
        assert_eq!(
            t,
            Transition::Abort {
                stage: Stage::Exporting,
                reason: "connection refused".into()
            }
        );
        assert_eq!(run.status, RunStatus::Aborted);
        assert_eq!(run.stage, Stage::Exporting);
    }

    #[test]
    fn staged_run_skips_export_stages() {
        let mut run = PipelineRun::from_staged();
        assert_eq!(run.stage, Stage::Staged);

        StateMachine::next(&mut run, StageOutcome::Success);
        StateMachine::next(&mut run, StageOutcome::Success);
        assert_eq!(run.stage, Stage::Done);
        assert_eq!(run.history, vec![Stage::Staged, Stage::Walking]);
    }

    #[test]
    fn history_is_recorded() {
        let mut run = PipelineRun::new();
        for _ in 0..4 {
            StateMachine::next(&mut run, StageOutcome::Success);
        }
        assert_eq!(
            run.history,
            vec![Stage::Start, Stage::Exporting, Stage::Staged, Stage::Walking]
        );
    }

    #[test]
    fn stage_display() {
        assert_eq!(Stage::Start.to_string(), "START");
        assert_eq!(Stage::Exporting.to_string(), "EXPORTING");
        assert_eq!(Stage::Staged.to_string(), "STAGED");
        assert_eq!(Stage::Walking.to_string(), "WALKING");
        assert_eq!(Stage::Done.to_string(), "DONE");
    }
}
