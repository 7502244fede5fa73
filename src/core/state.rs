//! Pipeline stage model and the transition function that drives it

use crate::core::{error::PipelineError, manifest::Manifest};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A discrete step of a build run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// No active run
    Idle,
    /// Configure tool generating makefiles from the project file
    Configuring,
    /// Build tool compiling in the output directory
    Building,
    /// Deploy tool gathering runtime dependencies next to the executable
    Deploying,
    /// Manifest entries being copied into the output tree
    CopyingExternalSources,
    /// Deploy tool re-run for the i-th QML-flagged manifest entry
    DeployingQmlDependency(usize),
    Succeeded,
    Failed,
    /// Stopped by an explicit user request
    Cancelled,
}

impl Stage {
    /// Check if the stage ends a run
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Succeeded | Stage::Failed | Stage::Cancelled)
    }

    /// Human-readable name used in failure messages
    pub fn label(&self) -> String {
        match self {
            Stage::Idle => "idle".to_string(),
            Stage::Configuring => "configure (qmake)".to_string(),
            Stage::Building => "build (make)".to_string(),
            Stage::Deploying => "deploy (windeployqt)".to_string(),
            Stage::CopyingExternalSources => "copy external sources".to_string(),
            Stage::DeployingQmlDependency(i) => format!("QML dependency deploy #{}", i + 1),
            Stage::Succeeded => "succeeded".to_string(),
            Stage::Failed => "failed".to_string(),
            Stage::Cancelled => "cancelled".to_string(),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Result of entering a stage
#[derive(Debug)]
pub enum StageOutcome {
    /// Process exited with code 0, or the in-process step completed
    Success,
    /// Process exited normally with a non-zero code
    Exited(i32),
    /// Process terminated without an exit code (crash, signal)
    Abnormal,
    /// The run was stopped by the user
    Cancelled,
    /// The stage could not run or its in-process work failed
    Error(PipelineError),
}

impl StageOutcome {
    /// Build the error reported when `stage` ended with this outcome.
    ///
    /// Returns `None` for `Success`.
    pub fn into_error(self, stage: Stage) -> Option<PipelineError> {
        match self {
            StageOutcome::Success => None,
            StageOutcome::Exited(code) => Some(match stage {
                Stage::Configuring | Stage::Building | Stage::Deploying => {
                    PipelineError::StageFailed { stage, code }
                }
                _ => PipelineError::AbnormalExit { code: Some(code) },
            }),
            StageOutcome::Abnormal => Some(PipelineError::AbnormalExit { code: None }),
            StageOutcome::Cancelled => Some(PipelineError::Cancelled),
            StageOutcome::Error(err) => Some(err),
        }
    }
}

/// The optional branches a run will take, fixed at run start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunPlan {
    /// Whether the manifest has entries to copy
    pub copy_external: bool,
    /// Number of QML-flagged manifest entries
    pub qml_targets: usize,
}

impl RunPlan {
    pub fn for_manifest(manifest: &Manifest) -> Self {
        Self {
            copy_external: !manifest.is_empty(),
            qml_targets: manifest.qml_entries().count(),
        }
    }

    /// Number of working stages a successful run passes through
    pub fn stage_count(&self) -> usize {
        3 + usize::from(self.copy_external) + self.qml_targets
    }

    /// The stage that follows `Deploying` or `CopyingExternalSources` when
    /// no copy is pending
    fn after_copy(&self) -> Stage {
        if self.qml_targets > 0 {
            Stage::DeployingQmlDependency(0)
        } else {
            Stage::Succeeded
        }
    }
}

/// Decide the next stage from the current stage and how it ended.
///
/// Terminal stages are fixed points. `Idle` followed by `Success` starts a run.
pub fn transition(current: Stage, outcome: &StageOutcome, plan: &RunPlan) -> Stage {
    if current.is_terminal() {
        return current;
    }

    match outcome {
        StageOutcome::Success => {}
        StageOutcome::Cancelled => return Stage::Cancelled,
        StageOutcome::Exited(_) | StageOutcome::Abnormal | StageOutcome::Error(_) => {
            return if current == Stage::Idle {
                Stage::Idle
            } else {
                Stage::Failed
            };
        }
    }

    match current {
        Stage::Idle => Stage::Configuring,
        Stage::Configuring => Stage::Building,
        Stage::Building => Stage::Deploying,
        Stage::Deploying => {
            if plan.copy_external {
                Stage::CopyingExternalSources
            } else {
                plan.after_copy()
            }
        }
        Stage::CopyingExternalSources => plan.after_copy(),
        Stage::DeployingQmlDependency(i) => {
            if i + 1 < plan.qml_targets {
                Stage::DeployingQmlDependency(i + 1)
            } else {
                Stage::Succeeded
            }
        }
        Stage::Succeeded | Stage::Failed | Stage::Cancelled => current,
    }
}

/// Walk the success path of a plan from `Idle` to its terminal stage
pub fn success_path(plan: &RunPlan) -> Vec<Stage> {
    let mut stages = Vec::new();
    let mut stage = transition(Stage::Idle, &StageOutcome::Success, plan);
    loop {
        stages.push(stage);
        if stage.is_terminal() {
            break;
        }
        stage = transition(stage, &StageOutcome::Success, plan);
    }
    stages
}
