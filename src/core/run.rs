//! Per-run context owned by the build pipeline

use crate::core::{
    config::{BuildConfiguration, ResolvedTools},
    error::PipelineError,
    manifest::ExternalSourceEntry,
    project::resolve_executable_name,
    state::{RunPlan, Stage},
};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use uuid::Uuid;

/// State of a single build run.
///
/// Created fresh for every run and dropped once the run reaches a terminal
/// stage; nothing is carried over between runs.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub run_id: Uuid,

    pub started_at: DateTime<Utc>,

    pub stage: Stage,

    /// Index into the QML subset of the manifest
    pub qml_index: usize,

    pub config: BuildConfiguration,

    /// `release` or `debug`
    pub config_dir: &'static str,

    /// Executable file name including the platform suffix
    pub executable_name: String,

    pub tools: ResolvedTools,

    pub plan: RunPlan,
}

impl PipelineRun {
    /// Validate a configuration and capture it into a new run.
    ///
    /// Fails without side effects when a setting is missing, a path is
    /// rejected, the project file is absent, or a tool cannot be found.
    pub fn prepare(config: BuildConfiguration) -> Result<Self, PipelineError> {
        config.validate()?;

        if !config.project_file.is_file() {
            return Err(PipelineError::ProjectFileNotFound(config.project_file.clone()));
        }

        let tools = config.resolve_tools()?;
        let executable_name = resolve_executable_name(&config.project_file)?;

        let plan = RunPlan::for_manifest(&config.manifest);

        Ok(Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            stage: Stage::Idle,
            qml_index: 0,
            config_dir: config.mode.dir_name(),
            executable_name,
            tools,
            plan,
            config,
        })
    }

    /// Directory holding the built executable
    pub fn build_dir(&self) -> PathBuf {
        self.config.config_output_dir()
    }

    /// Full path of the built executable
    pub fn executable_path(&self) -> PathBuf {
        self.build_dir().join(&self.executable_name)
    }

    /// The QML-flagged manifest entry at `index`
    pub fn qml_entry(&self, index: usize) -> Option<&ExternalSourceEntry> {
        self.config.manifest.qml_entries().nth(index)
    }

    /// Environment override prepending the tool directories to `PATH`
    pub fn path_override(&self) -> Vec<(String, String)> {
        let inherited = std::env::var_os("PATH").unwrap_or_default();
        let dirs = [self.config.toolchain_bin.clone(), self.config.compiler_bin.clone()]
            .into_iter()
            .chain(std::env::split_paths(&inherited));

        match std::env::join_paths(dirs) {
            Ok(joined) => vec![("PATH".to_string(), joined.to_string_lossy().into_owned())],
            Err(_) => Vec::new(),
        }
    }

    /// Seconds since the run started
    pub fn elapsed_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}
