//! Main build pipeline - orchestrates configure, build, deploy and post-build steps

use crate::{
    core::{transition, BuildConfiguration, PipelineError, PipelineRun, Stage, StageOutcome},
    execution::{
        cleanup::clean_build_dir,
        copy::copy_manifest,
        events::{EventBus, PipelineEvent},
        process::{OutputCallback, OutputStream, ProcessExit, ProcessRunner, StopHandle, StopSignal, ToolInvocation},
    },
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Bookkeeping for the run currently in flight
struct ActiveRun {
    run_id: Uuid,
    stop: StopHandle,
    /// Set once the run reached a terminal stage; clean-up may still follow
    settled: Arc<AtomicBool>,
    /// Flips to true (or closes) once the run has fully wound down
    done: watch::Receiver<bool>,
}

impl ActiveRun {
    async fn wait(mut self) {
        let _ = self.done.wait_for(|done| *done).await;
    }
}

/// Forwards process output to the event bus
struct EventForwarder {
    events: EventBus,
}

impl OutputCallback for EventForwarder {
    fn on_output(&self, stream: OutputStream, text: &str) {
        match stream {
            OutputStream::Stdout => self.events.output(text),
            OutputStream::Stderr => self.events.output(format!("[Error] {}", text)),
        }
    }
}

/// Build pipeline: drives the external tools for one run at a time
pub struct BuildPipeline<R> {
    runner: Arc<R>,
    events: EventBus,
    active: Mutex<Option<ActiveRun>>,
}

impl<R: ProcessRunner + 'static> BuildPipeline<R> {
    pub fn new(runner: R) -> Self {
        Self::with_events(runner, EventBus::new())
    }

    /// Create a pipeline that emits on an existing bus
    pub fn with_events(runner: R, events: EventBus) -> Self {
        Self {
            runner: Arc::new(runner),
            events,
            active: Mutex::new(None),
        }
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&self, handler: F)
    where
        F: Fn(PipelineEvent) + Send + Sync + 'static,
    {
        self.events.add_handler(handler);
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Check whether a run is in flight
    pub fn is_running(&self) -> bool {
        self.active.lock().map(|a| a.is_some()).unwrap_or(false)
    }

    /// Stop the active run, killing its process.
    ///
    /// Returns false when there is nothing to stop, including a run that
    /// already succeeded or failed and is only winding down.
    pub fn stop(&self) -> bool {
        let Ok(active) = self.active.lock() else {
            return false;
        };
        match active.as_ref() {
            Some(run) if !run.settled.load(Ordering::SeqCst) => {
                info!("Stop requested for run {}", run.run_id);
                run.stop.stop()
            }
            _ => false,
        }
    }

    /// Execute a full build run.
    ///
    /// Configuration problems are reported before anything is started. Any
    /// run already in flight is stopped and awaited first. Exactly one
    /// `Finished` or `Error` event is emitted per call.
    pub async fn run(&self, config: BuildConfiguration) -> Result<PathBuf, PipelineError> {
        let mut run = match PipelineRun::prepare(config) {
            Ok(run) => run,
            Err(err) => {
                error!("Cannot start build: {}", err);
                self.events.emit(PipelineEvent::Error(err.to_string()));
                return Err(err);
            }
        };

        let (stop_handle, stop) = StopSignal::pair();
        let (done_tx, done_rx) = watch::channel(false);
        let settled = Arc::new(AtomicBool::new(false));

        let previous = self.swap_active(Some(ActiveRun {
            run_id: run.run_id,
            stop: stop_handle,
            settled: settled.clone(),
            done: done_rx,
        }));
        if let Some(previous) = previous {
            info!("Stopping run {} before starting {}", previous.run_id, run.run_id);
            previous.stop.stop();
            previous.wait().await;
        }

        let result = self.drive(&mut run, &stop, &settled).await;

        self.clear_active(run.run_id);
        let _ = done_tx.send(true);
        result
    }

    fn swap_active(&self, next: Option<ActiveRun>) -> Option<ActiveRun> {
        match self.active.lock() {
            Ok(mut active) => std::mem::replace(&mut *active, next),
            Err(_) => None,
        }
    }

    fn clear_active(&self, run_id: Uuid) {
        if let Ok(mut active) = self.active.lock() {
            if active.as_ref().is_some_and(|a| a.run_id == run_id) {
                *active = None;
            }
        }
    }

    /// Walk the stage machine until a terminal stage
    async fn drive(
        &self,
        run: &mut PipelineRun,
        stop: &StopSignal,
        settled: &AtomicBool,
    ) -> Result<PathBuf, PipelineError> {
        info!(
            "Starting build run {} for {} ({})",
            run.run_id,
            run.config.project_file.display(),
            run.config_dir
        );

        let mut failure = None;
        let mut stage = transition(Stage::Idle, &StageOutcome::Success, &run.plan);

        loop {
            run.stage = stage;
            if stage.is_terminal() {
                settled.store(true, Ordering::SeqCst);
            }
            self.events.emit(PipelineEvent::StageChanged {
                run_id: run.run_id,
                stage,
            });

            if stage.is_terminal() {
                break;
            }

            debug!("Entering stage {}", stage);
            let outcome = if stop.is_stopped() {
                StageOutcome::Cancelled
            } else {
                self.enter_stage(run, stage, stop).await
            };

            let next = transition(stage, &outcome, &run.plan);
            if let Some(err) = outcome.into_error(stage) {
                failure = Some(err);
            }
            stage = next;
        }

        match (stage, failure) {
            (Stage::Succeeded, _) => Ok(self.finish(run).await),
            (_, Some(err)) => {
                if err.is_cancellation() {
                    warn!("Run {} stopped by user", run.run_id);
                } else {
                    error!("Run {} failed: {}", run.run_id, err);
                }
                self.events.emit(PipelineEvent::Error(err.to_string()));
                Err(err)
            }
            (_, None) => {
                let err = PipelineError::Cancelled;
                self.events.emit(PipelineEvent::Error(err.to_string()));
                Err(err)
            }
        }
    }

    /// Side effects of entering a stage
    async fn enter_stage(&self, run: &mut PipelineRun, stage: Stage, stop: &StopSignal) -> StageOutcome {
        match stage {
            Stage::Configuring => {
                if let Err(e) = tokio::fs::create_dir_all(&run.config.output_dir).await {
                    return StageOutcome::Error(e.into());
                }
                let invocation = self
                    .invocation(run, run.tools.configure.clone())
                    .arg(run.config.project_file.to_string_lossy())
                    .arg(run.config.mode.config_flag());
                self.events
                    .output(format!("Running {}...\n", run.config.tools.configure));
                self.run_tool(invocation, stop).await
            }
            Stage::Building => {
                let invocation = self.invocation(run, run.tools.build.clone());
                self.events
                    .output(format!("Running {}...\n", run.config.tools.build));
                self.run_tool(invocation, stop).await
            }
            Stage::Deploying => {
                let executable = run.executable_path();
                if !executable.is_file() {
                    return StageOutcome::Error(PipelineError::ExecutableNotFound(executable));
                }
                let invocation = self
                    .invocation(run, run.tools.deploy.clone())
                    .arg(executable.to_string_lossy());
                self.events
                    .output(format!("Running {}...\n", run.config.tools.deploy));
                self.run_tool(invocation, stop).await
            }
            Stage::CopyingExternalSources => {
                self.events.output("Copying external sources...\n");
                let manifest = run.config.manifest.clone();
                let build_dir = run.build_dir();
                let events = self.events.clone();

                let copied =
                    tokio::task::spawn_blocking(move || copy_manifest(&manifest, &build_dir, &events))
                        .await;
                match copied {
                    Ok(Ok(_)) if stop.is_stopped() => StageOutcome::Cancelled,
                    Ok(Ok(_)) => StageOutcome::Success,
                    Ok(Err(e)) => StageOutcome::Error(e),
                    Err(e) => StageOutcome::Error(e.into()),
                }
            }
            Stage::DeployingQmlDependency(index) => {
                run.qml_index = index;
                let Some(entry) = run.qml_entry(index) else {
                    return StageOutcome::Error(PipelineError::Io(std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        format!("no QML dependency at index {}", index),
                    )));
                };
                let dependency = entry.resolve_destination(&run.build_dir());

                let qml_dir = run.config.qml_dir();
                if !qml_dir.is_dir() {
                    return StageOutcome::Error(PipelineError::QmlDirectoryNotFound(qml_dir));
                }

                let invocation = self
                    .invocation(run, run.tools.deploy.clone())
                    .arg(dependency.to_string_lossy())
                    .arg("--qmldir")
                    .arg(qml_dir.to_string_lossy());
                self.events.output(format!(
                    "Running {} for QML dependency {}...\n",
                    run.config.tools.deploy,
                    dependency.display()
                ));
                self.run_tool(invocation, stop).await
            }
            Stage::Idle | Stage::Succeeded | Stage::Failed | Stage::Cancelled => StageOutcome::Success,
        }
    }

    fn invocation(&self, run: &PipelineRun, program: PathBuf) -> ToolInvocation {
        ToolInvocation::new(program, &run.config.output_dir).env(run.path_override())
    }

    async fn run_tool(&self, invocation: ToolInvocation, stop: &StopSignal) -> StageOutcome {
        debug!("Invoking {} {:?}", invocation.program.display(), invocation.args);
        let forwarder = EventForwarder {
            events: self.events.clone(),
        };

        match self.runner.run(&invocation, &forwarder, stop).await {
            Ok(ProcessExit::Code(0)) => StageOutcome::Success,
            Ok(ProcessExit::Code(code)) => StageOutcome::Exited(code),
            Ok(ProcessExit::Abnormal) => StageOutcome::Abnormal,
            Ok(ProcessExit::Killed) => StageOutcome::Cancelled,
            Err(e) => StageOutcome::Error(e),
        }
    }

    /// Report success and run the optional clean-up
    async fn finish(&self, run: &PipelineRun) -> PathBuf {
        let build_dir = run.build_dir();
        info!(
            "Run {} finished in {}s: {}",
            run.run_id,
            run.elapsed_secs(),
            build_dir.display()
        );

        self.events.emit(PipelineEvent::Finished(build_dir.clone()));
        self.events.output("Build & Deploy finished!\n");

        if run.config.clean {
            let dir = build_dir.clone();
            let events = self.events.clone();
            match tokio::task::spawn_blocking(move || clean_build_dir(&dir, &events)).await {
                Ok(report) => debug!("Clean-up removed {} files", report.removed),
                Err(e) => {
                    warn!("Clean-up task failed: {}", e);
                    self.events.warning(format!("Clean-up did not complete: {}", e));
                }
            }
        }

        build_dir
    }
}
