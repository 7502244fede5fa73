//! External tool invocation with streamed output and forceful stop

use crate::core::PipelineError;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::watch;
use tracing::{debug, warn};

/// A single external tool call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// Variables set for this process only
    pub env: Vec<(String, String)>,
}

impl ToolInvocation {
    pub fn new(program: impl Into<PathBuf>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, vars: Vec<(String, String)>) -> Self {
        self.env.extend(vars);
        self
    }

    /// File name of the program, for display
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }
}

/// How a process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessExit {
    /// Exited normally with this code
    Code(i32),
    /// Terminated without a code (crash or signal)
    Abnormal,
    /// Killed because a stop was requested
    Killed,
}

/// Which pipe a chunk of output came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Receives process output as it becomes available
pub trait OutputCallback: Send + Sync {
    fn on_output(&self, stream: OutputStream, text: &str);
}

/// No-op callback
#[derive(Debug, Clone, Default)]
pub struct NoopCallback;

impl OutputCallback for NoopCallback {
    fn on_output(&self, _stream: OutputStream, _text: &str) {}
}

/// Sending half of a stop request
#[derive(Debug)]
pub struct StopHandle {
    tx: watch::Sender<bool>,
}

impl StopHandle {
    /// Request a stop. Returns false if it was already requested.
    pub fn stop(&self) -> bool {
        !self.tx.send_replace(true)
    }
}

/// Receiving half of a stop request
#[derive(Debug, Clone)]
pub struct StopSignal {
    rx: watch::Receiver<bool>,
}

impl StopSignal {
    /// Create a connected handle/signal pair
    pub fn pair() -> (StopHandle, StopSignal) {
        let (tx, rx) = watch::channel(false);
        (StopHandle { tx }, StopSignal { rx })
    }

    /// A signal that never fires
    pub fn never() -> StopSignal {
        Self::pair().1
    }

    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once a stop is requested; pends forever if the handle is
    /// dropped without stopping
    pub async fn stopped(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|stopped| *stopped).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Trait for running external tools - allows for different implementations
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run a tool to completion, streaming its output to `callback`.
    ///
    /// Must kill the process and return `ProcessExit::Killed` as soon as
    /// `stop` fires.
    async fn run(
        &self,
        invocation: &ToolInvocation,
        callback: &dyn OutputCallback,
        stop: &StopSignal,
    ) -> Result<ProcessExit, PipelineError>;
}

/// Runs tools as real child processes via tokio
#[derive(Debug, Clone, Default)]
pub struct TokioProcessRunner;

impl TokioProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

/// Forward a pipe to the callback, one line at a time, verbatim
async fn pump<R>(reader: Option<R>, stream: OutputStream, callback: &dyn OutputCallback)
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return;
    };
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                debug!("{:?}: {} bytes", stream, n);
                callback.on_output(stream, &String::from_utf8_lossy(&buf));
            }
            Err(e) => {
                warn!("Failed to read {:?}: {}", stream, e);
                break;
            }
        }
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(
        &self,
        invocation: &ToolInvocation,
        callback: &dyn OutputCallback,
        stop: &StopSignal,
    ) -> Result<ProcessExit, PipelineError> {
        debug!(
            "Spawning {} {:?} in {}",
            invocation.program.display(),
            invocation.args,
            invocation.cwd.display()
        );

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| PipelineError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let finished = {
            let completion = async {
                let (_, _, status) = tokio::join!(
                    pump(stdout, OutputStream::Stdout, callback),
                    pump(stderr, OutputStream::Stderr, callback),
                    child.wait()
                );
                status
            };

            tokio::select! {
                status = completion => Some(status),
                _ = stop.stopped() => None,
            }
        };

        match finished {
            Some(status) => {
                let status = status?;
                Ok(match status.code() {
                    Some(code) => ProcessExit::Code(code),
                    None => ProcessExit::Abnormal,
                })
            }
            None => {
                debug!("Stop requested, killing {}", invocation.program_name());
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill {}: {}", invocation.program_name(), e);
                }
                Ok(ProcessExit::Killed)
            }
        }
    }
}
