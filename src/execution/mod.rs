//! Pipeline execution: process running, post-build steps and the engine

pub mod cleanup;
pub mod copy;
pub mod engine;
pub mod events;
pub mod process;

pub use cleanup::{clean_build_dir, CleanupReport};
pub use copy::{copy_entry, copy_manifest, CopyReport};
pub use engine::BuildPipeline;
pub use events::{EventBus, EventHandler, PipelineEvent};
pub use process::{
    NoopCallback, OutputCallback, OutputStream, ProcessExit, ProcessRunner, StopHandle, StopSignal,
    TokioProcessRunner, ToolInvocation,
};
