//! qtpack - build, deploy and package qmake projects with MinGW

pub mod cli;
pub mod core;
pub mod execution;
pub mod toolchain;

// Re-export commonly used types
pub use core::{
    BuildConfiguration, BuildFile, BuildMode, ExternalSourceEntry, Manifest, PathPolicy,
    PipelineError, SourceKind, Stage,
};
pub use execution::{BuildPipeline, EventBus, PipelineEvent, ProcessRunner, TokioProcessRunner};
pub use toolchain::{ToolchainInventory, ToolchainLocator};
