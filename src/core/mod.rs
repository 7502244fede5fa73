//! Core domain models for qtpack
//!
//! This module defines the build configuration, the external source
//! manifest, and the stage machine that a build run walks through.

pub mod config;
pub mod error;
pub mod manifest;
pub mod project;
pub mod run;
pub mod state;

pub use config::*;
pub use error::PipelineError;
pub use manifest::*;
pub use run::PipelineRun;
pub use state::*;
