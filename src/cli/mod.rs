//! Command-line interface

pub mod commands;
pub mod output;
pub mod terminal_output;

use clap::{Parser, Subcommand};
use commands::{BuildCommand, ScanCommand, ValidateCommand};
use std::ffi::OsString;

/// Build and deploy qmake projects with MinGW
#[derive(Debug, Parser, Clone)]
#[command(name = "qtpack")]
#[command(version)]
#[command(about = "Build, deploy and package qmake projects", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Configure, build and deploy a project
    Build(BuildCommand),

    /// Look for installed Qt SDKs and MinGW toolchains
    Scan(ScanCommand),

    /// Check a build file without running anything
    Validate(ValidateCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}
