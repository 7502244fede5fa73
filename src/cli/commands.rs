//! CLI command definitions

use crate::core::{
    BuildConfiguration, BuildFile, BuildMode, ExternalSourceEntry, PathPolicy, SourceKind,
};
use crate::toolchain::DEFAULT_QT_ROOT;
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

/// Configure, build and deploy a project
#[derive(Debug, Args, Clone)]
pub struct BuildCommand {
    /// Build file (YAML); flags below override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to the .pro project file
    #[arg(short, long)]
    pub project: Option<PathBuf>,

    /// Qt bin directory (qmake, windeployqt)
    #[arg(long)]
    pub qt_bin: Option<PathBuf>,

    /// MinGW bin directory (mingw32-make)
    #[arg(long)]
    pub mingw_bin: Option<PathBuf>,

    /// Build output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Debug build
    #[arg(long, conflicts_with = "release")]
    pub debug: bool,

    /// Release build (default)
    #[arg(long)]
    pub release: bool,

    /// Delete intermediate build artifacts afterwards
    #[arg(long)]
    pub clean: bool,

    /// Extra file or folder to bundle (SRC or SRC=DEST)
    #[arg(long, value_parser = parse_source_spec)]
    pub include: Vec<SourceSpec>,

    /// QML plugin or module to bundle and deploy (SRC or SRC=DEST)
    #[arg(long, value_parser = parse_source_spec)]
    pub qml: Vec<SourceSpec>,

    /// Accept paths with non-ASCII characters
    #[arg(long)]
    pub allow_non_ascii: bool,
}

/// Look for installed toolchains
#[derive(Debug, Args, Clone)]
pub struct ScanCommand {
    /// Qt installation root
    #[arg(short, long, default_value = DEFAULT_QT_ROOT)]
    pub root: PathBuf,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Check a build file
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to the build file
    #[arg(short, long)]
    pub config: PathBuf,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// A source given on the command line, with an optional destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    pub source: PathBuf,
    pub destination: Option<String>,
}

impl SourceSpec {
    pub fn to_entry(&self, kind: SourceKind) -> ExternalSourceEntry {
        match &self.destination {
            Some(dest) => ExternalSourceEntry::new(&self.source, dest.clone(), kind),
            None => ExternalSourceEntry::for_path(&self.source, kind),
        }
    }
}

/// Parse `SRC` or `SRC=DEST`
pub fn parse_source_spec(s: &str) -> Result<SourceSpec, String> {
    let (source, destination) = match s.split_once('=') {
        Some((source, dest)) => (source, Some(dest.to_string())),
        None => (s, None),
    };
    if source.is_empty() {
        return Err(format!("Missing source path in: {}", s));
    }
    if destination.as_deref() == Some("") {
        return Err(format!("Missing destination after '=' in: {}", s));
    }
    Ok(SourceSpec {
        source: PathBuf::from(source),
        destination,
    })
}

impl BuildCommand {
    /// Assemble the run configuration from the build file (explicit or the
    /// default location) and the command-line overrides
    pub fn to_configuration(&self) -> Result<BuildConfiguration> {
        let file = self
            .config
            .clone()
            .or_else(|| BuildFile::default_path().filter(|p| p.is_file()));

        let mut config = match file {
            Some(path) => BuildFile::from_file(&path)
                .with_context(|| format!("Failed to load build file {}", path.display()))?
                .into_configuration(),
            None => BuildConfiguration::new(PathBuf::new(), PathBuf::new(), PathBuf::new(), PathBuf::new()),
        };

        if let Some(project) = &self.project {
            config.project_file = project.clone();
        }
        if let Some(qt_bin) = &self.qt_bin {
            config.toolchain_bin = qt_bin.clone();
        }
        if let Some(mingw_bin) = &self.mingw_bin {
            config.compiler_bin = mingw_bin.clone();
        }
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }

        if self.debug {
            config.mode = BuildMode::Debug;
        } else if self.release {
            config.mode = BuildMode::Release;
        }
        if self.clean {
            config.clean = true;
        }
        if self.allow_non_ascii {
            config.path_policy = PathPolicy::Any;
        }

        for spec in &self.include {
            config.manifest.push(spec.to_entry(SourceKind::Generic));
        }
        for spec in &self.qml {
            config.manifest.push(spec.to_entry(SourceKind::Qml));
        }

        Ok(config)
    }
}
