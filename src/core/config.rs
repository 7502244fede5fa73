//! Build configuration and build description files

use crate::core::{
    error::PipelineError,
    manifest::{ExternalSourceEntry, Manifest},
    project::executable_file_name,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Release or debug build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    #[default]
    Release,
    Debug,
}

impl BuildMode {
    pub fn from_release_flag(is_release: bool) -> Self {
        if is_release {
            BuildMode::Release
        } else {
            BuildMode::Debug
        }
    }

    /// Name of the per-configuration output subdirectory
    pub fn dir_name(&self) -> &'static str {
        match self {
            BuildMode::Release => "release",
            BuildMode::Debug => "debug",
        }
    }

    /// qmake argument selecting this configuration
    pub fn config_flag(&self) -> String {
        format!("CONFIG+={}", self.dir_name())
    }
}

/// Restriction applied to every user-supplied path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathPolicy {
    /// Only ASCII characters (MinGW toolchains choke on anything else)
    #[default]
    Ascii,
    /// No restriction
    Any,
}

impl PathPolicy {
    /// Check a single path, naming `field` in the error
    pub fn check(&self, field: &str, path: &Path) -> Result<(), PipelineError> {
        match self {
            PathPolicy::Any => Ok(()),
            PathPolicy::Ascii => {
                let ascii = path.to_str().is_some_and(|s| s.is_ascii());
                if ascii {
                    Ok(())
                } else {
                    Err(PipelineError::InvalidPath {
                        field: field.to_string(),
                        path: path.to_path_buf(),
                    })
                }
            }
        }
    }
}

/// Base names of the external tools, without the platform suffix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolNames {
    #[serde(default = "default_configure_tool")]
    pub configure: String,

    #[serde(default = "default_build_tool")]
    pub build: String,

    #[serde(default = "default_deploy_tool")]
    pub deploy: String,
}

fn default_configure_tool() -> String {
    "qmake".to_string()
}

fn default_build_tool() -> String {
    "mingw32-make".to_string()
}

fn default_deploy_tool() -> String {
    "windeployqt".to_string()
}

impl Default for ToolNames {
    fn default() -> Self {
        Self {
            configure: default_configure_tool(),
            build: default_build_tool(),
            deploy: default_deploy_tool(),
        }
    }
}

/// Tool executables resolved to full paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTools {
    pub configure: PathBuf,
    pub build: PathBuf,
    pub deploy: PathBuf,
}

/// Everything a single build run needs, captured at run start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfiguration {
    /// The `.pro` project descriptor
    pub project_file: PathBuf,

    /// Qt `bin` directory holding qmake and windeployqt
    pub toolchain_bin: PathBuf,

    /// Compiler `bin` directory holding the make tool
    pub compiler_bin: PathBuf,

    /// Build output root
    pub output_dir: PathBuf,

    /// Extra files to bundle
    pub manifest: Manifest,

    pub mode: BuildMode,

    /// Delete intermediate artifacts after a successful build
    pub clean: bool,

    pub tools: ToolNames,

    pub path_policy: PathPolicy,
}

impl BuildConfiguration {
    pub fn new(
        project_file: impl Into<PathBuf>,
        toolchain_bin: impl Into<PathBuf>,
        compiler_bin: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            project_file: project_file.into(),
            toolchain_bin: toolchain_bin.into(),
            compiler_bin: compiler_bin.into(),
            output_dir: output_dir.into(),
            manifest: Manifest::default(),
            mode: BuildMode::default(),
            clean: false,
            tools: ToolNames::default(),
            path_policy: PathPolicy::default(),
        }
    }

    pub fn with_manifest(mut self, manifest: Manifest) -> Self {
        self.manifest = manifest;
        self
    }

    pub fn with_mode(mut self, mode: BuildMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_clean(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }

    pub fn with_tools(mut self, tools: ToolNames) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_path_policy(mut self, policy: PathPolicy) -> Self {
        self.path_policy = policy;
        self
    }

    /// Directory holding the built executable, e.g. `output/release`
    pub fn config_output_dir(&self) -> PathBuf {
        self.output_dir.join(self.mode.dir_name())
    }

    /// QML metadata directory, a sibling of the Qt `bin` directory
    pub fn qml_dir(&self) -> PathBuf {
        self.toolchain_bin
            .parent()
            .map(|root| root.join("qml"))
            .unwrap_or_else(|| PathBuf::from("qml"))
    }

    /// Check that every required setting is present and allowed by the path
    /// policy. Does not touch the filesystem.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let required = [
            ("project file", &self.project_file),
            ("Qt bin directory", &self.toolchain_bin),
            ("compiler bin directory", &self.compiler_bin),
            ("output directory", &self.output_dir),
        ];

        for (field, path) in required {
            if path.as_os_str().is_empty() {
                return Err(PipelineError::MissingSetting(field));
            }
        }

        for (field, path) in required {
            self.path_policy.check(field, path)?;
        }

        for entry in self.manifest.entries() {
            self.path_policy.check("external source", &entry.source)?;
            self.path_policy
                .check("external destination", Path::new(&entry.destination))?;
        }

        Ok(())
    }

    /// Resolve the three tool executables and check they exist
    pub fn resolve_tools(&self) -> Result<ResolvedTools, PipelineError> {
        let tools = ResolvedTools {
            configure: self
                .toolchain_bin
                .join(executable_file_name(&self.tools.configure)),
            build: self.compiler_bin.join(executable_file_name(&self.tools.build)),
            deploy: self.toolchain_bin.join(executable_file_name(&self.tools.deploy)),
        };

        for tool in [&tools.configure, &tools.build, &tools.deploy] {
            if !tool.is_file() {
                return Err(PipelineError::ToolNotFound(tool.clone()));
            }
        }

        Ok(tools)
    }
}

/// Build description loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildFile {
    /// Path to the `.pro` file
    pub project: PathBuf,

    pub toolchain_bin: PathBuf,

    pub compiler_bin: PathBuf,

    pub output: PathBuf,

    #[serde(default)]
    pub mode: BuildMode,

    #[serde(default)]
    pub clean: bool,

    #[serde(default)]
    pub path_policy: PathPolicy,

    #[serde(default)]
    pub tools: ToolNames,

    #[serde(default)]
    pub external_sources: Vec<ExternalSourceEntry>,
}

impl BuildFile {
    /// Load a build description, resolving relative paths against the
    /// file's directory
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read build file {}", path.display()))?;
        let mut file = Self::from_yaml(&content)?;

        if let Some(base) = path.parent() {
            file.rebase(base);
        }

        Ok(file)
    }

    /// Parse a build description from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let file: BuildFile = serde_yaml::from_str(yaml).context("Invalid build file")?;
        Ok(file)
    }

    /// Default location of the user's build file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("qtpack").join("build.yaml"))
    }

    fn rebase(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if !p.as_os_str().is_empty() && p.is_relative() {
                *p = base.join(&*p);
            }
        };
        join(&mut self.project);
        join(&mut self.toolchain_bin);
        join(&mut self.compiler_bin);
        join(&mut self.output);
        for entry in &mut self.external_sources {
            join(&mut entry.source);
        }
    }

    /// Convert into a run configuration
    pub fn into_configuration(self) -> BuildConfiguration {
        BuildConfiguration::new(self.project, self.toolchain_bin, self.compiler_bin, self.output)
            .with_manifest(self.external_sources.into_iter().collect())
            .with_mode(self.mode)
            .with_clean(self.clean)
            .with_tools(self.tools)
            .with_path_policy(self.path_policy)
    }
}
