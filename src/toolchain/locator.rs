//! Toolchain locator - scans a Qt root for SDKs and companion compilers

use crate::core::{project::executable_file_name, PathPolicy, PipelineError};
use crate::execution::events::{EventBus, PipelineEvent};
use crate::toolchain::probe::{QmakeVersionProbe, VersionProbe};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Default install location of the Qt online installer
pub const DEFAULT_QT_ROOT: &str = "C:\\Qt";

/// Compiler directory prefixes accepted under a Qt version directory
const SDK_COMPILER_PREFIXES: &[&str] = &["mingw", "msvc"];

/// Display label → `bin` directory, for both kinds of installation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ToolchainInventory {
    /// Qt SDK installations (qmake, windeployqt)
    pub sdks: BTreeMap<String, PathBuf>,
    /// Companion compiler toolchains (g++, mingw32-make)
    pub compilers: BTreeMap<String, PathBuf>,
}

impl ToolchainInventory {
    pub fn is_empty(&self) -> bool {
        self.sdks.is_empty() && self.compilers.is_empty()
    }
}

/// Scans a root directory for toolchains
#[derive(Clone)]
pub struct ToolchainLocator {
    root: PathBuf,
    probe: Arc<dyn VersionProbe>,
    path_policy: PathPolicy,
}

impl ToolchainLocator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            probe: Arc::new(QmakeVersionProbe),
            path_policy: PathPolicy::default(),
        }
    }

    /// Use a different version probe
    pub fn with_probe(mut self, probe: impl VersionProbe + 'static) -> Self {
        self.probe = Arc::new(probe);
        self
    }

    pub fn with_path_policy(mut self, policy: PathPolicy) -> Self {
        self.path_policy = policy;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scan both kinds of installation. Blocking.
    pub fn scan(&self) -> Result<ToolchainInventory, PipelineError> {
        self.path_policy.check("toolchain root", &self.root)?;

        let inventory = ToolchainInventory {
            sdks: self.find_sdks(),
            compilers: self.find_compilers(),
        };
        info!(
            "Found {} Qt SDKs and {} compilers under {}",
            inventory.sdks.len(),
            inventory.compilers.len(),
            self.root.display()
        );
        Ok(inventory)
    }

    /// Scan on the blocking pool
    pub async fn scan_async(&self) -> Result<ToolchainInventory, PipelineError> {
        let locator = self.clone();
        tokio::task::spawn_blocking(move || locator.scan()).await?
    }

    /// Scan in the background and deliver the result on `events` as a
    /// single `ToolchainsDiscovered` event, or an `Error` event
    pub fn spawn_scan(&self, events: EventBus) -> JoinHandle<()> {
        let locator = self.clone();
        tokio::spawn(async move {
            match locator.scan_async().await {
                Ok(inventory) => events.emit(PipelineEvent::ToolchainsDiscovered(inventory)),
                Err(e) => {
                    warn!("Toolchain scan failed: {}", e);
                    events.emit(PipelineEvent::Error(e.to_string()));
                }
            }
        })
    }

    /// Qt SDKs: `<root>/<version>/<compiler>/bin/qmake`
    pub fn find_sdks(&self) -> BTreeMap<String, PathBuf> {
        let candidates: Vec<(String, PathBuf)> = subdirs(&self.root)
            .into_iter()
            .filter(|(name, _)| name.starts_with(|c: char| c.is_ascii_digit()))
            .flat_map(|(version, version_dir)| {
                subdirs(&version_dir)
                    .into_iter()
                    .filter(|(name, _)| {
                        let lower = name.to_lowercase();
                        SDK_COMPILER_PREFIXES.iter().any(|p| lower.starts_with(p))
                    })
                    .map(move |(_, compiler_dir)| (version.clone(), compiler_dir))
            })
            .collect();

        candidates
            .par_iter()
            .filter_map(|(version_dir, compiler_dir)| self.check_sdk(version_dir, compiler_dir))
            .collect()
    }

    fn check_sdk(&self, version_dir: &str, compiler_dir: &Path) -> Option<(String, PathBuf)> {
        let bin = compiler_dir.join("bin");
        let qmake = bin.join(executable_file_name("qmake"));
        if !qmake.is_file() {
            return None;
        }

        let compiler = dir_name(compiler_dir);
        let label = match self.probe.qt_version(&qmake) {
            Some(version) => format!("Qt {} ({})", version, compiler),
            None => format!("{} [{}] (invalid qmake)", compiler, version_dir),
        };
        debug!("Qt SDK candidate {} -> {}", label, bin.display());
        Some((label, bin))
    }

    /// Companion toolchains: `<root>/Tools/mingw*/bin` with g++ and make
    pub fn find_compilers(&self) -> BTreeMap<String, PathBuf> {
        let candidates: Vec<(String, PathBuf)> = subdirs(&self.root.join("Tools"))
            .into_iter()
            .filter(|(name, _)| name.to_lowercase().starts_with("mingw"))
            .collect();

        candidates
            .par_iter()
            .filter_map(|(name, dir)| {
                let bin = dir.join("bin");
                let complete = bin.join(executable_file_name("g++")).is_file()
                    && bin.join(executable_file_name("mingw32-make")).is_file();
                if !complete {
                    return None;
                }
                let label = format!("{} ({})", name, word_size(name));
                debug!("Compiler candidate {} -> {}", label, bin.display());
                Some((label, bin))
            })
            .collect()
    }
}

impl std::fmt::Debug for ToolchainLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolchainLocator")
            .field("root", &self.root)
            .field("path_policy", &self.path_policy)
            .finish()
    }
}

/// Word size classifier inferred from a toolchain directory name
pub fn word_size(dir_name: &str) -> &'static str {
    if dir_name.contains("64") {
        "64-bit"
    } else {
        "32-bit"
    }
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Immediate subdirectories of `dir` as (name, path); empty when `dir` is
/// missing or unreadable
fn subdirs(dir: &Path) -> Vec<(String, PathBuf)> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        debug!("Skipping missing directory {}", dir.display());
        return Vec::new();
    };

    entries
        .filter_map(Result::ok)
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|e| (e.file_name().to_string_lossy().into_owned(), e.path()))
        .collect()
}
