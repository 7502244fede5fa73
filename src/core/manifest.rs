//! External source manifest - extra files and folders bundled into the output

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How a manifest entry is treated after copying
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Plain file or folder, copied only
    #[default]
    Generic,
    /// QML plugin or module that needs a secondary deploy pass
    Qml,
}

/// A single file or folder to bundle into the build output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalSourceEntry {
    /// File or directory to copy
    pub source: PathBuf,

    /// Destination relative to the build output directory
    pub destination: String,

    #[serde(default)]
    pub kind: SourceKind,
}

impl ExternalSourceEntry {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<String>, kind: SourceKind) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            kind,
        }
    }

    /// Create an entry that lands at the top of the output directory under
    /// the source's own file name
    pub fn for_path(source: impl Into<PathBuf>, kind: SourceKind) -> Self {
        let source = source.into();
        let destination = source
            .file_name()
            .map(|name| format!("/{}", name.to_string_lossy()))
            .unwrap_or_default();
        Self {
            source,
            destination,
            kind,
        }
    }

    /// Destination with leading path separators removed
    pub fn relative_destination(&self) -> &str {
        self.destination.trim_start_matches(['/', '\\'])
    }

    /// Check that both source and destination are filled in
    pub fn is_complete(&self) -> bool {
        !self.source.as_os_str().is_empty() && !self.relative_destination().trim().is_empty()
    }

    /// Resolve the destination inside `output_dir`
    pub fn resolve_destination(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(self.relative_destination())
    }
}

/// Ordered list of entries to bundle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: Vec<ExternalSourceEntry>,
}

impl Manifest {
    pub fn new(entries: Vec<ExternalSourceEntry>) -> Self {
        Self { entries }
    }

    pub fn push(&mut self, entry: ExternalSourceEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ExternalSourceEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// QML-flagged entries that will be copied, in manifest order
    pub fn qml_entries(&self) -> impl Iterator<Item = &ExternalSourceEntry> {
        self.entries
            .iter()
            .filter(|e| e.kind == SourceKind::Qml && e.is_complete())
    }
}

impl FromIterator<ExternalSourceEntry> for Manifest {
    fn from_iter<I: IntoIterator<Item = ExternalSourceEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
