//! Best-effort removal of intermediate build artifacts

use crate::execution::events::EventBus;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Patterns of intermediate files left next to the executable
pub const ARTIFACT_PATTERNS: &[&str] = &["*.cpp", "*.c", "*.o"];

/// Result of a clean-up pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed: usize,
    /// Files that matched but could not be deleted, with the reason
    pub failures: Vec<(PathBuf, String)>,
}

/// Files in `dir` (not recursive) matching the artifact patterns
pub fn find_artifacts(dir: &Path) -> Vec<PathBuf> {
    let escaped = glob::Pattern::escape(&dir.to_string_lossy());
    let mut found = Vec::new();

    for pattern in ARTIFACT_PATTERNS {
        let full = format!("{}/{}", escaped, pattern);
        let paths = match glob::glob(&full) {
            Ok(paths) => paths,
            Err(e) => {
                warn!("Bad artifact pattern {}: {}", full, e);
                continue;
            }
        };
        found.extend(paths.filter_map(Result::ok).filter(|p| p.is_file()));
    }

    found
}

/// Delete intermediate artifacts from `dir`.
///
/// Blocking. Failures to delete individual files are reported as warnings
/// and never abort the pass. A missing directory removes nothing.
pub fn clean_build_dir(dir: &Path, events: &EventBus) -> CleanupReport {
    remove_artifacts(dir, events, |path| std::fs::remove_file(path))
}

fn remove_artifacts<F>(dir: &Path, events: &EventBus, mut remove: F) -> CleanupReport
where
    F: FnMut(&Path) -> io::Result<()>,
{
    let mut report = CleanupReport::default();

    if !dir.is_dir() {
        debug!("Nothing to clean, {} does not exist", dir.display());
    } else {
        for path in find_artifacts(dir) {
            match remove(&path) {
                Ok(()) => report.removed += 1,
                Err(e) => {
                    warn!("Could not delete {}: {}", path.display(), e);
                    events.warning(format!("Could not delete {}: {}", path.display(), e));
                    report.failures.push((path, e.to_string()));
                }
            }
        }
    }

    events.output(format!("Cleaned {} build artifact files.\n", report.removed));
    report
}
