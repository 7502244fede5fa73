//! Post-build copy of external sources into the output tree

use crate::core::{ExternalSourceEntry, Manifest, PipelineError};
use crate::execution::events::EventBus;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// What the copy step did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyReport {
    /// Entries copied, with their resolved destinations
    pub copied: Vec<PathBuf>,
    /// Entries skipped for an empty source or destination
    pub skipped: usize,
}

/// Copy every manifest entry into `output_dir`.
///
/// Blocking. Incomplete entries are skipped with a warning; the first I/O
/// failure aborts the whole step.
pub fn copy_manifest(
    manifest: &Manifest,
    output_dir: &Path,
    events: &EventBus,
) -> Result<CopyReport, PipelineError> {
    let mut report = CopyReport::default();

    for entry in manifest.entries() {
        if !entry.is_complete() {
            warn!("Skipping incomplete manifest entry: {:?}", entry);
            events.warning(format!(
                "Skipping external source with empty source or destination: '{}' -> '{}'",
                entry.source.display(),
                entry.destination
            ));
            report.skipped += 1;
            continue;
        }

        let destination = copy_entry(entry, output_dir)?;
        events.output(format!(
            "Copied {} -> {}\n",
            entry.source.display(),
            destination.display()
        ));
        report.copied.push(destination);
    }

    info!(
        "Copied {} external sources ({} skipped)",
        report.copied.len(),
        report.skipped
    );
    Ok(report)
}

/// Copy a single entry, returning its resolved destination
pub fn copy_entry(entry: &ExternalSourceEntry, output_dir: &Path) -> Result<PathBuf, PipelineError> {
    let destination = entry.resolve_destination(output_dir);
    let fail = |error: io::Error| PipelineError::Copy {
        from: entry.source.clone(),
        to: destination.clone(),
        error,
    };

    if escapes_root(entry.relative_destination()) {
        return Err(fail(io::Error::new(
            io::ErrorKind::InvalidInput,
            "destination must stay inside the output directory",
        )));
    }

    let metadata = fs::metadata(&entry.source).map_err(fail)?;

    if metadata.is_dir() {
        merge_dir(&entry.source, &destination).map_err(fail)?;
    } else {
        if same_file(&entry.source, &destination) {
            return Err(fail(io::Error::new(
                io::ErrorKind::InvalidInput,
                "source and destination are the same file",
            )));
        }
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(fail)?;
        }
        debug!(
            "Copying file {} to {}",
            entry.source.display(),
            destination.display()
        );
        fs::copy(&entry.source, &destination).map_err(fail)?;
    }

    Ok(destination)
}

/// `..` or a root/prefix component would land outside the output directory
fn escapes_root(relative: &str) -> bool {
    Path::new(relative)
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Recursively copy `src` into `dst`, overwriting files that collide and
/// leaving everything else in `dst` alone.
///
/// When `dst` lies inside `src`, that subtree is not walked.
fn merge_dir(src: &Path, dst: &Path) -> io::Result<()> {
    let src = fs::canonicalize(src)?;
    fs::create_dir_all(dst)?;
    let dst = fs::canonicalize(dst)?;

    if src == dst {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "source and destination are the same directory",
        ));
    }
    if dst.starts_with(&src) {
        debug!("Skipping {} while copying its parent", dst.display());
    }

    let walker = WalkDir::new(&src)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| e.path() != dst.as_path());

    for entry in walker {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(&src)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }

    Ok(())
}
