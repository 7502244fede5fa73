//! Project descriptor (.pro) inspection

use crate::core::error::PipelineError;
use std::path::Path;

/// Platform suffix appended to executable names
pub const EXE_SUFFIX: &str = std::env::consts::EXE_SUFFIX;

/// Append the platform executable suffix to a base name
pub fn executable_file_name(base: &str) -> String {
    format!("{}{}", base, EXE_SUFFIX)
}

/// Extract the `TARGET` value from project descriptor text.
///
/// The keyword is matched case-insensitively and surrounding whitespace is
/// ignored. The last non-empty assignment wins.
pub fn parse_target(content: &str) -> Option<String> {
    let mut target = None;

    for line in content.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        if !key.trim().eq_ignore_ascii_case("target") {
            continue;
        }
        let value = value.trim().trim_matches('"').trim();
        if !value.is_empty() {
            target = Some(value.to_string());
        }
    }

    target
}

/// Resolve the name of the executable a project file produces, including
/// the platform suffix.
///
/// Falls back to the project file's base name when no `TARGET` line exists.
pub fn resolve_executable_name(project_file: &Path) -> Result<String, PipelineError> {
    let content = std::fs::read_to_string(project_file).map_err(|source| {
        PipelineError::ProjectRead {
            path: project_file.to_path_buf(),
            source,
        }
    })?;

    let base = parse_target(&content).unwrap_or_else(|| {
        project_file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    });

    Ok(executable_file_name(&base))
}
