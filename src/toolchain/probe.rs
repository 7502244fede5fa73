//! Qt version detection through `qmake -v`

use regex::Regex;
use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;
use tracing::debug;

/// Trait for querying the Qt version of an installation
pub trait VersionProbe: Send + Sync {
    /// Return the Qt version reported by `qmake`, or `None` if `qmake`
    /// could not be run successfully
    fn qt_version(&self, qmake: &Path) -> Option<String>;
}

/// Version reported for a working `qmake` whose output names no Qt version
pub const UNKNOWN_QT_VERSION: &str = "Unknown";

/// Runs `qmake -v` and parses its output
#[derive(Debug, Clone, Default)]
pub struct QmakeVersionProbe;

impl VersionProbe for QmakeVersionProbe {
    fn qt_version(&self, qmake: &Path) -> Option<String> {
        let output = match Command::new(qmake).arg("-v").output() {
            Ok(output) => output,
            Err(e) => {
                debug!("Failed to run {} -v: {}", qmake.display(), e);
                return None;
            }
        };

        if !output.status.success() {
            debug!("{} -v exited with {}", qmake.display(), output.status);
            return None;
        }

        let version = parse_qt_version(&String::from_utf8_lossy(&output.stdout));
        if version.is_none() {
            debug!("{} -v printed no Qt version", qmake.display());
        }
        Some(version.unwrap_or_else(|| UNKNOWN_QT_VERSION.to_string()))
    }
}

/// Extract the version token from `qmake -v` output.
///
/// ```text
/// QMake version 3.1
/// Using Qt version 5.15.2 in C:/Qt/5.15.2/mingw81_64/lib
/// ```
pub fn parse_qt_version(output: &str) -> Option<String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"Using Qt version\s+(\S+)").expect("Qt version pattern is valid")
    });

    pattern
        .captures(output)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
