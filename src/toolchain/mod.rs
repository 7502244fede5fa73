//! Discovery of installed Qt SDKs and MinGW toolchains

pub mod locator;
pub mod probe;

pub use locator::{ToolchainInventory, ToolchainLocator, DEFAULT_QT_ROOT};
pub use probe::{parse_qt_version, QmakeVersionProbe, VersionProbe, UNKNOWN_QT_VERSION};
