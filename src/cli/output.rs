//! CLI output formatting

use crate::core::Stage;
use crate::toolchain::ToolchainInventory;
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Create a spinner for work of unknown length
pub fn create_spinner(message: impl Into<String>) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(spinner_style);
    }
    spinner.set_message(message.into());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Format a stage for display
pub fn format_stage(stage: Stage) -> String {
    match stage {
        Stage::Idle => style("IDLE").dim().to_string(),
        Stage::Succeeded => style("SUCCEEDED").green().to_string(),
        Stage::Failed => style("FAILED").red().to_string(),
        Stage::Cancelled => style("CANCELLED").yellow().to_string(),
        running => style(running.label()).cyan().to_string(),
    }
}

/// Render both toolchain mappings as an indented listing
pub fn format_inventory(inventory: &ToolchainInventory) -> String {
    let mut out = String::new();
    out.push_str(&format_section("Qt SDKs", &inventory.sdks));
    out.push('\n');
    out.push_str(&format_section("MinGW toolchains", &inventory.compilers));
    out
}

fn format_section(title: &str, entries: &BTreeMap<String, PathBuf>) -> String {
    let mut out = format!("{}\n", style(title).bold());
    if entries.is_empty() {
        out.push_str(&format!("  {}\n", style("none found").dim()));
    }
    for (label, bin) in entries {
        out.push_str(&format!(
            "  {} {}\n",
            style(label).cyan(),
            style(bin.display()).dim()
        ));
    }
    out
}

/// Format an elapsed time
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
