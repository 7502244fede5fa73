//! Terminal display of pipeline events
//!
//! `TerminalReporter` prints tool output as it streams in, with a numbered
//! header and a separator each time the run enters a new stage:
//!
//! ```text
//! ────────────────────────────────
//! [2/3] build (make)
//! ```

use crate::cli::output::{format_inventory, style, CHECK, CROSS, WARN};
use crate::execution::PipelineEvent;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Prints pipeline events to stdout/stderr
#[derive(Debug)]
pub struct TerminalReporter {
    stage_number: AtomicUsize,
    total_stages: usize,
    /// Whether the last text printed ended mid-line
    mid_line: AtomicBool,
}

impl TerminalReporter {
    /// Create a reporter for a run of `total_stages` working stages
    pub fn new(total_stages: usize) -> Self {
        Self {
            stage_number: AtomicUsize::new(0),
            total_stages,
            mid_line: AtomicBool::new(false),
        }
    }

    /// Handle a single event
    pub fn on_event(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::StageChanged { stage, .. } => {
                if !stage.is_terminal() {
                    let number = self.stage_number.fetch_add(1, Ordering::SeqCst) + 1;
                    self.print_stage_header(number, &stage.label());
                }
            }
            PipelineEvent::Output(text) => {
                if let Some(warning) = text.strip_prefix("[Warning] ") {
                    self.end_line();
                    println!("{} {}", WARN, style(warning.trim_end()).yellow());
                } else {
                    print!("{}", text);
                    self.mid_line.store(!text.ends_with('\n'), Ordering::SeqCst);
                    self.flush_stdout();
                }
            }
            PipelineEvent::Finished(dir) => {
                self.end_line();
                println!(
                    "{} Deployed to {}",
                    CHECK,
                    style(dir.display()).green()
                );
            }
            PipelineEvent::Error(message) => {
                self.end_line();
                eprintln!("{} {}", CROSS, style(message).red());
            }
            PipelineEvent::ToolchainsDiscovered(inventory) => {
                print!("{}", format_inventory(inventory));
            }
        }
    }

    /// Number of stage headers printed so far
    pub fn stages_seen(&self) -> usize {
        self.stage_number.load(Ordering::SeqCst)
    }

    fn print_stage_header(&self, number: usize, label: &str) {
        self.end_line();
        self.print_separator();
        println!(
            "[{}/{}] {}",
            style(number).cyan(),
            style(self.total_stages).dim(),
            style(label).bold()
        );
    }

    /// A horizontal rule spanning the terminal width
    fn print_separator(&self) {
        let width = term_size::dimensions_stdout()
            .map(|(w, _)| w)
            .unwrap_or(80);
        println!("{}", style("─".repeat(width)).dim());
    }

    fn end_line(&self) {
        if self.mid_line.swap(false, Ordering::SeqCst) {
            println!();
        }
    }

    fn flush_stdout(&self) {
        let _ = io::stdout().flush();
    }
}
