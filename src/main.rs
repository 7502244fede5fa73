use anyhow::{Context, Result};
use qtpack::cli::commands::{BuildCommand, ScanCommand, ValidateCommand};
use qtpack::cli::output::*;
use qtpack::cli::terminal_output::TerminalReporter;
use qtpack::cli::{Cli, Command};
use qtpack::core::{success_path, BuildFile, PipelineRun, RunPlan};
use qtpack::execution::{BuildPipeline, TokioProcessRunner};
use qtpack::toolchain::ToolchainLocator;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    match &cli.command {
        Command::Build(cmd) => run_build(cmd).await?,
        Command::Scan(cmd) => scan_toolchains(cmd).await?,
        Command::Validate(cmd) => validate_build_file(cmd)?,
    }

    Ok(())
}

async fn run_build(cmd: &BuildCommand) -> Result<()> {
    let config = cmd.to_configuration()?;

    println!(
        "{} Building {} ({})",
        ROCKET,
        style(config.project_file.display()).bold(),
        config.mode.dir_name()
    );

    let reporter = Arc::new(TerminalReporter::new(
        RunPlan::for_manifest(&config.manifest).stage_count(),
    ));
    let pipeline = Arc::new(BuildPipeline::new(TokioProcessRunner::new()));
    let sink = reporter.clone();
    pipeline.add_event_handler(move |event| sink.on_event(&event));

    // Ctrl-C stops the running tool instead of killing us mid-copy
    let stopper = pipeline.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stopper.stop();
        }
    });

    let started = Instant::now();
    let result = pipeline.run(config).await;
    ctrl_c.abort();

    match result {
        Ok(_) => {
            println!(
                "\n{} Build completed {} in {}",
                CHECK,
                style("successfully").green(),
                style(format_duration(started.elapsed())).dim()
            );
            Ok(())
        }
        Err(e) => {
            println!("\n{} Build {}", CROSS, style("failed").red());
            error!("{}", e);
            std::process::exit(1);
        }
    }
}

async fn scan_toolchains(cmd: &ScanCommand) -> Result<()> {
    let locator = ToolchainLocator::new(&cmd.root);

    let spinner = (!cmd.json).then(|| create_spinner(format!("Scanning {}...", cmd.root.display())));
    let result = locator.scan_async().await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let inventory = result.context("Toolchain scan failed")?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&inventory)?);
        return Ok(());
    }

    if inventory.is_empty() {
        println!(
            "{} No toolchains found under {}",
            WARN,
            style(cmd.root.display()).bold()
        );
    }
    print!("{}", format_inventory(&inventory));

    Ok(())
}

fn validate_build_file(cmd: &ValidateCommand) -> Result<()> {
    println!("{} Validating build file...", INFO);

    let file = match BuildFile::from_file(&cmd.config) {
        Ok(file) => file,
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(format!("{:#}", e)).red());
            std::process::exit(1);
        }
    };

    match PipelineRun::prepare(file.clone().into_configuration()) {
        Ok(run) => {
            println!("{} Build file is valid!", CHECK);
            println!("  Project: {}", style(run.config.project_file.display()).bold());
            println!("  Executable: {}", style(&run.executable_name).cyan());
            println!("  Output: {}", style(run.build_dir().display()).dim());
            println!(
                "  External sources: {} ({} QML)",
                style(run.config.manifest.len()).cyan(),
                style(run.plan.qml_targets).cyan()
            );
            let stages: Vec<String> = success_path(&run.plan)
                .iter()
                .filter(|stage| !stage.is_terminal())
                .map(|stage| stage.label())
                .collect();
            println!("  Stages: {}", style(stages.join(" -> ")).dim());

            if cmd.json {
                let json = serde_json::to_string_pretty(&file)?;
                println!("\n{}", json);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(e).red());
            std::process::exit(1);
        }
    }
}
