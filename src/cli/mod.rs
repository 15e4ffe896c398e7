//! Command-line interface for shorts-factory.
//!
//! Provides commands for serving the dashboard API, triggering runs,
//! inspecting status and history, and recovering a stuck run flag.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::adapters::CommandRunner;
use crate::config::{self, ResolvedConfig};
use crate::core::projection::run_line;
use crate::core::{
    FileStatusStore, PipelineError, PipelineGateway, RunJournal, RunRecorder, StatusProjection,
};

/// shorts-factory - Run orchestration for the shorts content pipeline
#[derive(Parser, Debug)]
#[command(name = "shorts-factory")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the pipeline API for the dashboard
    Serve {
        /// Address to bind to (defaults to config / SHORTS_ADDRESS)
        #[arg(short, long)]
        address: Option<String>,
    },

    /// Run the pipeline once
    Trigger,

    /// Show the current pipeline status
    Status {
        /// Print the raw status document as JSON
        #[arg(long)]
        json: bool,
    },

    /// List recent completed runs
    Runs {
        /// Maximum number of runs to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// List recent journal events (including failures and rejections)
    Journal {
        /// Maximum number of events to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Clear a running flag left behind by a crashed process
    Reset,

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Serve { address } => serve(address).await,
            Commands::Trigger => trigger().await,
            Commands::Status { json } => show_status(json).await,
            Commands::Runs { limit } => list_runs(limit).await,
            Commands::Journal { limit } => show_journal(limit).await,
            Commands::Reset => reset().await,
            Commands::Config => show_config(),
        }
    }
}

/// Wire the gateway from resolved configuration
pub fn build_gateway(cfg: &ResolvedConfig) -> PipelineGateway {
    let store = Arc::new(FileStatusStore::in_dir(&cfg.home));

    let mut runner = CommandRunner::new(cfg.pipeline_command.clone());
    if let Some(ref dir) = cfg.pipeline_working_dir {
        runner = runner.with_working_dir(dir);
    }

    let gateway = PipelineGateway::new(store, Arc::new(runner))
        .with_recorder(RunRecorder::new(cfg.max_history))
        .with_journal(RunJournal::in_dir(&cfg.home));

    match cfg.schedule {
        Some(schedule) => gateway.with_schedule(schedule),
        None => gateway,
    }
}

/// Start HTTP server
async fn serve(address: Option<String>) -> Result<()> {
    let cfg = config::config()?;
    let address = address.unwrap_or_else(|| cfg.address.clone());
    crate::server::serve(build_gateway(cfg), &address).await
}

/// Trigger a single run and print the outcome
async fn trigger() -> Result<()> {
    let gateway = build_gateway(config::config()?);

    match gateway.trigger().await {
        Ok(run) => {
            println!("{}", run.summary);
            eprintln!(
                "\n[Run {} completed: {} sources processed, {} shorts published]",
                run.id, run.sources_processed, run.shorts_published
            );
            Ok(())
        }
        Err(PipelineError::AlreadyRunning) => {
            eprintln!("\n[Pipeline is already running; trigger rejected]");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("\n[Run failed: {}]", err);
            std::process::exit(1);
        }
    }
}

/// Show the projected status
async fn show_status(json: bool) -> Result<()> {
    let cfg = config::config()?;
    let gateway = build_gateway(cfg);
    let status = gateway.status().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    let view = StatusProjection::from_status(&status, cfg.schedule);
    println!("State:             {}", if view.is_running { "running" } else { "idle" });
    println!("Sources processed: {}", view.sources_processed);
    println!("Shorts published:  {}", view.shorts_published);
    println!("Next schedule:     {}", view.next_schedule_text);
    println!();
    println!("Discovery:  {:<10} {}", view.discovery.to_string(), view.discovery_details);
    println!("Editing:    {:<10}", view.editing.to_string());
    println!("Publishing: {:<10} {}", view.publishing.to_string(), view.analytics_details);
    println!();
    println!("Runs in history: {}", view.recent_runs);

    Ok(())
}

/// List recent runs
async fn list_runs(limit: usize) -> Result<()> {
    let gateway = build_gateway(config::config()?);
    let status = gateway.status().await?;

    if status.recent_runs.is_empty() {
        println!("No runs found");
        return Ok(());
    }

    println!("{:<38} {}", "RUN ID", "COMPLETED / SOURCES / SHORTS / SUMMARY");
    println!("{}", "-".repeat(90));

    for run in status.recent_runs.iter().take(limit) {
        println!("{:<38} {}", run.id, run_line(run));
    }

    Ok(())
}

/// List recent journal events
async fn show_journal(limit: usize) -> Result<()> {
    let journal = RunJournal::open_default()?;
    let events = journal.tail(limit).await?;

    if events.is_empty() {
        println!("No journal events found");
        return Ok(());
    }

    println!("{:<26} {:<10} {}", "TIMESTAMP", "EVENT", "DETAILS");
    println!("{}", "-".repeat(90));

    for event in events {
        let details = match event.error {
            Some(ref error) => format!("{} ({})", event.summary, error),
            None => event.summary.clone(),
        };
        println!(
            "{:<26} {:<10} {}",
            event.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            event.event_type.to_string(),
            details
        );
    }

    Ok(())
}

/// Force-clear the running flag
async fn reset() -> Result<()> {
    let gateway = build_gateway(config::config()?);

    if gateway.reset().await? {
        eprintln!("Running flag cleared");
    } else {
        eprintln!("Pipeline is not marked as running; nothing to do");
    }

    Ok(())
}

/// Show resolved configuration
fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("shorts-factory configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("State directory: {}", cfg.home.display());
    println!("Status document: {}", FileStatusStore::in_dir(&cfg.home).path().display());
    println!("Run journal:     {}", RunJournal::in_dir(&cfg.home).path().display());
    println!();
    println!("Pipeline command: {}", cfg.pipeline_command.join(" "));
    if let Some(ref dir) = cfg.pipeline_working_dir {
        println!("Working dir:      {}", dir.display());
    }
    println!("History length:   {}", cfg.max_history);
    println!(
        "Schedule hint:    {}",
        cfg.schedule
            .map(|s| s.to_string())
            .unwrap_or_else(|| "disabled".to_string())
    );
    println!("Server address:   {}", cfg.address);

    Ok(())
}
