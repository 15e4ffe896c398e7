//! Subprocess runner for the automation job.
//!
//! Spawns the configured command (by default `python -m automation.main`)
//! and reads its run report from the last JSON line on stdout.

use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::domain::RunReport;

use super::PipelineRunner;

/// Runs the pipeline as a child process
pub struct CommandRunner {
    /// Program followed by its arguments
    command: Vec<String>,

    /// Working directory for the child (inherits ours if unset)
    working_dir: Option<PathBuf>,
}

impl CommandRunner {
    /// Create a runner for `command` (program first, then arguments)
    pub fn new(command: Vec<String>) -> Self {
        Self {
            command,
            working_dir: None,
        }
    }

    /// Run the child inside `dir`
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// The command line this runner spawns
    pub fn command(&self) -> &[String] {
        &self.command
    }

    async fn execute(&self) -> Result<String> {
        let (program, args) = self
            .command
            .split_first()
            .context("Pipeline command is empty")?;

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(ref dir) = self.working_dir {
            command.current_dir(dir);
        }

        debug!(program = %program, "Spawning pipeline process");

        // No timeout: a run is never cut short from this side.
        let output = command
            .output()
            .await
            .with_context(|| format!("Failed to spawn pipeline process '{}'", program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            if stderr.is_empty() {
                anyhow::bail!(
                    "Pipeline process exited with code {}",
                    output.status.code().unwrap_or(-1)
                );
            }
            anyhow::bail!("{}", last_line(stderr));
        }

        String::from_utf8(output.stdout).context("Pipeline output is not valid UTF-8")
    }
}

#[async_trait]
impl PipelineRunner for CommandRunner {
    fn name(&self) -> &str {
        "command"
    }

    async fn run(&self) -> Result<RunReport> {
        let stdout = self.execute().await?;
        Ok(parse_report(&stdout))
    }
}

/// Take the report from the last stdout line that parses as one
fn parse_report(stdout: &str) -> RunReport {
    stdout
        .lines()
        .rev()
        .map(str::trim)
        .filter(|line| line.starts_with('{'))
        .find_map(|line| serde_json::from_str(line).ok())
        .unwrap_or_default()
}

/// Python tracebacks end with the actual error; keep that line
fn last_line(text: &str) -> &str {
    text.lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or(text)
}
