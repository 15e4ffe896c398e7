//! Configuration for shorts-factory.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (SHORTS_HOME, SHORTS_MAX_HISTORY, SHORTS_ADDRESS)
//! 2. Config file (.shorts/config.yaml)
//! 3. Defaults (~/.shorts-factory)
//!
//! Config file discovery:
//! - Searches current directory and parents for .shorts/config.yaml
//! - Paths in config file are relative to the project root (the parent of .shorts/)

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::schedule::DailySchedule;
use crate::core::DEFAULT_MAX_HISTORY;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

const DEFAULT_ADDRESS: &str = "127.0.0.1:3000";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub pipeline: Option<PipelineConfig>,
    #[serde(default)]
    pub history: Option<HistoryConfig>,
    #[serde(default)]
    pub schedule: Option<ScheduleConfig>,
    #[serde(default)]
    pub server: Option<ServerConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory for the status document and journal
    pub home: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Program and arguments of the automation job
    pub command: Option<Vec<String>>,
    /// Working directory for the job
    pub working_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    pub max_runs: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// "HH:MM" in UTC
    pub daily_at: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub address: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Overrides taken from the environment
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub home: Option<String>,
    pub max_history: Option<String>,
    pub address: Option<String>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            home: std::env::var("SHORTS_HOME").ok(),
            max_history: std::env::var("SHORTS_MAX_HISTORY").ok(),
            address: std::env::var("SHORTS_ADDRESS").ok(),
        }
    }
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// State directory (status document, journal)
    pub home: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    /// Pipeline command line
    pub pipeline_command: Vec<String>,
    /// Working directory for the pipeline command
    pub pipeline_working_dir: Option<PathBuf>,
    /// Number of runs kept in the status history
    pub max_history: usize,
    /// Schedule hint (None when disabled)
    pub schedule: Option<DailySchedule>,
    /// HTTP bind address
    pub address: String,
}

fn default_pipeline_command() -> Vec<String> {
    vec![
        "python".to_string(),
        "-m".to_string(),
        "automation.main".to_string(),
    ]
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".shorts").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's parent
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Combine a parsed config file, environment overrides and defaults
fn resolve(
    file: Option<(PathBuf, ConfigFile)>,
    env: EnvOverrides,
    default_home: PathBuf,
) -> Result<ResolvedConfig> {
    let (config_file, config) = match file {
        Some((path, config)) => (Some(path), Some(config)),
        None => (None, None),
    };

    // Base directory is the parent of .shorts/ (i.e., grandparent of config.yaml)
    let base_dir = config_file
        .as_deref()
        .and_then(Path::parent)
        .and_then(Path::parent)
        .unwrap_or(Path::new("."))
        .to_path_buf();

    let home = if let Some(env_home) = env.home {
        PathBuf::from(env_home)
    } else if let Some(home) = config.as_ref().and_then(|c| c.paths.home.as_deref()) {
        resolve_path(&base_dir, home)
    } else {
        default_home
    };

    let pipeline = config.as_ref().and_then(|c| c.pipeline.as_ref());
    let pipeline_command = pipeline
        .and_then(|p| p.command.clone())
        .unwrap_or_else(default_pipeline_command);
    if pipeline_command.is_empty() {
        anyhow::bail!("pipeline.command must not be empty");
    }
    let pipeline_working_dir = pipeline
        .and_then(|p| p.working_dir.as_deref())
        .map(|dir| resolve_path(&base_dir, dir));

    let max_history = match env.max_history {
        Some(value) => value
            .parse::<usize>()
            .with_context(|| format!("Invalid SHORTS_MAX_HISTORY: {}", value))?,
        None => config
            .as_ref()
            .and_then(|c| c.history.as_ref())
            .and_then(|h| h.max_runs)
            .unwrap_or(DEFAULT_MAX_HISTORY),
    };
    if max_history == 0 {
        anyhow::bail!("history.max_runs must be at least 1");
    }

    let schedule = match config.as_ref().and_then(|c| c.schedule.as_ref()) {
        Some(s) if !s.enabled => None,
        Some(s) => match s.daily_at.as_deref() {
            Some(at) => Some(at.parse::<DailySchedule>()?),
            None => Some(DailySchedule::default()),
        },
        None => Some(DailySchedule::default()),
    };

    let address = env
        .address
        .or_else(|| {
            config
                .as_ref()
                .and_then(|c| c.server.as_ref())
                .and_then(|s| s.address.clone())
        })
        .unwrap_or_else(|| DEFAULT_ADDRESS.to_string());

    Ok(ResolvedConfig {
        home,
        config_file,
        pipeline_command,
        pipeline_working_dir,
        max_history,
        schedule,
        address,
    })
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".shorts-factory");

    let file = match find_config_file() {
        Some(path) => {
            let config = load_config_file(&path)?;
            Some((path, config))
        }
        None => None,
    };

    resolve(file, EnvOverrides::from_env(), default_home)
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| format!("{:#}", e)));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

// ============================================================================
// Convenience functions
// ============================================================================

/// Get the state directory (status document and journal)
pub fn state_dir() -> Result<PathBuf> {
    Ok(config()?.home.clone())
}
