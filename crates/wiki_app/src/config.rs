//! Command-line flags and the optional RON configuration file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use wiki_core::HISTORY_DISPLAY_LIMIT;
use wiki_engine::GeneratorSettings;
use wiki_logging::LogDestination;

const APP_DIR: &str = "infinite_wiki";
const CONFIG_FILENAME: &str = "config.ron";
const LOG_FILENAME: &str = "infinite_wiki.log";
const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

#[derive(Debug, Parser)]
#[command(
    name = "infinite-wiki",
    version,
    about = "An encyclopedia that writes itself as you read"
)]
pub struct Cli {
    /// Topic to open on startup.
    pub topic: Option<String>,
    /// Configuration file (RON).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Model used for article generation.
    #[arg(long, value_name = "NAME")]
    pub model: Option<String>,
    /// Directory holding history and the log file.
    #[arg(long, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,
    /// Where log lines go: file, terminal or both.
    #[arg(long, value_name = "DEST")]
    pub log: Option<LogDestination>,
    /// Log level (error, warn, info, debug, trace).
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub model: String,
    pub base_url: String,
    pub data_dir: PathBuf,
    /// `file`, `terminal` or `both`.
    pub log_destination: String,
    pub log_level: String,
    pub history_display_limit: usize,
    pub connect_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        let generator = GeneratorSettings::default();
        Self {
            model: generator.model,
            base_url: generator.base_url,
            data_dir: default_data_dir(),
            log_destination: "file".to_string(),
            log_level: "info".to_string(),
            history_display_limit: HISTORY_DISPLAY_LIMIT,
            connect_timeout_secs: generator.connect_timeout.as_secs(),
        }
    }
}

impl AppConfig {
    /// Reads the file named by `--config`, else the default config file when
    /// it exists, then applies command-line overrides.
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.is_file() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_overrides(cli);
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_ron(&text).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_ron(text: &str) -> anyhow::Result<Self> {
        Ok(ron::from_str(text)?)
    }

    fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(model) = &cli.model {
            self.model = model.clone();
        }
        if let Some(dir) = &cli.data_dir {
            self.data_dir = dir.clone();
        }
        if let Some(destination) = cli.log {
            self.log_destination = match destination {
                LogDestination::File => "file",
                LogDestination::Terminal => "terminal",
                LogDestination::Both => "both",
            }
            .to_string();
        }
        if let Some(level) = &cli.log_level {
            self.log_level = level.clone();
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.model.trim().is_empty() {
            bail!("model name must not be empty");
        }
        if !(1..=HISTORY_DISPLAY_LIMIT).contains(&self.history_display_limit) {
            bail!(
                "history_display_limit must be between 1 and {HISTORY_DISPLAY_LIMIT}, got {}",
                self.history_display_limit
            );
        }
        self.log_destination()?;
        Ok(())
    }

    pub fn log_destination(&self) -> anyhow::Result<LogDestination> {
        self.log_destination
            .parse()
            .map_err(anyhow::Error::msg)
    }

    pub fn log_level(&self) -> LevelFilter {
        wiki_logging::parse_level(&self.log_level)
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join(LOG_FILENAME)
    }

    pub fn generator_settings(&self, api_key: String) -> GeneratorSettings {
        GeneratorSettings {
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            api_key,
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            ..GeneratorSettings::default()
        }
    }
}

/// The API key from the environment; a missing key is a startup error.
pub fn api_key_from_env() -> anyhow::Result<String> {
    match api_key_from(|name| std::env::var(name).ok()) {
        Some(key) => Ok(key),
        None => bail!("no API key found; set GEMINI_API_KEY or API_KEY"),
    }
}

fn api_key_from(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    API_KEY_VARS
        .iter()
        .filter_map(|name| lookup(name))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILENAME))
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}
