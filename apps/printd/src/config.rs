use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::thermal::DEFAULT_LINE_WIDTH;

const DEFAULT_PORT: u16 = 3003;
const DEFAULT_CONFIG_FILE: &str = "config.json";

/// How `/print` content reaches the surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Markup is normalized and formatted into fixed-width thermal text.
    #[default]
    Text,
    /// Markup is handed to the engine inside the page template.
    Rich,
}

impl FromStr for RenderMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(RenderMode::Text),
            "rich" => Ok(RenderMode::Rich),
            other => bail!("RENDER_MODE must be 'text' or 'rich', got '{other}'"),
        }
    }
}

/// Application configuration.
/// Layered lowest first: built-in defaults, the optional JSON config file,
/// then environment variables (including `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    /// Default printer; `None` uses the OS default.
    pub printer: Option<String>,
    pub port: u16,
    pub bind_addr: IpAddr,
    pub line_width: usize,
    pub render_mode: RenderMode,
    /// Maximum pending print jobs; `None` is unbounded.
    pub queue_capacity: Option<usize>,
    pub print_timeout: Option<Duration>,
    pub spool_dir: PathBuf,
    pub rust_log: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            printer: None,
            port: DEFAULT_PORT,
            bind_addr: IpAddr::from([127, 0, 0, 1]),
            line_width: DEFAULT_LINE_WIDTH,
            render_mode: RenderMode::Text,
            queue_capacity: None,
            print_timeout: None,
            spool_dir: std::env::temp_dir().join("printd"),
            rust_log: "info".to_string(),
        }
    }
}

/// Settings persisted in the JSON config file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileConfig {
    pub printer: Option<String>,
    pub port: Option<u16>,
    pub line_width: Option<usize>,
    pub render_mode: Option<RenderMode>,
    pub queue_capacity: Option<usize>,
    pub print_timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Reads `path` if it exists. A missing file is an empty layer.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(FileConfig::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Config file '{}' is not valid JSON", path.display()))
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let file = FileConfig::load(Path::new(&path))?;

        Self::from_sources(file, |key| std::env::var(key).ok())
    }

    /// Builds the config from a file layer and an environment lookup.
    pub fn from_sources(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Config::default();
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let printer = env("PRINTER")
            .or(file.printer)
            .filter(|p| !p.trim().is_empty());

        let port = match env("PORT") {
            Some(v) => v
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            None => file.port.unwrap_or(defaults.port),
        };

        let bind_addr = match env("BIND_ADDR") {
            Some(v) => v
                .parse::<IpAddr>()
                .context("BIND_ADDR must be an IP address")?,
            None => defaults.bind_addr,
        };

        let line_width = match env("LINE_WIDTH") {
            Some(v) => v
                .parse::<usize>()
                .context("LINE_WIDTH must be a positive integer")?,
            None => file.line_width.unwrap_or(defaults.line_width),
        };
        if line_width == 0 {
            bail!("LINE_WIDTH must be at least 1");
        }

        let render_mode = match env("RENDER_MODE") {
            Some(v) => v.parse()?,
            None => file.render_mode.unwrap_or(defaults.render_mode),
        };

        let queue_capacity = match env("QUEUE_CAPACITY") {
            Some(v) => Some(
                v.parse::<usize>()
                    .context("QUEUE_CAPACITY must be a non-negative integer")?,
            ),
            None => file.queue_capacity,
        }
        .filter(|&n| n > 0);

        let print_timeout_secs = match env("PRINT_TIMEOUT_SECS") {
            Some(v) => Some(
                v.parse::<u64>()
                    .context("PRINT_TIMEOUT_SECS must be a non-negative integer")?,
            ),
            None => file.print_timeout_secs,
        };
        let print_timeout = print_timeout_secs
            .filter(|&s| s > 0)
            .map(Duration::from_secs);

        Ok(Config {
            printer,
            port,
            bind_addr,
            line_width,
            render_mode,
            queue_capacity,
            print_timeout,
            spool_dir: env("SPOOL_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.spool_dir),
            rust_log: env("RUST_LOG").unwrap_or(defaults.rust_log),
        })
    }
}
