//! # Runtime Configuration Module
//!
//! Process-wide settings resolved once at startup and passed down
//! explicitly. Nothing below [`crate::assets::provider_for`] reads the
//! environment again.
//!
//! ## Layering
//!
//! Lowest to highest precedence:
//!
//! 1. Built-in defaults ([`RuntimeConfig::default`])
//! 2. Optional TOML file ([`FileConfig`])
//! 3. Environment variables
//! 4. Command-line flags (applied by the binary)
//!
//! ## Environment Variables
//!
//! | Variable             | Meaning                                          |
//! |----------------------|--------------------------------------------------|
//! | `PAGEWRIGHT_ENV`     | `development` selects live assets; anything else is production |
//! | `PAGEWRIGHT_HOST`    | Listen host (default `127.0.0.1`)                |
//! | `PAGEWRIGHT_PORT`    | Listen port (default `8080`)                     |
//! | `PAGEWRIGHT_STACK_SIZE` | Coroutine stack size, decimal or `0x` hex (default `0x4000`) |
//!
//! ## Example
//!
//! ```toml
//! dist_folder = "./dist"
//! public_path = "/"
//! port = 8080
//!
//! [live]
//! stats_file = "./build/stats.json"
//! output_dir = "./build"
//! inline_styles = false
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_MODE: &str = "PAGEWRIGHT_ENV";
pub const ENV_HOST: &str = "PAGEWRIGHT_HOST";
pub const ENV_PORT: &str = "PAGEWRIGHT_PORT";
pub const ENV_STACK_SIZE: &str = "PAGEWRIGHT_STACK_SIZE";

const DEFAULT_STACK_SIZE: usize = 0x4000;

fn parse_stack_size(val: &str) -> Option<usize> {
    match val.strip_prefix("0x") {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => val.parse().ok(),
    }
}

/// Which asset provider the process runs with. Fixed for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Development,
    Production,
}

impl Mode {
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("development") => Mode::Development,
            _ => Mode::Production,
        }
    }

    pub fn from_env() -> Self {
        Self::parse(env::var(ENV_MODE).ok().as_deref())
    }

    pub fn is_development(self) -> bool {
        self == Mode::Development
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Development => f.write_str("development"),
            Mode::Production => f.write_str("production"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub mode: Mode,
    pub host: String,
    pub port: u16,
    /// Production build output root, containing `assets.json`.
    pub dist_folder: PathBuf,
    /// URL prefix the bundle is served under.
    pub public_path: String,
    /// Compilation stats written by the bundler in watch mode.
    pub stats_file: PathBuf,
    /// Directory the watching bundler emits into.
    pub live_output_dir: PathBuf,
    pub inline_styles: bool,
    /// Optional minijinja views (`<name>.html`) for page shells.
    pub views_dir: Option<PathBuf>,
    /// Stack size for request coroutines in bytes.
    pub stack_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Production,
            host: "127.0.0.1".to_string(),
            port: 8080,
            dist_folder: PathBuf::from("dist"),
            public_path: "/".to_string(),
            stats_file: PathBuf::from("build/stats.json"),
            live_output_dir: PathBuf::from("build"),
            inline_styles: false,
            views_dir: None,
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

/// On-disk configuration; every field optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub mode: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub dist_folder: Option<PathBuf>,
    pub public_path: Option<String>,
    pub views_dir: Option<PathBuf>,
    #[serde(default)]
    pub live: LiveFileConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LiveFileConfig {
    pub stats_file: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub inline_styles: Option<bool>,
}

impl FileConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&source)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }
}

impl RuntimeConfig {
    /// Defaults overlaid with the environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Defaults, then `file`, then the environment.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let Some(path) = file else {
            return Ok(Self::from_env());
        };
        let mut config = Self::default();
        config.apply_file(FileConfig::from_path(path)?);
        config.apply_env();
        Ok(config)
    }

    pub fn apply_file(&mut self, file: FileConfig) {
        if let Some(mode) = file.mode {
            self.mode = Mode::parse(Some(&mode));
        }
        if let Some(host) = file.host {
            self.host = host;
        }
        if let Some(port) = file.port {
            self.port = port;
        }
        if let Some(dist) = file.dist_folder {
            self.dist_folder = dist;
        }
        if let Some(public_path) = file.public_path {
            self.public_path = public_path;
        }
        if file.views_dir.is_some() {
            self.views_dir = file.views_dir;
        }
        if let Some(stats) = file.live.stats_file {
            self.stats_file = stats;
        }
        if let Some(out) = file.live.output_dir {
            self.live_output_dir = out;
        }
        if let Some(inline) = file.live.inline_styles {
            self.inline_styles = inline;
        }
    }

    fn apply_env(&mut self) {
        if env::var_os(ENV_MODE).is_some() {
            self.mode = Mode::from_env();
        }
        if let Ok(host) = env::var(ENV_HOST) {
            self.host = host;
        }
        if let Some(port) = env::var(ENV_PORT).ok().and_then(|p| p.parse().ok()) {
            self.port = port;
        }
        if let Some(size) = env::var(ENV_STACK_SIZE).ok().and_then(|v| parse_stack_size(&v)) {
            self.stack_size = size;
        }
    }
}

/// Where the service learns its own listen address.
///
/// Stands in for the cluster configuration service; implementations may
/// perform network calls.
pub trait ConfigSource: Send + Sync {
    fn provider_id(&self) -> String;
    fn server_port(&self) -> Result<u16>;
    fn server_host(&self) -> Result<String>;
}

/// [`ConfigSource`] answering from a resolved [`RuntimeConfig`].
#[derive(Debug, Clone)]
pub struct StaticConfigSource {
    host: String,
    port: u16,
}

impl StaticConfigSource {
    pub fn new(config: &RuntimeConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
        }
    }
}

impl ConfigSource for StaticConfigSource {
    fn provider_id(&self) -> String {
        format!("static://{}:{}", self.host, self.port)
    }

    fn server_port(&self) -> Result<u16> {
        Ok(self.port)
    }

    fn server_host(&self) -> Result<String> {
        Ok(self.host.clone())
    }
}

/// Ask `source` for host and port, wrapping connection failures with the
/// provider identity.
pub fn resolve_listen_address(source: &dyn ConfigSource) -> Result<(String, u16)> {
    let resolved = source
        .server_port()
        .and_then(|port| source.server_host().map(|host| (host, port)));
    resolved.map_err(|err| {
        let msg = err.to_string();
        if msg.contains("ECONN") || msg.to_lowercase().contains("connection refused") {
            anyhow::anyhow!(
                "Failed while connecting to cluster server at {}: {msg}",
                source.provider_id()
            )
        } else {
            err
        }
    })
}
