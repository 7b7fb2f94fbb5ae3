//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

pub use cli::{
    CacheArgs, CacheCommand, CacheOverrides, CliArgs, Command, LoggingOverrides, ManifestArgs,
    ServeArgs, ServeOverrides,
};

use crate::cache::CacheBackendKind;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "dossier";
const ENV_PREFIX: &str = "DOSSIER";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
pub const DEFAULT_CONTENT_BASE_URL: &str =
    "https://raw.githubusercontent.com/cagesthrottleus/cagesthrottleus.github.io/blog";
const DEFAULT_CONTENT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_CACHE_TTL_SECS: u64 = 5 * 60;
const DEFAULT_CACHE_MEMORY_LIMIT: usize = 512;
const DEFAULT_CACHE_DIRECTORY: &str = ".dossier-cache";

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub content: ContentSettings,
    pub cache: CacheSettings,
    pub resume: ResumeSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct ContentSettings {
    /// Root of the content branch; manifests and posts are resolved against it.
    pub base_url: Url,
    pub request_timeout: Duration,
}

impl Default for ContentSettings {
    fn default() -> Self {
        Self {
            base_url: default_content_url(),
            request_timeout: Duration::from_secs(DEFAULT_CONTENT_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub backend: CacheBackendKind,
    pub ttl: Duration,
    pub memory_limit: usize,
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct ResumeSettings {
    /// `None` serves the bundled resume.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Manifest(args)) => raw.apply_logging_overrides(&args.logging),
        Some(Command::Cache(args)) => raw.apply_cache_overrides(&args.overrides),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    content: RawContentSettings,
    cache: RawCacheSettings,
    resume: RawResumeSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(url) = overrides.content_base_url.as_ref() {
            self.content.base_url = Some(url.clone());
        }
        if let Some(seconds) = overrides.content_timeout_seconds {
            self.content.request_timeout_seconds = Some(seconds);
        }
        if let Some(path) = overrides.resume_path.as_ref() {
            self.resume.path = Some(path.clone());
        }

        self.apply_logging_overrides(&overrides.logging);
        self.apply_cache_overrides(&overrides.cache);
    }

    fn apply_logging_overrides(&mut self, overrides: &LoggingOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }

    fn apply_cache_overrides(&mut self, overrides: &CacheOverrides) {
        if let Some(backend) = overrides.cache_backend.as_ref() {
            self.cache.backend = Some(backend.clone());
        }
        if let Some(directory) = overrides.cache_directory.as_ref() {
            self.cache.directory = Some(directory.clone());
        }
        if let Some(ttl) = overrides.cache_ttl_seconds {
            self.cache.ttl_seconds = Some(ttl);
        }
        if let Some(enabled) = overrides.cache_enabled {
            self.cache.enabled = Some(enabled);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            content,
            cache,
            resume,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let content = build_content_settings(content)?;
        let cache = build_cache_settings(cache)?;
        let resume = build_resume_settings(resume);

        Ok(Self {
            server,
            logging,
            content,
            cache,
            resume,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_content_settings(content: RawContentSettings) -> Result<ContentSettings, LoadError> {
    let base_url = match content.base_url {
        Some(raw) => {
            let url = Url::parse(raw.trim())
                .map_err(|err| LoadError::invalid("content.base_url", err.to_string()))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(LoadError::invalid(
                    "content.base_url",
                    format!("unsupported scheme `{}`", url.scheme()),
                ));
            }
            url
        }
        None => default_content_url(),
    };

    let timeout_secs = content
        .request_timeout_seconds
        .unwrap_or(DEFAULT_CONTENT_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "content.request_timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ContentSettings {
        base_url,
        request_timeout: Duration::from_secs(timeout_secs),
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let backend = match cache.backend.as_deref().map(str::trim) {
        None | Some("memory") => CacheBackendKind::Memory,
        Some("directory") => CacheBackendKind::Directory,
        Some(other) => {
            return Err(LoadError::invalid(
                "cache.backend",
                format!("expected `memory` or `directory`, got `{other}`"),
            ));
        }
    };

    let memory_limit = cache.memory_limit.unwrap_or(DEFAULT_CACHE_MEMORY_LIMIT);
    if memory_limit == 0 {
        return Err(LoadError::invalid(
            "cache.memory_limit",
            "must be greater than zero",
        ));
    }

    let directory = cache
        .directory
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIRECTORY));
    if directory.as_os_str().is_empty() {
        return Err(LoadError::invalid("cache.directory", "must not be empty"));
    }

    Ok(CacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        backend,
        ttl: Duration::from_secs(cache.ttl_seconds.unwrap_or(DEFAULT_CACHE_TTL_SECS)),
        memory_limit,
        directory,
    })
}

fn build_resume_settings(resume: RawResumeSettings) -> ResumeSettings {
    ResumeSettings {
        path: resume.path.filter(|path| !path.as_os_str().is_empty()),
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawContentSettings {
    base_url: Option<String>,
    request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    backend: Option<String>,
    ttl_seconds: Option<u64>,
    memory_limit: Option<usize>,
    directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawResumeSettings {
    path: Option<PathBuf>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn default_content_url() -> Url {
    Url::parse(DEFAULT_CONTENT_BASE_URL).expect("default content URL must parse")
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
