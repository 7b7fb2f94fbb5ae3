use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the dossier binary.
#[derive(Debug, Parser)]
#[command(name = "dossier", version, about = "Classified dossier portfolio and blog server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "DOSSIER_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP server.
    Serve(Box<ServeArgs>),
    /// Generate blog manifests from a content checkout.
    Manifest(ManifestArgs),
    /// Inspect or clear the on-disk content cache.
    Cache(CacheArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct LoggingOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct CacheOverrides {
    /// Override the cache backend (memory|directory).
    #[arg(long = "cache-backend", value_name = "BACKEND")]
    pub cache_backend: Option<String>,

    /// Override the cache directory used by the directory backend.
    #[arg(long = "cache-directory", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub cache_directory: Option<PathBuf>,

    /// Override the cache entry lifetime.
    #[arg(long = "cache-ttl-seconds", value_name = "SECONDS")]
    pub cache_ttl_seconds: Option<u64>,

    /// Disable or enable the content cache.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enabled: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    #[command(flatten)]
    pub cache: CacheOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the content branch base URL.
    #[arg(long = "content-base-url", value_name = "URL")]
    pub content_base_url: Option<String>,

    /// Override the content request timeout.
    #[arg(long = "content-timeout-seconds", value_name = "SECONDS")]
    pub content_timeout_seconds: Option<u64>,

    /// Serve a resume from this TOML file instead of the bundled one.
    #[arg(long = "resume-path", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub resume_path: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct ManifestArgs {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    /// Content checkout holding `posts/`; manifests are written to `manifests/`.
    #[arg(value_name = "ROOT", default_value = ".", value_hint = ValueHint::DirPath)]
    pub root: PathBuf,

    /// Posts per page manifest.
    #[arg(long = "posts-per-page", value_name = "COUNT")]
    pub posts_per_page: Option<usize>,
}

#[derive(Debug, Args, Clone)]
pub struct CacheArgs {
    #[command(flatten)]
    pub overrides: CacheOverrides,

    #[command(subcommand)]
    pub command: CacheCommand,
}

#[derive(Debug, Subcommand, Clone)]
pub enum CacheCommand {
    /// Remove every blog entry from the cache.
    Clear,
    /// Print entry counts and sizes.
    Stats,
}
