use std::{process, sync::Arc};

use dossier::{
    application::{
        chrome::ChromeService,
        content::BlogService,
        error::AppError,
        listing::ListingService,
        manifest::{ManifestError, ManifestGenerator, ManifestOutcome, SkipReason},
        posts::PostService,
        render::render_service,
        resume::ResumeService,
    },
    cache::{CacheConfig, ContentCache, DirectoryBackend},
    config,
    infra::{
        content::HttpContentSource,
        error::InfraError,
        http::{self, HttpState},
        telemetry,
    },
};
use tokio::sync::oneshot;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| InfraError::configuration(format!("failed to load settings: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Manifest(args) => run_manifest(args),
        config::Command::Cache(args) => run_cache(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let state = build_http_state(&settings)?;
    serve_http(&settings, state).await
}

fn build_http_state(settings: &config::Settings) -> Result<HttpState, AppError> {
    let source = Arc::new(HttpContentSource::new(&settings.content)?);
    let cache = ContentCache::from_config(&CacheConfig::from(&settings.cache));
    let blog = BlogService::new(source, cache);

    let resume = ResumeService::load(settings.resume.path.as_deref())?;

    info!(
        target: "dossier::serve",
        content = %settings.content.base_url,
        cache_enabled = settings.cache.enabled,
        cache_backend = ?settings.cache.backend,
        "Services initialised"
    );

    Ok(HttpState {
        chrome: Arc::new(ChromeService::default()),
        resume: Arc::new(resume),
        listing: Arc::new(ListingService::new(blog.clone())),
        posts: Arc::new(PostService::new(blog.clone(), render_service())),
        blog,
    })
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);
    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target: "dossier::serve",
        addr = %settings.server.addr,
        "Listening"
    );

    let (draining_tx, draining_rx) = oneshot::channel::<()>();
    let server = axum::serve(listener, router.into_make_service()).with_graceful_shutdown(
        async move {
            shutdown_signal().await;
            let _ = draining_tx.send(());
        },
    );
    let mut server = tokio::spawn(async move { server.await });

    let grace = settings.server.graceful_shutdown;
    let deadline = async move {
        if draining_rx.await.is_ok() {
            tokio::time::sleep(grace).await;
        } else {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        joined = &mut server => {
            joined
                .map_err(|err| AppError::unexpected(format!("server task failed: {err}")))?
                .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        () = deadline => {
            warn!(
                target: "dossier::serve",
                grace_seconds = grace.as_secs(),
                "Graceful shutdown timed out; dropping open connections"
            );
            server.abort();
        }
    }

    info!(target: "dossier::serve", "Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    info!(target: "dossier::serve", "Shutdown signal received");
}

fn run_manifest(args: config::ManifestArgs) -> Result<(), AppError> {
    let mut generator = ManifestGenerator::new(&args.root);
    if let Some(posts_per_page) = args.posts_per_page {
        generator = generator.with_posts_per_page(posts_per_page);
    }

    info!(
        target: "dossier::manifest",
        root = %args.root.display(),
        "Generating manifests"
    );

    let outcome = generator.generate().map_err(|err| match &err {
        ManifestError::MissingPostsDir { .. } => AppError::validation(err.to_string()),
        _ => AppError::unexpected(err.to_string()),
    })?;

    print_manifest_outcome(&outcome);
    Ok(())
}

fn print_manifest_outcome(outcome: &ManifestOutcome) {
    for skipped in &outcome.skipped {
        let reason = match &skipped.reason {
            SkipReason::MissingTitle => "missing title".to_string(),
            SkipReason::Unreadable(message) | SkipReason::InvalidSlug(message) => message.clone(),
        };
        println!("skipped {}: {reason}", skipped.path.display());
    }

    if !outcome.wrote_index {
        println!("no valid posts found; manifests left untouched");
        return;
    }

    println!(
        "generated manifests for {} posts across {} pages ({} files scanned)",
        outcome.total_posts, outcome.total_pages, outcome.scanned
    );
}

async fn run_cache(settings: config::Settings, args: config::CacheArgs) -> Result<(), AppError> {
    let cache_config = CacheConfig::from(&settings.cache);
    let backend = Arc::new(DirectoryBackend::new(settings.cache.directory.clone()));
    let cache = ContentCache::new(backend, &cache_config);

    match args.command {
        config::CacheCommand::Clear => {
            let removed = cache
                .clear()
                .await
                .map_err(|err| AppError::unexpected(format!("failed to clear cache: {err}")))?;
            println!(
                "removed {removed} entries from {}",
                settings.cache.directory.display()
            );
        }
        config::CacheCommand::Stats => {
            let stats = cache
                .stats()
                .await
                .map_err(|err| AppError::unexpected(format!("failed to read cache: {err}")))?;
            println!(
                "{} entries, {} bytes in {}",
                stats.total_entries,
                stats.total_size,
                settings.cache.directory.display()
            );
            for key in &stats.entries {
                println!("  {key}");
            }
        }
    }

    Ok(())
}
