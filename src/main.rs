use std::{future::IntoFuture, process, sync::Arc};

use blogroll::{
    application::{
        error::AppError,
        repos::{CreateGroupParams, GroupsRepo},
    },
    config,
    domain::{
        rules::require_text,
        slug::{derive_slug, validate_slug},
    },
    infra::{
        db::PostgresRepositories, error::InfraError, http, http::HttpState,
        memory::MemoryRepositories, telemetry,
    },
};
use tokio::{signal, sync::Notify};
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
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::CreateGroup(args) => run_create_group(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let state = match settings.database.url.as_deref() {
        Some(url) => {
            let repositories = connect_postgres(url, &settings).await?;
            HttpState::from_settings(repositories, &settings)?
        }
        None => {
            warn!(
                target = "blogroll::startup",
                "no database url configured; content is kept in memory and lost on exit"
            );
            HttpState::from_settings(Arc::new(MemoryRepositories::new()), &settings)?
        }
    };

    serve_http(&settings, state).await
}

async fn run_create_group(
    settings: config::Settings,
    args: config::CreateGroupArgs,
) -> Result<(), AppError> {
    let url = settings
        .database
        .url
        .as_deref()
        .ok_or_else(|| InfraError::configuration("create-group requires a database url"))?;

    let title = require_text("title", &args.title)?;
    let slug = match args.slug.as_deref() {
        Some(slug) => validate_slug(slug)?,
        None => derive_slug(&title)?,
    };

    let repositories = connect_postgres(url, &settings).await?;
    let group = repositories
        .create_group(CreateGroupParams {
            slug,
            title,
            description: args.description.trim().to_string(),
        })
        .await?;

    info!(
        target = "blogroll::create_group",
        group_id = group.id,
        slug = %group.slug,
        "group created"
    );
    println!("created group `{}` ({})", group.title, group.slug);
    Ok(())
}

async fn connect_postgres(
    url: &str,
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let pool = PostgresRepositories::connect(url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "blogroll::startup",
        addr = %settings.server.addr,
        "listening"
    );

    let shutdown = Arc::new(Notify::new());
    let signalled = shutdown.clone();
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            signalled.notify_one();
        })
        .into_future();

    let grace = settings.server.graceful_shutdown;
    let deadline = async move {
        shutdown.notified().await;
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::from(InfraError::server(err.to_string())))?;
        }
        () = deadline => {
            warn!(
                target = "blogroll::shutdown",
                grace_seconds = grace.as_secs(),
                "open connections did not finish in time; exiting"
            );
        }
    }

    info!(target = "blogroll::shutdown", "server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!(target = "blogroll::shutdown", "received SIGINT, shutting down");
        },
        () = terminate => {
            info!(target = "blogroll::shutdown", "received SIGTERM, shutting down");
        },
    }
}
