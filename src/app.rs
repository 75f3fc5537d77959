use crate::config::Config;
use crate::data::{MemoryQuestionStore, PgArtifactStore, PgQuestionStore, QuestionStore};
use crate::providers::{GeminiClient, YouTubeClient};
use crate::solutions::{ArtifactStore, MemoryArtifactStore, ResolutionService};
use crate::state::{AppState, ServiceStatus};
use crate::utils::fmt_duration;
use anyhow::Context;
use sqlx::ConnectOptions;
use sqlx::postgres::PgPoolOptions;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Extra slack on top of provider timeouts before the HTTP layer gives up.
const REQUEST_TIMEOUT_SLACK: Duration = Duration::from_secs(10);

/// Main application struct containing all necessary components
pub struct App {
    config: Config,
    app_state: AppState,
}

impl App {
    /// Build stores, providers, and the resolution service from config.
    pub async fn new(config: Config) -> Result<Self, anyhow::Error> {
        let (db_pool, artifacts, questions) = match config.database_url.as_deref() {
            Some(url) => {
                let pool = Self::connect_database(url).await?;
                let artifacts: Arc<dyn ArtifactStore> =
                    Arc::new(PgArtifactStore::new(pool.clone()));
                let questions: Arc<dyn QuestionStore> =
                    Arc::new(PgQuestionStore::new(pool.clone()));
                (Some(pool), artifacts, questions)
            }
            None => {
                warn!("DATABASE_URL not set, using in-memory stores");
                let questions = MemoryQuestionStore::new();
                if let Some(path) = &config.questions_seed_path {
                    let count = questions.load_seed_file(path)?;
                    info!(count, path = %path.display(), "loaded seed questions");
                }
                let artifacts: Arc<dyn ArtifactStore> = Arc::new(MemoryArtifactStore::new());
                let questions: Arc<dyn QuestionStore> = Arc::new(questions);
                (None, artifacts, questions)
            }
        };

        let gemini = GeminiClient::new(
            &config.gemini_base_url,
            config.gemini_api_key.clone(),
            config.gemini_model.clone(),
            config.provider_timeout,
        )
        .context("Failed to create Gemini client")?;
        let youtube = YouTubeClient::new(
            &config.youtube_base_url,
            config.youtube_api_key.clone(),
            config.provider_timeout,
        )
        .context("Failed to create YouTube client")?;

        let gemini_status = provider_status(gemini.is_configured());
        let youtube_status = provider_status(youtube.is_configured());
        if gemini_status == ServiceStatus::Disabled {
            warn!("GEMINI_API_KEY not set, AI solutions will be unavailable");
        }
        if youtube_status == ServiceStatus::Disabled {
            warn!("YOUTUBE_API_KEY not set, video suggestions will be unavailable");
        }

        let options = config.resolution_options();
        info!(
            model = %config.gemini_model,
            max_concurrent_calls = options.max_concurrent_calls,
            queue_timeout = fmt_duration(options.queue_timeout),
            provider_timeout = fmt_duration(config.provider_timeout),
            refresh_policy = ?options.refresh_policy,
            "resolution service configured"
        );
        let resolver = Arc::new(ResolutionService::new(
            artifacts,
            Arc::new(gemini),
            Arc::new(youtube),
            options,
        ));

        let app_state = AppState::new(resolver, questions, db_pool.clone());
        app_state.service_statuses.set("gemini", gemini_status);
        app_state.service_statuses.set("youtube", youtube_status);
        if db_pool.is_some() {
            app_state
                .service_statuses
                .set("database", ServiceStatus::Connected);
        }

        Ok(App { config, app_state })
    }

    async fn connect_database(url: &str) -> Result<sqlx::PgPool, anyhow::Error> {
        let connect_options = sqlx::postgres::PgConnectOptions::from_str(url)
            .context("Failed to parse database URL")?
            .log_statements(tracing::log::LevelFilter::Debug)
            .log_slow_statements(tracing::log::LevelFilter::Warn, Duration::from_secs(1));

        let db_pool = PgPoolOptions::new()
            .min_connections(0)
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(4))
            .idle_timeout(Duration::from_secs(60 * 2))
            .max_lifetime(Duration::from_secs(60 * 30))
            .connect_with(connect_options)
            .await
            .context("Failed to create database pool")?;

        info!(
            min_connections = 0,
            max_connections = 4,
            acquire_timeout = "4s",
            idle_timeout = "2m",
            max_lifetime = "30m",
            "database pool established"
        );

        info!("Running database migrations...");
        sqlx::migrate!("./migrations")
            .run(&db_pool)
            .await
            .context("Failed to run database migrations")?;
        info!("Database migrations completed successfully");

        Ok(db_pool)
    }

    /// Serve HTTP until a shutdown signal arrives, then drain within the
    /// configured timeout.
    pub async fn run(self) -> ExitCode {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.port));
        let listener = match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!(error = %e, %addr, "failed to bind web server");
                return ExitCode::FAILURE;
            }
        };
        info!(%addr, "web server listening");

        let request_timeout = self.config.provider_timeout
            + self.config.provider_queue_timeout
            + REQUEST_TIMEOUT_SLACK;
        let router = crate::web::create_router(self.app_state, request_timeout);

        let shutdown = CancellationToken::new();
        tokio::spawn(wait_for_signal(shutdown.clone()));

        let graceful = shutdown.clone();
        let server = axum::serve(listener, router)
            .with_graceful_shutdown(async move { graceful.cancelled().await });
        let mut server = std::pin::pin!(server.into_future());

        tokio::select! {
            result = &mut server => return exit_code(result),
            _ = shutdown.cancelled() => {}
        }

        let timeout = self.config.shutdown_timeout;
        info!(timeout = fmt_duration(timeout), "shutting down, draining requests");
        match tokio::time::timeout(timeout, server).await {
            Ok(result) => exit_code(result),
            Err(_) => {
                warn!(timeout = fmt_duration(timeout), "graceful shutdown timed out");
                ExitCode::FAILURE
            }
        }
    }
}

fn provider_status(configured: bool) -> ServiceStatus {
    if configured {
        ServiceStatus::Active
    } else {
        ServiceStatus::Disabled
    }
}

fn exit_code(result: std::io::Result<()>) -> ExitCode {
    match result {
        Ok(()) => {
            info!("web server stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "web server failed");
            ExitCode::FAILURE
        }
    }
}

/// Cancel `token` on Ctrl-C or SIGTERM.
async fn wait_for_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl-c"),
        _ = terminate => info!("received SIGTERM"),
    }
    token.cancel();
}
