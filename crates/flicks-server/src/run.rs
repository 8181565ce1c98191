use crate::config::ServerConfig;
use crate::error::Result;
use axum::extract::DefaultBodyLimit;
use axum::Router;
use flicks_app::extract::MAX_BODY_SIZE;
use flicks_app::rest_api;
use flicks_app::state::{AppConfig, AppState};
use futures::FutureExt;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::{debug, info};

pub async fn run(args: ServerConfig) -> Result<()> {
    let state = build_state(&args).await?;
    run_with_state(args, state).await
}

pub async fn run_with_state(args: ServerConfig, state: AppState) -> Result<()> {
    let shutdown = tokio::signal::ctrl_c().map(|_| ());
    run_graceful_with_state(args, state, shutdown).await
}

pub async fn run_graceful_with_state<S>(
    args: ServerConfig,
    state: AppState,
    shutdown_signal: S,
) -> Result<()>
where
    S: std::future::Future<Output = ()> + Send + 'static,
{
    let mut app = main_router(state);

    if args.cors {
        app = app.layer(tower_http::cors::CorsLayer::very_permissive());
    }

    let ip: std::net::IpAddr = args.listen_address.parse()?;
    let addr = std::net::SocketAddr::from((ip, args.port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        "Starting server on {}, env {}",
        listener.local_addr()?,
        args.env
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server stopped");
    Ok(())
}

pub fn main_router(state: AppState) -> Router<()> {
    Router::new()
        .nest("/v1/healthcheck", rest_api::health::router())
        .nest("/v1/movies", rest_api::movie::router())
        .fallback(rest_api::not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
        .with_state(state)
}

pub async fn build_state(config: &ServerConfig) -> Result<AppState> {
    let app_config: AppConfig = config.into();

    let data_dir = config.backend.data_dir();
    if !data_dir.is_dir() {
        tokio::fs::create_dir_all(&data_dir).await?;
        info!("Created data directory {}", data_dir.display());
    }

    let pool = flicks_dal::new_pool(&config.database_url(), &config.pool_config()).await?;
    info!("Database connection pool established");
    flicks_dal::migrate(&pool).await?;
    debug!("Database migrations applied");

    Ok(AppState::new(app_config, pool))
}
