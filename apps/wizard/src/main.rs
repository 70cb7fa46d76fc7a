use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wizard::config::Config;
use wizard::gateway::{AuthContext, HttpResumeGateway, InMemoryGateway, ResumePersistenceGateway};
use wizard::routes::build_router;
use wizard::state::AppState;
use wizard::wizard::spawn_idle_sweeper;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resume wizard v{}", env!("CARGO_PKG_VERSION"));

    let gateway = build_gateway(&config)?;
    info!("Submit validation: {:?}", config.submit_validation);

    let state = AppState::new(gateway, config.clone());
    let idle = Duration::from_secs(config.session_idle_secs);
    spawn_idle_sweeper(state.sessions.clone(), idle, (idle / 4).max(Duration::from_secs(1)));

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Remote résumé API when configured, otherwise a process-local store.
fn build_gateway(config: &Config) -> Result<Arc<dyn ResumePersistenceGateway>> {
    let Some(base_url) = &config.resume_api_base_url else {
        warn!("RESUME_API_BASE_URL not set; resumes are kept in memory only");
        return Ok(Arc::new(InMemoryGateway::new()));
    };

    let auth = AuthContext::new(config.resume_api_token.clone());
    if !auth.is_authenticated() {
        warn!("RESUME_API_TOKEN not set; resume API calls are unauthenticated");
    }
    let gateway = HttpResumeGateway::new(
        base_url.clone(),
        auth,
        Duration::from_secs(config.http_timeout_secs),
    )?;
    info!("Resume API gateway: {base_url}");
    Ok(Arc::new(gateway))
}
