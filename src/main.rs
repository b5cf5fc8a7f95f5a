use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{router, AppState};
use deqm_core::{config::config_from_env_value, constants::SERVER_URL_ENV, HttpTransport};

/// Main entry point for the DEQM console back end
///
/// Resolves configuration once, then serves the console REST API (with Swagger UI at
/// `/swagger-ui`) against the configured FHIR server.
///
/// # Environment Variables
/// - `DEQM_SERVER_URL`: FHIR server base (default: "http://localhost:3000/4_0_1")
/// - `DEQM_REST_ADDR`: REST server address (default: "0.0.0.0:8080")
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If configuration is invalid or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("deqm_run=info".parse()?)
                .add_directive("api_rest=info".parse()?)
                .add_directive("deqm_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = Arc::new(config_from_env_value(std::env::var(SERVER_URL_ENV).ok())?);
    let rest_addr = std::env::var("DEQM_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into());

    tracing::info!("++ Using FHIR server {}", cfg.server_base());
    tracing::info!("++ Starting DEQM console REST on {}", rest_addr);

    let transport = Arc::new(HttpTransport::new(cfg.clone()));
    let app = router(AppState::new(cfg, transport));

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
