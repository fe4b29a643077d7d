mod api;
mod app;
mod auth;
mod config;
mod db;
mod models;
mod schema;
mod telemetry;
mod types;

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

pub use app::AppState;

#[tokio::main]
async fn main() -> ExitCode {
    // Check for --openapi flag to dump spec and exit
    if env::args().any(|arg| arg == "--openapi") {
        return match api::openapi().to_pretty_json() {
            Ok(spec) => {
                println!("{}", spec);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Failed to render OpenAPI document: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    let _telemetry = telemetry::init_telemetry();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Server failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let config = config::Config::from_env()?;

    let pool = db::create_pool(&config.database_url, config.db_pool_size)?;
    let state = AppState {
        pool: Arc::new(pool),
        session_ttl: chrono::Duration::days(config.session_ttl_days),
    };

    let app = app::build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!("Server listening on {}", local_addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", local_addr);
    tracing::info!(
        "OpenAPI spec available at http://{}/api-docs/openapi.json",
        local_addr
    );

    axum::serve(listener, app).await?;
    Ok(())
}
