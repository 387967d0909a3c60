//! hrdesk API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod api_services;
mod auth;
mod dev_seed;
mod dto;
mod error;
mod handlers;
mod middleware;
mod redis_session_store;
mod state;

use hrdesk_core::AppError;
use tracing::info;

use crate::api_config::{ApiConfig, SessionStoreConfig, init_tracing};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;
    let pool = api_services::connect_and_migrate(&config.database_url).await?;

    if config.migrate_only {
        info!("database migrations applied successfully");
        return Ok(());
    }

    let app_state = api_services::build_app_state(pool.clone(), &config)?;

    if config.dev_seed {
        dev_seed::run(&app_state, &config).await?;
    }

    let app = match (&config.session_store, app_state.redis_client.clone()) {
        (SessionStoreConfig::Redis { .. }, Some(redis_client)) => {
            let session_layer =
                api_services::build_redis_session_layer(redis_client, config.cookie_secure)
                    .await?;
            api_router::build_router(app_state, &config.frontend_url, session_layer)?
        }
        _ => {
            let session_layer =
                api_services::build_postgres_session_layer(pool, config.cookie_secure).await?;
            api_router::build_router(app_state, &config.frontend_url, session_layer)?
        }
    };

    let address = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, app_env = ?config.app_env, "hrdesk-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}
