use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use hrdesk_core::AppError;
use tower_http::trace::TraceLayer;
use tower_sessions::{SessionManagerLayer, SessionStore};

use crate::state::AppState;
use crate::{auth, handlers, middleware};

mod cors;


pub fn build_router<Store>(
    app_state: AppState,
    frontend_url: &str,
    session_layer: SessionManagerLayer<Store>,
) -> Result<Router, AppError>
where
    Store: SessionStore + Clone,
{
    // Everything below resolves exactly one request context.
    let context_routes = Router::new()
        .route("/rpc", post(handlers::rpc::batch_handler))
        .route("/rpc/{operation}", post(handlers::rpc::invoke_handler))
        .route("/auth/session", post(auth::session_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/auth/me", get(auth::me_handler))
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::assemble_context,
        ));

    Ok(Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(context_routes)
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_same_origin_for_mutations,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors::build_cors_layer(frontend_url)?)
        .layer(session_layer)
        .with_state(app_state))
}
