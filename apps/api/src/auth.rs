use axum::extract::Extension;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use hrdesk_application::RequestContext;
use hrdesk_core::AppError;
use tower_sessions::Session;
use tracing::info;

use crate::dto::IdentityResponse;
use crate::error::ApiResult;
use crate::middleware::bearer_token;

pub const SESSION_USER_KEY: &str = "user_identity";

/// Exchanges a verified bearer token for a cookie session.
pub async fn session_handler(
    headers: HeaderMap,
    session: Session,
    Extension(context): Extension<RequestContext>,
) -> ApiResult<Json<IdentityResponse>> {
    if bearer_token(&headers).is_none() {
        return Err(AppError::Unauthorized("a bearer token is required".to_owned()).into());
    }

    let (Some(request_session), Some(response)) =
        (context.session(), IdentityResponse::from_context(&context))
    else {
        return Err(AppError::Unauthorized("invalid bearer token".to_owned()).into());
    };

    session
        .cycle_id()
        .await
        .map_err(|error| AppError::Internal(format!("failed to rotate session id: {error}")))?;
    session
        .insert(SESSION_USER_KEY, request_session.identity().clone())
        .await
        .map_err(|error| AppError::Internal(format!("failed to persist session: {error}")))?;

    info!(subject = response.subject.as_str(), "cookie session established");
    Ok(Json(response))
}

pub async fn logout_handler(
    session: Session,
    Extension(context): Extension<RequestContext>,
) -> ApiResult<StatusCode> {
    session
        .delete()
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete session: {error}")))?;

    if let Some(subject) = context.subject() {
        info!(subject, "cookie session deleted");
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn me_handler(
    Extension(context): Extension<RequestContext>,
) -> ApiResult<Json<IdentityResponse>> {
    IdentityResponse::from_context(&context)
        .map(Json)
        .ok_or_else(|| AppError::Unauthorized("authentication required".to_owned()).into())
}
