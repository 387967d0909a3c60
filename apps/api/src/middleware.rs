use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue, Method, header};
use axum::middleware::Next;
use axum::response::Response;
use hrdesk_application::{RequestCredentials, SessionIdentitySource};
use hrdesk_core::{AppError, AppResult, UserIdentity};
use tower_sessions::Session;

use crate::auth::SESSION_USER_KEY;
use crate::error::ApiResult;
use crate::state::AppState;

/// Cookie session adapter for the context assembler.
struct CookieSessionIdentity<'a>(&'a Session);

#[async_trait]
impl SessionIdentitySource for CookieSessionIdentity<'_> {
    async fn load_identity(&self) -> AppResult<Option<UserIdentity>> {
        self.0
            .get::<UserIdentity>(SESSION_USER_KEY)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to read session identity: {error}"))
            })
    }
}

/// Builds the request context once and attaches it as an extension.
pub async fn assemble_context(
    State(state): State<AppState>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Response {
    let token = bearer_token(request.headers()).map(ToOwned::to_owned);
    let cookie_session = CookieSessionIdentity(&session);
    let context = state
        .context_assembler
        .build_context(RequestCredentials {
            bearer_token: token.as_deref(),
            session: Some(&cookie_session),
        })
        .await;

    request.extensions_mut().insert(context);
    next.run(request).await
}

pub async fn require_same_origin_for_mutations(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    // Browsers never attach bearer headers on their own.
    if is_state_changing_method(request.method()) && bearer_token(request.headers()).is_none() {
        let headers = request.headers();

        if let Some(fetch_site) = headers.get("sec-fetch-site")
            && fetch_site == HeaderValue::from_static("cross-site")
        {
            return Err(AppError::Unauthorized("cross-site request blocked".to_owned()).into());
        }

        let origin = headers
            .get(header::ORIGIN)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        let referer = headers
            .get(header::REFERER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();

        let allowed_origin = state.frontend_url.as_str();
        let origin_is_allowed = origin == allowed_origin;
        let referer_is_allowed = referer.starts_with(allowed_origin);

        if !origin_is_allowed && !referer_is_allowed {
            return Err(AppError::Unauthorized("origin validation failed".to_owned()).into());
        }
    }

    Ok(next.run(request).await)
}

/// Returns the token of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();

    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

fn is_state_changing_method(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}
