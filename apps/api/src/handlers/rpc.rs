use axum::Json;
use axum::body::Bytes;
use axum::extract::{Extension, Path, State};
use hrdesk_application::{BatchCall, RequestContext};
use hrdesk_core::{AppError, AppResult};
use serde_json::Value;

use crate::dto::BatchResultResponse;
use crate::error::ApiResult;
use crate::state::AppState;

/// Upper bound on calls in one batch request.
pub const MAX_BATCH_CALLS: usize = 50;

pub async fn invoke_handler(
    State(state): State<AppState>,
    Path(operation): Path<String>,
    Extension(context): Extension<RequestContext>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let input = parse_input(&body)?;
    let output = state
        .dispatcher
        .dispatch(&context, operation.as_str(), input)
        .await?;

    Ok(Json(output))
}

pub async fn batch_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Json(calls): Json<Vec<BatchCall>>,
) -> ApiResult<Json<Vec<BatchResultResponse>>> {
    if calls.len() > MAX_BATCH_CALLS {
        return Err(AppError::Validation(format!(
            "a batch may contain at most {MAX_BATCH_CALLS} calls, got {}",
            calls.len()
        ))
        .into());
    }

    let results = state.dispatcher.dispatch_batch(&context, calls).await;
    Ok(Json(
        results.into_iter().map(BatchResultResponse::from).collect(),
    ))
}

/// An empty body means the operation takes no input.
fn parse_input(body: &[u8]) -> AppResult<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }

    serde_json::from_slice(body)
        .map_err(|error| AppError::Validation(format!("invalid JSON body: {error}")))
}
