use hrdesk_core::AppResult;
use serde::Serialize;
use serde_json::Value;
use ts_rs::TS;

use crate::error::{ErrorResponse, status_for};

/// Outcome of one call inside a batch request.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/batch-result-response.ts"
)]
pub struct BatchResultResponse {
    pub ok: bool,
    /// HTTP status the call would have produced on its own.
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorResponse>,
}

impl From<AppResult<Value>> for BatchResultResponse {
    fn from(result: AppResult<Value>) -> Self {
        match result {
            Ok(data) => Self {
                ok: true,
                status: 200,
                data: Some(data),
                error: None,
            },
            Err(error) => Self {
                ok: false,
                status: status_for(&error).as_u16(),
                data: None,
                error: Some(ErrorResponse::from_error(&error)),
            },
        }
    }
}
