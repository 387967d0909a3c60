use hrdesk_core::AppError;
use serde::Serialize;
use ts_rs::TS;

/// API error payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/error-response.ts"
)]
pub struct ErrorResponse {
    message: String,
}

impl ErrorResponse {
    /// Forbidden errors keep exactly the message the operation declared.
    pub(crate) fn from_error(error: &AppError) -> Self {
        Self {
            message: error.message().to_owned(),
        }
    }
}
