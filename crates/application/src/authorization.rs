use hrdesk_core::{AppError, AppResult};

use crate::RequestContext;

/// Generic rejection for callers without a session.
pub const AUTHENTICATION_REQUIRED_MESSAGE: &str = "authentication required";

/// Ensures the context may invoke `(module, action)`.
///
/// Anonymous callers get a generic `Unauthorized` that says nothing about the
/// target operation. Authenticated callers missing the pair get `Forbidden`
/// carrying exactly `failure_message`. No role name is treated specially.
pub fn enforce(
    context: &RequestContext,
    module: &str,
    action: &str,
    failure_message: &str,
) -> AppResult<()> {
    let Some(session) = context.session() else {
        return Err(AppError::Unauthorized(
            AUTHENTICATION_REQUIRED_MESSAGE.to_owned(),
        ));
    };

    if session.permissions().contains(module, action) {
        return Ok(());
    }

    Err(AppError::Forbidden(failure_message.to_owned()))
}
