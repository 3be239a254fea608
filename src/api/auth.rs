use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::error::IngressError;
use crate::http::server::AppState;
use crate::security::guards;

/// Reject callers that do not present the API key.
pub async fn privileged_caller(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, IngressError> {
    guards::enforce(guards::PRIVILEGED, request.headers(), &state.guard_context())?;
    Ok(next.run(request).await)
}
