use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use service_core::error::AppError;

use crate::models::{RequestContext, SessionIdentity};
use crate::policy::routes::is_static_asset;
use crate::AppState;

/// Runs the access policy on every request that is not a static asset.
///
/// On `Continue` the resolved session, if any, is stored in the request
/// extensions for [`CurrentSession`]. Every other decision is answered with a
/// 307 redirect.
pub async fn access_gate_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if is_static_asset(request.uri().path()) {
        return next.run(request).await;
    }

    let (mut parts, body) = request.into_parts();
    let context = RequestContext::from_parts(
        &parts,
        &state.gate.public_url,
        &state.gate.session_cookie,
    );

    let outcome = state.policy.evaluate(&context).await;

    match outcome.decision.location() {
        Some(location) => Redirect::temporary(&location).into_response(),
        None => {
            if let Some(identity) = outcome.identity {
                parts.extensions.insert(identity);
            }
            next.run(Request::from_parts(parts, body)).await
        }
    }
}

/// The session the gate resolved for this request.
pub struct CurrentSession(pub SessionIdentity);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionIdentity>()
            .cloned()
            .map(CurrentSession)
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("No session on this request")))
    }
}
