use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use service_core::error::AppError;

use crate::models::SessionIdentity;
use crate::policy::admin::{check_admin_access, AdminPrincipal, AuthorizationResult};
use crate::AppState;

/// Admin-only routes. Runs after the access gate, so any session it finds has
/// already been verified.
pub async fn admin_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let session = request.extensions().get::<SessionIdentity>().cloned();

    let result = check_admin_access(
        state.identity.as_ref(),
        session.as_ref(),
        &state.gate.admin_emails,
    )
    .await;

    match result {
        AuthorizationResult::Authorized(principal) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        AuthorizationResult::Unauthorized { redirect_target } => {
            Redirect::temporary(redirect_target).into_response()
        }
    }
}

pub struct AdminUser(pub AdminPrincipal);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AdminPrincipal>()
            .cloned()
            .map(AdminUser)
            .ok_or_else(|| AppError::Forbidden(anyhow::anyhow!("Admin access required")))
    }
}
