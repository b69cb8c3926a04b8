use axum::{extract::State, Json};
use service_core::error::AppError;

use crate::dtos::{DashboardResponse, EnrollmentView, ProfileView};
use crate::middleware::CurrentSession;
use crate::AppState;

/// The caller's profile and enrollments. Only reachable once onboarded.
pub async fn dashboard_handler(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<DashboardResponse>, AppError> {
    let profile = state
        .profiles
        .find_profile_by_identity_id(&session.identity_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!(
                "No profile for identity {}",
                session.identity_id
            ))
        })?;

    let enrollments = state
        .profiles
        .find_enrollments_by_profile(&profile.profile_id)
        .await?;

    Ok(Json(DashboardResponse {
        profile: ProfileView::from(profile),
        enrollments: enrollments.into_iter().map(EnrollmentView::from).collect(),
    }))
}
