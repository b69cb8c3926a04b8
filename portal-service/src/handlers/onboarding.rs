use axum::{extract::State, http::StatusCode, Json};
use service_core::error::AppError;

use crate::dtos::{OnboardingRequest, OnboardingResponse, ProfileView};
use crate::middleware::CurrentSession;
use crate::services::onboarding::SubmissionOutcome;
use crate::AppState;

pub async fn onboarding_status(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<OnboardingResponse>, AppError> {
    let profile = state.onboarding.status(&session).await?;

    Ok(Json(OnboardingResponse {
        onboarding_completed: profile.as_ref().is_some_and(|p| p.onboarding_completed),
        profile: profile.map(ProfileView::from),
    }))
}

pub async fn submit_onboarding(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Json(request): Json<OnboardingRequest>,
) -> Result<(StatusCode, Json<OnboardingResponse>), AppError> {
    let outcome = state.onboarding.submit(&session, request).await?;

    let status = match outcome {
        SubmissionOutcome::Completed(_) => StatusCode::CREATED,
        SubmissionOutcome::AlreadyCompleted(_) => StatusCode::OK,
    };

    Ok((
        status,
        Json(OnboardingResponse {
            onboarding_completed: true,
            profile: Some(ProfileView::from(outcome.into_profile())),
        }),
    ))
}
