use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use service_core::error::AppError;

use crate::dtos::{AnalyticsResponse, CourseDetailsResponse, EnrollmentsResponse, StudentsResponse};
use crate::middleware::AdminUser;
use crate::policy::admin::AdminPrincipal;
use crate::AppState;

pub async fn admin_me(AdminUser(principal): AdminUser) -> Json<AdminPrincipal> {
    Json(principal)
}

pub async fn list_students(
    State(state): State<AppState>,
    AdminUser(principal): AdminUser,
) -> Result<Json<StudentsResponse>, AppError> {
    tracing::debug!(admin = %principal.identity_id, "Listing students");
    Ok(Json(state.admin.list_students().await?))
}

pub async fn list_enrollments(
    State(state): State<AppState>,
    AdminUser(principal): AdminUser,
) -> Result<Json<EnrollmentsResponse>, AppError> {
    tracing::debug!(admin = %principal.identity_id, "Listing enrollments");
    Ok(Json(state.admin.list_enrollments().await?))
}

/// Student listing as a CSV download.
pub async fn export_students(
    State(state): State<AppState>,
    AdminUser(principal): AdminUser,
) -> Result<impl IntoResponse, AppError> {
    tracing::info!(admin = %principal.identity_id, "Exporting students");
    let csv = state.admin.export_students().await?;
    let disposition = format!(
        "attachment; filename=\"students-export-{}.csv\"",
        Utc::now().timestamp_millis()
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    ))
}

pub async fn course_details(
    State(state): State<AppState>,
    AdminUser(principal): AdminUser,
    Path(course_id): Path<String>,
) -> Result<Json<CourseDetailsResponse>, AppError> {
    tracing::debug!(admin = %principal.identity_id, course_id = %course_id, "Loading course details");
    Ok(Json(state.admin.course_details(&course_id).await?))
}

pub async fn analytics(
    State(state): State<AppState>,
    AdminUser(principal): AdminUser,
) -> Result<Json<AnalyticsResponse>, AppError> {
    tracing::debug!(admin = %principal.identity_id, "Loading analytics");
    Ok(Json(state.admin.analytics().await?))
}
