//! Application API endpoints: public submission and admin review.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::models::{
    Application, ConversionOutcome, SubmitApplicationRequest, UpdateApplicationRequest,
};
use crate::validation::{validate_all, validate_section, FormSection, SectionReport};
use crate::AppState;

/// POST /api/apply - Submit the completed application form (public).
///
/// Every section is re-validated server-side regardless of what the client
/// checked, as a defence against stale or partial drafts. The submission
/// token makes this exactly-once: a retry under the same token conflicts
/// instead of creating a second application.
pub async fn submit_application(
    State(state): State<AppState>,
    Json(request): Json<SubmitApplicationRequest>,
) -> ApiResult<Application> {
    let report = validate_all(&request.form);
    if !report.is_valid {
        return Err(AppError::Validation {
            message: "Application form has validation errors".to_string(),
            fields: report.errors,
        });
    }

    let application = state
        .repo
        .create_application(&request.form, request.draft_token.as_deref())
        .await?;

    tracing::info!(application_id = %application.id, "Application submitted");
    success(application)
}

/// POST /api/apply/sections/:index/validate - Validate one section of the
/// in-progress form (public).
///
/// Forward navigation in the form is gated on this; drafts themselves are
/// never blocked by validation.
pub async fn validate_application_section(
    Path(index): Path<usize>,
    Json(request): Json<UpdateApplicationRequest>,
) -> ApiResult<SectionReport> {
    let section = FormSection::from_index(index)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown form section {}", index)))?;
    success(validate_section(section, &request.form))
}

/// GET /api/applications - List all applications.
pub async fn list_applications(State(state): State<AppState>) -> ApiResult<Vec<Application>> {
    success(state.repo.list_applications().await?)
}

/// GET /api/applications/:id - Get a single application.
pub async fn get_application(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Application> {
    match state.repo.get_application(&id).await? {
        Some(application) => success(application),
        None => Err(AppError::NotFound(format!("Application {} not found", id))),
    }
}

/// PUT /api/applications/:id - Admin edit of application data.
///
/// Edits are re-validated the same way the public submission is.
pub async fn update_application(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateApplicationRequest>,
) -> ApiResult<Application> {
    let report = validate_all(&request.form);
    if !report.is_valid {
        return Err(AppError::Validation {
            message: "Application form has validation errors".to_string(),
            fields: report.errors,
        });
    }

    success(state.repo.update_application(&id, &request.form).await?)
}

/// POST /api/applications/:id/reject - Reject a pending application.
pub async fn reject_application(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Application> {
    let application = state.repo.reject_application(&id).await?;
    tracing::info!(application_id = %id, "Application rejected");
    success(application)
}

/// POST /api/applications/:id/approve - Approve and convert to employee.
///
/// Idempotent: re-approval returns the existing employee with created=false.
pub async fn approve_application(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ConversionOutcome> {
    let start_date = Utc::now().date_naive();
    let outcome = state.repo.approve_and_convert(&id, start_date).await?;

    if outcome.created {
        tracing::info!(
            application_id = %id,
            employee_id = %outcome.employee_id,
            people_copied = outcome.people_copied,
            "Application approved and converted"
        );
    } else {
        tracing::info!(
            application_id = %id,
            employee_id = %outcome.employee_id,
            "Application already converted"
        );
    }

    success(outcome)
}
