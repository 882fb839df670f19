//! Satellite form endpoints: token-addressed drafts and single-use submission.
//!
//! These routes are public; possession of the opaque token is the only
//! credential. A lost token has no recovery path other than the agency
//! issuing a new one.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::models::{Draft, FormSubmission, FormView, SaveDraftRequest, SubmitFormRequest};
use crate::AppState;

/// GET /api/forms/:token - What the satellite page needs to render.
///
/// A submitted form reports its status so the page can show the read-only
/// "already submitted" view instead of the form.
pub async fn get_form(State(state): State<AppState>, Path(token): Path<String>) -> ApiResult<FormView> {
    match state.repo.get_form_by_token(&token).await? {
        Some(form) => success(form.into()),
        None => Err(AppError::NotFound(format!("Form {} not found", token))),
    }
}

/// GET /api/forms/:token/draft - Load the saved draft for a token.
pub async fn get_draft(State(state): State<AppState>, Path(token): Path<String>) -> ApiResult<Draft> {
    match state.repo.get_draft(&token).await? {
        Some(draft) => success(draft),
        None => Err(AppError::NotFound(format!("No draft for {}", token))),
    }
}

/// PUT /api/forms/:token/draft - Save a draft (fire-and-forget autosave).
///
/// Drafts are never validated; validation only gates submission. A revision
/// at or below the stored one is rejected so an older session cannot clobber
/// newer answers. Submitted forms no longer accept drafts.
pub async fn save_draft(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(request): Json<SaveDraftRequest>,
) -> ApiResult<Draft> {
    if let Some(form) = state.repo.get_form_by_token(&token).await? {
        if form.status == crate::models::FormStatus::Submitted {
            return Err(AppError::AlreadySubmitted(format!(
                "Form {} has already been submitted",
                token
            )));
        }
    }

    success(
        state
            .repo
            .save_draft(&token, request.revision, &request.answers)
            .await?,
    )
}

/// POST /api/forms/:token/submit - Submit a satellite form, exactly once.
pub async fn submit_form(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(request): Json<SubmitFormRequest>,
) -> ApiResult<FormSubmission> {
    if !request.answers.is_object() {
        return Err(AppError::BadRequest(
            "Form answers must be a JSON object".to_string(),
        ));
    }

    let form = state.repo.submit_form(&token, &request.answers).await?;
    tracing::info!(form_token = %token, kind = form.kind.as_str(), "Satellite form submitted");
    success(form)
}
