//! Jurisdiction-scoped verification requests: local-authority grouping,
//! LA checks, Ofsted checks and reference requests.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::lookup::{group_addresses_by_authority, GroupedAddress};
use crate::models::{Application, FormKind, FormStatus, FormSubmission};
use crate::notify::{EmailTemplate, OutboundEmail};
use crate::AppState;

async fn load_application(state: &AppState, id: &str) -> Result<Application, AppError> {
    state
        .repo
        .get_application(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Application {} not found", id)))
}

/// GET /api/applications/:id/authority-groups - Addresses grouped by the
/// local authority that governs them.
pub async fn authority_groups(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<BTreeMap<String, Vec<GroupedAddress>>> {
    let application = load_application(&state, &id).await?;

    let groups = group_addresses_by_authority(
        &application.form.current_address,
        &application.form.address_history,
        &state.config.default_authority,
        state.lookup.as_ref(),
    )
    .await;

    success(groups)
}

/// Request body for sending a local-authority check.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorityCheckRequest {
    pub authority_name: String,
    pub recipient_email: String,
}

/// POST /api/applications/:id/authority-checks - Send a check request to one
/// local authority.
///
/// Only the addresses within that authority's remit are disclosed. A pending
/// form for the same authority is reused rather than minting a second token.
pub async fn send_authority_check(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<AuthorityCheckRequest>,
) -> ApiResult<FormSubmission> {
    let application = load_application(&state, &id).await?;

    let groups = group_addresses_by_authority(
        &application.form.current_address,
        &application.form.address_history,
        &state.config.default_authority,
        state.lookup.as_ref(),
    )
    .await;

    let addresses = groups.get(&request.authority_name).ok_or_else(|| {
        AppError::BadRequest(format!(
            "No addresses fall under authority {}",
            request.authority_name
        ))
    })?;

    let existing = state
        .repo
        .list_forms_by_application(&id)
        .await?
        .into_iter()
        .find(|f| {
            f.kind == FormKind::LocalAuthority
                && f.status == FormStatus::Pending
                && f.authority_name.as_deref() == Some(request.authority_name.as_str())
        });

    let form = match existing {
        Some(form) => form,
        None => {
            state
                .repo
                .create_form_submission(
                    FormKind::LocalAuthority,
                    Some(&id),
                    None,
                    None,
                    Some(&request.recipient_email),
                    Some(&request.authority_name),
                )
                .await?
        }
    };

    state
        .notifier
        .send(&OutboundEmail {
            recipient: request.recipient_email.clone(),
            template: EmailTemplate::AuthorityCheck,
            form_token: form.form_token.clone(),
            payload: serde_json::json!({
                "applicantName": format!(
                    "{} {}",
                    application.form.first_name, application.form.last_name
                ),
                "dateOfBirth": application.form.date_of_birth,
                "authorityName": request.authority_name,
                // Data minimisation: only this authority's addresses go out.
                "addresses": addresses,
            }),
        })
        .await?;

    success(form)
}

/// Request body for sending an Ofsted "known to" check.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfstedCheckRequest {
    pub recipient_email: String,
}

/// POST /api/applications/:id/ofsted-check - Send a known-to-Ofsted check.
pub async fn send_ofsted_check(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<OfstedCheckRequest>,
) -> ApiResult<FormSubmission> {
    let application = load_application(&state, &id).await?;

    let existing = state
        .repo
        .list_forms_by_application(&id)
        .await?
        .into_iter()
        .find(|f| f.kind == FormKind::Ofsted && f.status == FormStatus::Pending);

    let form = match existing {
        Some(form) => form,
        None => {
            state
                .repo
                .create_form_submission(
                    FormKind::Ofsted,
                    Some(&id),
                    None,
                    None,
                    Some(&request.recipient_email),
                    None,
                )
                .await?
        }
    };

    state
        .notifier
        .send(&OutboundEmail {
            recipient: request.recipient_email.clone(),
            template: EmailTemplate::OfstedCheck,
            form_token: form.form_token.clone(),
            payload: serde_json::json!({
                "applicantName": format!(
                    "{} {}",
                    application.form.first_name, application.form.last_name
                ),
                "dateOfBirth": application.form.date_of_birth,
                "previousNames": application.form.previous_names,
            }),
        })
        .await?;

    success(form)
}

/// POST /api/applications/:id/reference-requests - Send a request to each
/// referee nominated on the application.
pub async fn send_reference_requests(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<FormSubmission>> {
    let application = load_application(&state, &id).await?;

    if application.form.referees.is_empty() {
        return Err(AppError::BadRequest(
            "Application has no referees".to_string(),
        ));
    }

    let existing = state.repo.list_forms_by_application(&id).await?;

    let mut forms = Vec::new();
    for referee in &application.form.referees {
        let open = existing.iter().find(|f| {
            f.kind == FormKind::Reference
                && f.status == FormStatus::Pending
                && f.recipient_email.as_deref() == Some(referee.email.as_str())
        });

        let form = match open {
            Some(form) => form.clone(),
            None => {
                state
                    .repo
                    .create_form_submission(
                        FormKind::Reference,
                        Some(&id),
                        None,
                        None,
                        Some(&referee.email),
                        None,
                    )
                    .await?
            }
        };

        state
            .notifier
            .send(&OutboundEmail {
                recipient: referee.email.clone(),
                template: EmailTemplate::ReferenceRequest,
                form_token: form.form_token.clone(),
                payload: serde_json::json!({
                    "applicantName": format!(
                        "{} {}",
                        application.form.first_name, application.form.last_name
                    ),
                    "refereeName": referee.name,
                    "relationship": referee.relationship,
                }),
            })
            .await?;

        forms.push(form);
    }

    success(forms)
}
