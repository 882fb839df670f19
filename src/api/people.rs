//! Compliance person API endpoints: CRUD, DBS lifecycle, derived status and
//! DBS check requests.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::models::{
    CompliancePerson, CreatePersonRequest, DbsStatus, FormKind, FormSubmission, PersonRole,
    UpdateDbsRequest,
};
use crate::notify::{EmailTemplate, OutboundEmail};
use crate::status::{derive_status, DerivedStatus};
use crate::AppState;

/// Query parameters for listing people: exactly one parent must be given.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPeopleQuery {
    #[serde(default)]
    pub application_id: Option<String>,
    #[serde(default)]
    pub employee_id: Option<String>,
}

/// GET /api/people?applicationId=|employeeId= - List people under a parent.
pub async fn list_people(
    State(state): State<AppState>,
    Query(query): Query<ListPeopleQuery>,
) -> ApiResult<Vec<CompliancePerson>> {
    match (&query.application_id, &query.employee_id) {
        (Some(application_id), None) => {
            success(state.repo.list_people_by_application(application_id).await?)
        }
        (None, Some(employee_id)) => {
            success(state.repo.list_people_by_employee(employee_id).await?)
        }
        _ => Err(AppError::BadRequest(
            "Provide exactly one of applicationId or employeeId".to_string(),
        )),
    }
}

/// POST /api/people - Create a compliance person.
pub async fn create_person(
    State(state): State<AppState>,
    Json(request): Json<CreatePersonRequest>,
) -> ApiResult<CompliancePerson> {
    if request.application_id.is_some() == request.employee_id.is_some() {
        return Err(AppError::BadRequest(
            "A person belongs to exactly one of an application or an employee".to_string(),
        ));
    }
    if request.first_name.trim().is_empty() {
        return Err(AppError::field("firstName", "First name is required"));
    }
    if request.last_name.trim().is_empty() {
        return Err(AppError::field("lastName", "Last name is required"));
    }

    success(state.repo.create_person(&request).await?)
}

/// GET /api/people/:id - Get a single person.
pub async fn get_person(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<CompliancePerson> {
    match state.repo.get_person(&id).await? {
        Some(person) => success(person),
        None => Err(AppError::NotFound(format!("Person {} not found", id))),
    }
}

/// PUT /api/people/:id/dbs - Update DBS status and certificate fields.
pub async fn update_person_dbs(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateDbsRequest>,
) -> ApiResult<CompliancePerson> {
    success(state.repo.update_person_dbs(&id, &request).await?)
}

/// DELETE /api/people/:id - Delete a person.
pub async fn delete_person(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    state.repo.delete_person(&id).await?;
    success(())
}

/// GET /api/people/:id/status - Derived compliance status for one person.
pub async fn person_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<DerivedStatus> {
    let person = state
        .repo
        .get_person(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Person {} not found", id)))?;

    success(derive_status(&person, Utc::now().date_naive()))
}

/// Request body for sending a DBS check request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbsRequestBody {
    #[serde(default)]
    pub recipient_email: Option<String>,
}

/// POST /api/people/:id/dbs-request - Send a DBS check request to a person.
///
/// An existing pending form for the person is reused so a resend goes out
/// under the same token; otherwise a fresh token is minted. Reminder
/// bookkeeping is bumped either way.
pub async fn send_dbs_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<DbsRequestBody>,
) -> ApiResult<FormSubmission> {
    let person = state
        .repo
        .get_person(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Person {} not found", id)))?;

    let recipient = body
        .recipient_email
        .or_else(|| person.email.clone())
        .ok_or_else(|| AppError::field("recipientEmail", "No email address for this person"))?;

    let kind = match person.role {
        PersonRole::HouseholdMember => FormKind::Household,
        PersonRole::Assistant => FormKind::Assistant,
        PersonRole::Cochildminder => FormKind::Cochildminder,
    };

    let existing = state
        .repo
        .list_forms_by_person(&id)
        .await?
        .into_iter()
        .find(|f| f.kind == kind && f.status == crate::models::FormStatus::Pending);

    let form = match existing {
        Some(form) => form,
        None => {
            state
                .repo
                .create_form_submission(
                    kind,
                    person.application_id.as_deref(),
                    person.employee_id.as_deref(),
                    Some(&id),
                    Some(&recipient),
                    None,
                )
                .await?
        }
    };

    state
        .repo
        .update_person_dbs(
            &id,
            &UpdateDbsRequest {
                dbs_status: DbsStatus::Requested,
                dbs_certificate_number: None,
                dbs_certificate_date: None,
                dbs_certificate_expiry: None,
            },
        )
        .await?;
    state.repo.record_reminder(&id).await?;

    state
        .notifier
        .send(&OutboundEmail {
            recipient,
            template: EmailTemplate::DbsRequest,
            form_token: form.form_token.clone(),
            payload: serde_json::json!({
                "personName": format!("{} {}", person.first_name, person.last_name),
                "role": person.role,
            }),
        })
        .await?;

    success(form)
}
