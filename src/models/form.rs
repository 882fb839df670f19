//! Satellite form submission records and token-keyed drafts.

use serde::{Deserialize, Serialize};

/// Which satellite form a token addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormKind {
    Application,
    Household,
    Assistant,
    Cochildminder,
    Reference,
    Ofsted,
    LocalAuthority,
}

impl FormKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormKind::Application => "application",
            FormKind::Household => "household",
            FormKind::Assistant => "assistant",
            FormKind::Cochildminder => "cochildminder",
            FormKind::Reference => "reference",
            FormKind::Ofsted => "ofsted",
            FormKind::LocalAuthority => "local_authority",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "application" => Some(FormKind::Application),
            "household" => Some(FormKind::Household),
            "assistant" => Some(FormKind::Assistant),
            "cochildminder" => Some(FormKind::Cochildminder),
            "reference" => Some(FormKind::Reference),
            "ofsted" => Some(FormKind::Ofsted),
            "local_authority" => Some(FormKind::LocalAuthority),
            _ => None,
        }
    }
}

/// Submission state of a satellite form. `Submitted` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormStatus {
    Pending,
    Submitted,
}

impl FormStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormStatus::Pending => "pending",
            FormStatus::Submitted => "submitted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(FormStatus::Pending),
            "submitted" => Some(FormStatus::Submitted),
            _ => None,
        }
    }
}

/// A form submission record, keyed by its opaque token.
///
/// `response_data` is only ever written when status becomes submitted, and
/// never rewritten afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSubmission {
    pub id: String,
    pub form_token: String,
    pub kind: FormKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_email: Option<String>,
    /// Set for local-authority check forms: which authority this was sent to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authority_name: Option<String>,
    pub status: FormStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_data: Option<serde_json::Value>,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<String>,
}

/// What a satellite page needs to render: kind and whether the token is spent.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormView {
    pub form_token: String,
    pub kind: FormKind,
    pub status: FormStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<String>,
}

impl From<FormSubmission> for FormView {
    fn from(record: FormSubmission) -> Self {
        Self {
            form_token: record.form_token,
            kind: record.kind,
            status: record.status,
            submitted_at: record.submitted_at,
        }
    }
}

/// A token-keyed partial answer set.
///
/// Upserted last-write-wins; the revision must increase strictly so a late
/// arrival from an older session cannot clobber newer answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub form_token: String,
    pub revision: i64,
    pub answers: serde_json::Value,
    pub updated_at: String,
}

/// Request body for saving a draft.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveDraftRequest {
    pub revision: i64,
    pub answers: serde_json::Value,
}

/// Request body for submitting a satellite form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitFormRequest {
    pub answers: serde_json::Value,
}
