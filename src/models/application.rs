//! Application model: the multi-section registration form and its stored record.
//!
//! Nested repeatable groups (previous names, address history, employment
//! history) are explicit typed shapes, stored as JSON columns.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Lifecycle status of an application.
///
/// Only pending -> approved and pending -> rejected are legal; approved is
/// terminal and triggers conversion to an employee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ApplicationStatus::Pending),
            "approved" => Some(ApplicationStatus::Approved),
            "rejected" => Some(ApplicationStatus::Rejected),
            _ => None,
        }
    }
}

/// A postal address.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default)]
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    #[serde(default)]
    pub town: String,
    #[serde(default)]
    pub postcode: String,
}

/// One entry of the five-year address history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviousAddress {
    #[serde(default)]
    pub address: Address,
    #[serde(default)]
    pub from_date: Option<NaiveDate>,
    #[serde(default)]
    pub to_date: Option<NaiveDate>,
}

/// A previously used name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviousName {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub used_from: Option<NaiveDate>,
    #[serde(default)]
    pub used_to: Option<NaiveDate>,
}

/// A single qualification: first aid, safeguarding, EYFS or level 2.
///
/// Provider, date and certificate number are only required when completed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Qualification {
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_achieved: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_number: Option<String>,
}

/// The fixed set of qualifications asked about on the form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualificationSet {
    #[serde(default)]
    pub first_aid: Qualification,
    #[serde(default)]
    pub safeguarding: Qualification,
    #[serde(default)]
    pub eyfs: Qualification,
    #[serde(default)]
    pub level_two: Qualification,
}

/// One entry of the employment history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmploymentEntry {
    #[serde(default)]
    pub employer: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub from_date: Option<NaiveDate>,
    #[serde(default)]
    pub to_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_for_leaving: Option<String>,
}

/// A referee nominated by the applicant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Referee {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub relationship: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Declared service capacity per age band.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgeBandCapacity {
    #[serde(default)]
    pub under_one: u32,
    #[serde(default)]
    pub one_to_five: u32,
    #[serde(default)]
    pub five_to_eight: u32,
    #[serde(default)]
    pub over_eight: u32,
}

/// A household member as declared on the main form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclaredHouseholdMember {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub relationship: String,
}

/// Vetting and suitability answers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VettingAnswers {
    /// "Do you hold a DBS certificate?"
    #[serde(default)]
    pub has_dbs: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dbs_number: Option<String>,
    #[serde(default)]
    pub has_criminal_convictions: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conviction_details: Option<String>,
    #[serde(default)]
    pub is_disqualified: Option<bool>,
    #[serde(default)]
    pub social_services_involvement: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social_services_details: Option<String>,
}

/// The full answer object for the multi-section application form.
///
/// Every field is optional or defaulted so that a partially completed draft
/// deserializes; the section validators decide what is actually required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationForm {
    // Section 1: personal details
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub previous_names: Vec<PreviousName>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub ni_number: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,

    // Section 2: address and five-year history
    #[serde(default)]
    pub current_address: Address,
    #[serde(default)]
    pub address_history: Vec<PreviousAddress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_gap_explanation: Option<String>,

    // Section 3: premises and capacity
    #[serde(default)]
    pub premises_description: String,
    #[serde(default)]
    pub capacity: AgeBandCapacity,

    // Section 4: qualifications
    #[serde(default)]
    pub qualifications: QualificationSet,

    // Section 5: employment history
    #[serde(default)]
    pub employment_history: Vec<EmploymentEntry>,

    // Section 6: references
    #[serde(default)]
    pub referees: Vec<Referee>,

    // Section 7: household composition
    #[serde(default)]
    pub household_members: Vec<DeclaredHouseholdMember>,

    // Section 8: suitability and vetting
    #[serde(default)]
    pub vetting: VettingAnswers,

    // Section 9: declaration
    #[serde(default)]
    pub consent_to_checks: bool,
    #[serde(default)]
    pub declaration_agreed: bool,
    #[serde(default)]
    pub signature_name: String,
    #[serde(default)]
    pub signature_date: Option<NaiveDate>,
}

/// A stored application record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: String,
    #[serde(flatten)]
    pub form: ApplicationForm,
    pub status: ApplicationStatus,
    pub created_at: String,
    pub updated_at: String,
}

/// Request body for submitting the main application form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitApplicationRequest {
    /// Draft token to clear on success, if the applicant saved drafts.
    #[serde(default)]
    pub draft_token: Option<String>,
    #[serde(flatten)]
    pub form: ApplicationForm,
}

/// Request body for admin edits to a pending application.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateApplicationRequest {
    #[serde(flatten)]
    pub form: ApplicationForm,
}
