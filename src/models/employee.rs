//! Employee model: the converted form of an approved application.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::application::{Address, AgeBandCapacity, Application, QualificationSet};

/// Operational status of an employee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentStatus {
    Active,
    OnLeave,
    Terminated,
}

impl EmploymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmploymentStatus::Active => "active",
            EmploymentStatus::OnLeave => "on_leave",
            EmploymentStatus::Terminated => "terminated",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(EmploymentStatus::Active),
            "on_leave" => Some(EmploymentStatus::OnLeave),
            "terminated" => Some(EmploymentStatus::Terminated),
            _ => None,
        }
    }
}

/// An employee record, one-to-one with its source application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: String,
    pub application_id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    pub ni_number: String,
    pub email: String,
    pub phone: String,
    pub current_address: Address,
    pub premises_description: String,
    pub capacity: AgeBandCapacity,
    pub qualifications: QualificationSet,
    pub employment_status: EmploymentStatus,
    pub employment_start_date: NaiveDate,
    pub created_at: String,
}

/// The field mapping from an application to its employee record.
///
/// Deterministic and total: every employee field has exactly one application
/// source or a fixed default. The id and timestamps are assigned at insert.
pub fn employee_fields_from(application: &Application, start_date: NaiveDate) -> Employee {
    let form = &application.form;
    Employee {
        id: String::new(),
        application_id: application.id.clone(),
        first_name: form.first_name.clone(),
        last_name: form.last_name.clone(),
        date_of_birth: form.date_of_birth,
        ni_number: form.ni_number.clone(),
        email: form.email.clone(),
        phone: form.phone.clone(),
        current_address: form.current_address.clone(),
        premises_description: form.premises_description.clone(),
        capacity: form.capacity.clone(),
        qualifications: form.qualifications.clone(),
        employment_status: EmploymentStatus::Active,
        employment_start_date: start_date,
        created_at: String::new(),
    }
}

/// Result of the approval/conversion pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionOutcome {
    pub employee_id: String,
    /// False when the application had already been converted.
    pub created: bool,
    /// How many compliance people were copied under the new employee.
    pub people_copied: usize,
}
