//! Compliance person model: household members, assistants and co-childminders.
//!
//! The three entities are structurally identical, so they share one table and
//! one model with a role discriminator. Exactly one of `application_id` /
//! `employee_id` is set.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which kind of connected person this record tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonRole {
    HouseholdMember,
    Assistant,
    Cochildminder,
}

impl PersonRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersonRole::HouseholdMember => "household_member",
            PersonRole::Assistant => "assistant",
            PersonRole::Cochildminder => "cochildminder",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "household_member" => Some(PersonRole::HouseholdMember),
            "assistant" => Some(PersonRole::Assistant),
            "cochildminder" => Some(PersonRole::Cochildminder),
            _ => None,
        }
    }
}

/// DBS check lifecycle.
///
/// `received -> expired` is time-driven (certificate expiry passing), the
/// rest are explicit actions. Resending a request (`requested -> requested`)
/// is always allowed, and `received -> requested` starts a new check cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DbsStatus {
    NotRequested,
    Requested,
    Received,
    Expired,
}

impl DbsStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DbsStatus::NotRequested => "not_requested",
            DbsStatus::Requested => "requested",
            DbsStatus::Received => "received",
            DbsStatus::Expired => "expired",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "not_requested" => Some(DbsStatus::NotRequested),
            "requested" => Some(DbsStatus::Requested),
            "received" => Some(DbsStatus::Received),
            "expired" => Some(DbsStatus::Expired),
            _ => None,
        }
    }

    /// Whether an explicit transition to `next` is legal.
    pub fn can_transition_to(&self, next: DbsStatus) -> bool {
        matches!(
            (self, next),
            (DbsStatus::NotRequested, DbsStatus::Requested)
                | (DbsStatus::Requested, DbsStatus::Requested)
                | (DbsStatus::Requested, DbsStatus::Received)
                | (DbsStatus::Received, DbsStatus::Requested)
                | (DbsStatus::Received, DbsStatus::Expired)
                | (DbsStatus::Expired, DbsStatus::Requested)
        )
    }
}

/// A person connected to an application or employee whose checks we track.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompliancePerson {
    pub id: String,
    pub role: PersonRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
    pub dbs_status: DbsStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dbs_certificate_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dbs_certificate_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dbs_certificate_expiry: Option<NaiveDate>,
    pub reminder_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reminder_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Request body for creating a compliance person.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePersonRequest {
    pub role: PersonRole,
    #[serde(default)]
    pub application_id: Option<String>,
    #[serde(default)]
    pub employee_id: Option<String>,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub relationship: Option<String>,
}

/// Request body for updating a person's DBS fields.
///
/// The status change is checked against the lifecycle; certificate fields are
/// overwritten, never deleted.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDbsRequest {
    pub dbs_status: DbsStatus,
    #[serde(default)]
    pub dbs_certificate_number: Option<String>,
    #[serde(default)]
    pub dbs_certificate_date: Option<NaiveDate>,
    #[serde(default)]
    pub dbs_certificate_expiry: Option<NaiveDate>,
}
