//! Compliance status aggregator.
//!
//! Pure, read-only derivation of a traffic-light state for a tracked person
//! from the stored DBS fields and the current date. A certificate whose
//! expiry has passed reports expired regardless of the stored enum.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::models::{CompliancePerson, DbsStatus};

/// How many days ahead of a 16th birthday the agency starts chasing checks.
const TURNING_16_HORIZON_DAYS: i64 = 90;

/// Severity bands for the back-office compliance dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Ok,
    Attention,
    Action,
}

/// Derived compliance state for one person.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedStatus {
    pub label: &'static str,
    pub severity: Severity,
    /// Effective DBS status once expiry has been applied.
    pub effective_dbs_status: DbsStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_until_sixteenth_birthday: Option<i64>,
    pub is_turning_sixteen_soon: bool,
}

/// Derive the reported status for a person as of `today`.
pub fn derive_status(person: &CompliancePerson, today: NaiveDate) -> DerivedStatus {
    let effective = effective_dbs_status(person, today);

    let (label, severity) = match effective {
        DbsStatus::NotRequested => ("DBS check not requested", Severity::Action),
        DbsStatus::Requested => ("DBS check requested", Severity::Attention),
        DbsStatus::Received => ("DBS check in place", Severity::Ok),
        DbsStatus::Expired => ("DBS certificate expired", Severity::Action),
    };

    let days_until_16 = person
        .date_of_birth
        .and_then(|dob| days_until_sixteenth_birthday(dob, today));

    DerivedStatus {
        label,
        severity,
        effective_dbs_status: effective,
        days_until_sixteenth_birthday: days_until_16,
        is_turning_sixteen_soon: days_until_16
            .map(|d| d <= TURNING_16_HORIZON_DAYS)
            .unwrap_or(false),
    }
}

/// The stored enum overridden by certificate expiry.
pub fn effective_dbs_status(person: &CompliancePerson, today: NaiveDate) -> DbsStatus {
    if person.dbs_status == DbsStatus::Received {
        if let Some(expiry) = person.dbs_certificate_expiry {
            if expiry < today {
                return DbsStatus::Expired;
            }
        }
    }
    person.dbs_status
}

/// Days until the 16th birthday, or None once the person is 16 or older.
pub fn days_until_sixteenth_birthday(date_of_birth: NaiveDate, today: NaiveDate) -> Option<i64> {
    // 29 Feb birthdays fall back to 1 Mar in non-leap years.
    let sixteenth = NaiveDate::from_ymd_opt(
        date_of_birth.year() + 16,
        date_of_birth.month(),
        date_of_birth.day(),
    )
    .or_else(|| NaiveDate::from_ymd_opt(date_of_birth.year() + 16, 3, 1))?;

    let days = (sixteenth - today).num_days();
    if days < 0 {
        None
    } else {
        Some(days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PersonRole;

    fn person(status: DbsStatus, expiry: Option<NaiveDate>) -> CompliancePerson {
        CompliancePerson {
            id: "p1".to_string(),
            role: PersonRole::HouseholdMember,
            application_id: Some("a1".to_string()),
            employee_id: None,
            first_name: "Alex".to_string(),
            last_name: "Example".to_string(),
            date_of_birth: None,
            email: None,
            relationship: Some("partner".to_string()),
            dbs_status: status,
            dbs_certificate_number: None,
            dbs_certificate_date: None,
            dbs_certificate_expiry: expiry,
            reminder_count: 0,
            last_reminder_at: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn past_expiry_forces_expired_over_stored_received() {
        let p = person(DbsStatus::Received, Some(date(2024, 6, 1)));
        let status = derive_status(&p, date(2025, 1, 1));
        assert_eq!(status.effective_dbs_status, DbsStatus::Expired);
        assert_eq!(status.severity, Severity::Action);
    }

    #[test]
    fn future_expiry_keeps_received() {
        let p = person(DbsStatus::Received, Some(date(2026, 6, 1)));
        let status = derive_status(&p, date(2025, 1, 1));
        assert_eq!(status.effective_dbs_status, DbsStatus::Received);
        assert_eq!(status.severity, Severity::Ok);
    }

    #[test]
    fn expiry_is_ignored_unless_received() {
        let p = person(DbsStatus::Requested, Some(date(2020, 1, 1)));
        let status = derive_status(&p, date(2025, 1, 1));
        assert_eq!(status.effective_dbs_status, DbsStatus::Requested);
    }

    #[test]
    fn turning_sixteen_within_horizon() {
        let mut p = person(DbsStatus::NotRequested, None);
        p.date_of_birth = Some(date(2009, 10, 1));
        // 36 days before the 16th birthday.
        let status = derive_status(&p, date(2025, 8, 26));
        assert_eq!(status.days_until_sixteenth_birthday, Some(36));
        assert!(status.is_turning_sixteen_soon);
    }

    #[test]
    fn already_sixteen_reports_none() {
        let mut p = person(DbsStatus::NotRequested, None);
        p.date_of_birth = Some(date(2000, 1, 1));
        let status = derive_status(&p, date(2025, 8, 26));
        assert_eq!(status.days_until_sixteenth_birthday, None);
        assert!(!status.is_turning_sixteen_soon);
    }

    #[test]
    fn leap_day_birthday_rolls_to_march() {
        let days = days_until_sixteenth_birthday(date(2012, 2, 29), date(2028, 2, 28));
        // 2028 is a leap year, so the birthday lands on 29 Feb 2028.
        assert_eq!(days, Some(1));

        let days = days_until_sixteenth_birthday(date(2011, 2, 28), date(2027, 2, 27));
        assert_eq!(days, Some(1));
    }

    #[test]
    fn lifecycle_transitions() {
        use DbsStatus::*;
        assert!(NotRequested.can_transition_to(Requested));
        assert!(Requested.can_transition_to(Requested), "resend allowed");
        assert!(Requested.can_transition_to(Received));
        assert!(Received.can_transition_to(Requested), "new check cycle");
        assert!(!NotRequested.can_transition_to(Received));
        assert!(!Expired.can_transition_to(Received));
    }
}
