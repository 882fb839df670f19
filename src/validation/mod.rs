//! Section validators for the multi-section application form.
//!
//! Pure functions of the accumulated answers: no I/O, no clock. Forward
//! navigation and final submission are gated on these; drafts are never
//! blocked by validation.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::models::{ApplicationForm, Qualification};

/// HMRC national insurance number shape: two letters, six digits, suffix A-D.
static NI_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-CEGHJ-PR-TW-Z]{2}[0-9]{6}[A-D]$").unwrap());

/// DBS certificate numbers are exactly twelve digits.
static DBS_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{12}$").unwrap());

/// UK postcode, outward + inward code.
static POSTCODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[A-Z]{1,2}[0-9][A-Z0-9]?\s*[0-9][A-Z]{2}$").unwrap());

/// Minimal email shape; real verification happens out of band.
static EMAIL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

/// Days of overlap slack allowed between consecutive address periods before a
/// gap explanation is required.
const ADDRESS_GAP_TOLERANCE_DAYS: i64 = 30;

/// The nine sections of the application form, in page order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormSection {
    PersonalDetails,
    AddressHistory,
    Premises,
    Qualifications,
    EmploymentHistory,
    References,
    Household,
    Suitability,
    Declaration,
}

impl FormSection {
    pub const ALL: [FormSection; 9] = [
        FormSection::PersonalDetails,
        FormSection::AddressHistory,
        FormSection::Premises,
        FormSection::Qualifications,
        FormSection::EmploymentHistory,
        FormSection::References,
        FormSection::Household,
        FormSection::Suitability,
        FormSection::Declaration,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Outcome of validating one section.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionReport {
    pub is_valid: bool,
    /// Field key -> message, keyed the way the JSON form shape spells fields.
    pub errors: BTreeMap<String, String>,
}

impl SectionReport {
    fn from_errors(errors: BTreeMap<String, String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

/// Validate a single section of the form.
pub fn validate_section(section: FormSection, form: &ApplicationForm) -> SectionReport {
    let mut errors = BTreeMap::new();
    match section {
        FormSection::PersonalDetails => personal_details(form, &mut errors),
        FormSection::AddressHistory => address_history(form, &mut errors),
        FormSection::Premises => premises(form, &mut errors),
        FormSection::Qualifications => qualifications(form, &mut errors),
        FormSection::EmploymentHistory => employment_history(form, &mut errors),
        FormSection::References => references(form, &mut errors),
        FormSection::Household => household(form, &mut errors),
        FormSection::Suitability => suitability(form, &mut errors),
        FormSection::Declaration => declaration(form, &mut errors),
    }
    SectionReport::from_errors(errors)
}

/// Re-validate every section, merging all field errors.
///
/// Used for final submission as a defence against stale or partial drafts.
pub fn validate_all(form: &ApplicationForm) -> SectionReport {
    let mut errors = BTreeMap::new();
    for section in FormSection::ALL {
        errors.extend(validate_section(section, form).errors);
    }
    SectionReport::from_errors(errors)
}

pub fn is_valid_postcode(s: &str) -> bool {
    POSTCODE.is_match(s.trim())
}

fn require(errors: &mut BTreeMap<String, String>, key: &str, value: &str, message: &str) {
    if value.trim().is_empty() {
        errors.insert(key.to_string(), message.to_string());
    }
}

fn personal_details(form: &ApplicationForm, errors: &mut BTreeMap<String, String>) {
    require(errors, "firstName", &form.first_name, "First name is required");
    require(errors, "lastName", &form.last_name, "Last name is required");
    if form.date_of_birth.is_none() {
        errors.insert(
            "dateOfBirth".to_string(),
            "Date of birth is required".to_string(),
        );
    }
    if form.ni_number.trim().is_empty() {
        errors.insert(
            "niNumber".to_string(),
            "National insurance number is required".to_string(),
        );
    } else if !NI_NUMBER.is_match(form.ni_number.trim()) {
        errors.insert(
            "niNumber".to_string(),
            "National insurance number format is invalid".to_string(),
        );
    }
    if form.email.trim().is_empty() {
        errors.insert("email".to_string(), "Email address is required".to_string());
    } else if !EMAIL.is_match(form.email.trim()) {
        errors.insert("email".to_string(), "Email address is invalid".to_string());
    }
    require(errors, "phone", &form.phone, "Phone number is required");
    for (i, previous) in form.previous_names.iter().enumerate() {
        if previous.name.trim().is_empty() {
            errors.insert(
                format!("previousNames[{}].name", i),
                "Previous name cannot be empty".to_string(),
            );
        }
    }
}

fn address_history(form: &ApplicationForm, errors: &mut BTreeMap<String, String>) {
    require(
        errors,
        "currentAddress.line1",
        &form.current_address.line1,
        "Address line 1 is required",
    );
    require(
        errors,
        "currentAddress.town",
        &form.current_address.town,
        "Town is required",
    );
    if form.current_address.postcode.trim().is_empty() {
        errors.insert(
            "currentAddress.postcode".to_string(),
            "Postcode is required".to_string(),
        );
    } else if !is_valid_postcode(&form.current_address.postcode) {
        errors.insert(
            "currentAddress.postcode".to_string(),
            "Postcode format is invalid".to_string(),
        );
    }

    let mut periods = Vec::new();
    for (i, entry) in form.address_history.iter().enumerate() {
        require(
            errors,
            &format!("addressHistory[{}].address.line1", i),
            &entry.address.line1,
            "Address line 1 is required",
        );
        require(
            errors,
            &format!("addressHistory[{}].address.postcode", i),
            &entry.address.postcode,
            "Postcode is required",
        );
        match (entry.from_date, entry.to_date) {
            (Some(from), Some(to)) => {
                if to < from {
                    errors.insert(
                        format!("addressHistory[{}].toDate", i),
                        "End date is before start date".to_string(),
                    );
                } else {
                    periods.push((from, to));
                }
            }
            (None, _) => {
                errors.insert(
                    format!("addressHistory[{}].fromDate", i),
                    "Start date is required".to_string(),
                );
            }
            (_, None) => {
                errors.insert(
                    format!("addressHistory[{}].toDate", i),
                    "End date is required".to_string(),
                );
            }
        }
    }

    // A gap between consecutive periods needs an explanation.
    periods.sort();
    let has_gap = periods
        .windows(2)
        .any(|w| (w[1].0 - w[0].1).num_days() > ADDRESS_GAP_TOLERANCE_DAYS);
    if has_gap
        && form
            .address_gap_explanation
            .as_deref()
            .unwrap_or("")
            .trim()
            .is_empty()
    {
        errors.insert(
            "addressGapExplanation".to_string(),
            "Please explain the gap in your address history".to_string(),
        );
    }
}

fn premises(form: &ApplicationForm, errors: &mut BTreeMap<String, String>) {
    require(
        errors,
        "premisesDescription",
        &form.premises_description,
        "Premises description is required",
    );
    let total = form.capacity.under_one
        + form.capacity.one_to_five
        + form.capacity.five_to_eight
        + form.capacity.over_eight;
    if total == 0 {
        errors.insert(
            "capacity".to_string(),
            "Declare capacity for at least one age band".to_string(),
        );
    }
}

fn qualification(
    key: &str,
    q: &Qualification,
    errors: &mut BTreeMap<String, String>,
) {
    // Provider, date and certificate number only required once marked completed.
    if !q.completed {
        return;
    }
    if q.provider.as_deref().unwrap_or("").trim().is_empty() {
        errors.insert(
            format!("qualifications.{}.provider", key),
            "Provider is required".to_string(),
        );
    }
    if q.date_achieved.is_none() {
        errors.insert(
            format!("qualifications.{}.dateAchieved", key),
            "Date achieved is required".to_string(),
        );
    }
    if q
        .certificate_number
        .as_deref()
        .unwrap_or("")
        .trim()
        .is_empty()
    {
        errors.insert(
            format!("qualifications.{}.certificateNumber", key),
            "Certificate number is required".to_string(),
        );
    }
}

fn qualifications(form: &ApplicationForm, errors: &mut BTreeMap<String, String>) {
    qualification("firstAid", &form.qualifications.first_aid, errors);
    qualification("safeguarding", &form.qualifications.safeguarding, errors);
    qualification("eyfs", &form.qualifications.eyfs, errors);
    qualification("levelTwo", &form.qualifications.level_two, errors);
}

fn employment_history(form: &ApplicationForm, errors: &mut BTreeMap<String, String>) {
    for (i, entry) in form.employment_history.iter().enumerate() {
        require(
            errors,
            &format!("employmentHistory[{}].employer", i),
            &entry.employer,
            "Employer is required",
        );
        require(
            errors,
            &format!("employmentHistory[{}].role", i),
            &entry.role,
            "Role is required",
        );
        if entry.from_date.is_none() {
            errors.insert(
                format!("employmentHistory[{}].fromDate", i),
                "Start date is required".to_string(),
            );
        }
    }
}

fn references(form: &ApplicationForm, errors: &mut BTreeMap<String, String>) {
    if form.referees.len() != 2 {
        errors.insert(
            "referees".to_string(),
            "Two references are required".to_string(),
        );
    }
    for (i, referee) in form.referees.iter().enumerate() {
        require(
            errors,
            &format!("referees[{}].name", i),
            &referee.name,
            "Referee name is required",
        );
        require(
            errors,
            &format!("referees[{}].relationship", i),
            &referee.relationship,
            "Relationship is required",
        );
        if referee.email.trim().is_empty() {
            errors.insert(
                format!("referees[{}].email", i),
                "Referee email is required".to_string(),
            );
        } else if !EMAIL.is_match(referee.email.trim()) {
            errors.insert(
                format!("referees[{}].email", i),
                "Referee email is invalid".to_string(),
            );
        }
    }
    if form.referees.len() == 2 && !form.referees[0].email.trim().is_empty() {
        if form.referees[0].email.trim() == form.referees[1].email.trim() {
            errors.insert(
                "referees[1].email".to_string(),
                "References must be two different people".to_string(),
            );
        }
    }
}

fn household(form: &ApplicationForm, errors: &mut BTreeMap<String, String>) {
    for (i, member) in form.household_members.iter().enumerate() {
        require(
            errors,
            &format!("householdMembers[{}].firstName", i),
            &member.first_name,
            "First name is required",
        );
        require(
            errors,
            &format!("householdMembers[{}].lastName", i),
            &member.last_name,
            "Last name is required",
        );
        if member.date_of_birth.is_none() {
            errors.insert(
                format!("householdMembers[{}].dateOfBirth", i),
                "Date of birth is required".to_string(),
            );
        }
        require(
            errors,
            &format!("householdMembers[{}].relationship", i),
            &member.relationship,
            "Relationship is required",
        );
    }
}

fn suitability(form: &ApplicationForm, errors: &mut BTreeMap<String, String>) {
    match form.vetting.has_dbs {
        None => {
            errors.insert(
                "hasDbs".to_string(),
                "Please answer whether you hold a DBS certificate".to_string(),
            );
        }
        Some(true) => {
            let number = form.vetting.dbs_number.as_deref().unwrap_or("").trim();
            if number.is_empty() {
                errors.insert(
                    "dbsNumber".to_string(),
                    "DBS certificate number is required".to_string(),
                );
            } else if !DBS_NUMBER.is_match(number) {
                errors.insert(
                    "dbsNumber".to_string(),
                    "DBS certificate number must be exactly 12 digits".to_string(),
                );
            }
        }
        Some(false) => {}
    }

    match form.vetting.has_criminal_convictions {
        None => {
            errors.insert(
                "hasCriminalConvictions".to_string(),
                "Please answer the criminal convictions question".to_string(),
            );
        }
        Some(true) => {
            if form
                .vetting
                .conviction_details
                .as_deref()
                .unwrap_or("")
                .trim()
                .is_empty()
            {
                errors.insert(
                    "convictionDetails".to_string(),
                    "Please give details of convictions".to_string(),
                );
            }
        }
        Some(false) => {}
    }

    if form.vetting.is_disqualified.is_none() {
        errors.insert(
            "isDisqualified".to_string(),
            "Please answer the disqualification question".to_string(),
        );
    }

    if form.vetting.social_services_involvement == Some(true)
        && form
            .vetting
            .social_services_details
            .as_deref()
            .unwrap_or("")
            .trim()
            .is_empty()
    {
        errors.insert(
            "socialServicesDetails".to_string(),
            "Please give details of social services involvement".to_string(),
        );
    }
}

fn declaration(form: &ApplicationForm, errors: &mut BTreeMap<String, String>) {
    if !form.consent_to_checks {
        errors.insert(
            "consentToChecks".to_string(),
            "Consent to background checks is required".to_string(),
        );
    }
    if !form.declaration_agreed {
        errors.insert(
            "declarationAgreed".to_string(),
            "You must agree to the declaration".to_string(),
        );
    }
    require(
        errors,
        "signatureName",
        &form.signature_name,
        "Signature name is required",
    );
    if form.signature_date.is_none() {
        errors.insert(
            "signatureDate".to_string(),
            "Signature date is required".to_string(),
        );
    }
}
