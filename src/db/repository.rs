//! Database repository for all data operations.
//!
//! Uses prepared statements and transactions for data integrity. The
//! approval/conversion pipeline runs as a single transaction so a failure
//! mid-fan-out leaves the application unconverted.

use chrono::{NaiveDate, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{
    Application, ApplicationForm, ApplicationStatus, CompliancePerson, ConversionOutcome,
    CreatePersonRequest, DbsStatus, Draft, Employee, EmploymentStatus, FormKind, FormStatus,
    FormSubmission, PersonRole, UpdateDbsRequest, employee_fields_from,
};

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== APPLICATION OPERATIONS ====================

    /// List all applications, newest first.
    pub async fn list_applications(&self) -> Result<Vec<Application>, AppError> {
        let rows = sqlx::query(
            "SELECT id, form, status, created_at, updated_at FROM applications ORDER BY created_at DESC"
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(application_from_row).collect())
    }

    /// Get an application by ID.
    pub async fn get_application(&self, id: &str) -> Result<Option<Application>, AppError> {
        let row = sqlx::query(
            "SELECT id, form, status, created_at, updated_at FROM applications WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(application_from_row))
    }

    /// Create a pending application from a validated form, exactly once per
    /// submission token.
    ///
    /// One transaction: the applications row, a spent application-kind form
    /// record keyed by the submission token, the draft cleanup, and the
    /// fan-out of declared household members into compliance person records.
    /// A resubmission under the same token hits the UNIQUE constraint on
    /// form_token and rolls everything back.
    pub async fn create_application(
        &self,
        form: &ApplicationForm,
        draft_token: Option<&str>,
    ) -> Result<Application, AppError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let form_json = serde_json::to_string(form)?;
        let applicant_name = format!("{} {}", form.first_name.trim(), form.last_name.trim());
        let form_token = draft_token
            .map(String::from)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO applications (id, form, applicant_name, email, status, created_at, updated_at) VALUES (?, ?, ?, ?, 'pending', ?, ?)"
        )
        .bind(&id)
        .bind(&form_json)
        .bind(&applicant_name)
        .bind(&form.email)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        let recorded = sqlx::query(
            r#"INSERT INTO form_submissions (
                id, form_token, kind, application_id, status, response_data,
                created_at, submitted_at
            ) VALUES (?, ?, 'application', ?, 'submitted', ?, ?, ?)"#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&form_token)
        .bind(&id)
        .bind(&form_json)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await;

        if let Err(err) = recorded {
            if is_unique_violation(&err) {
                return Err(AppError::AlreadySubmitted(format!(
                    "Application for token {} has already been submitted",
                    form_token
                )));
            }
            return Err(err.into());
        }

        sqlx::query("DELETE FROM drafts WHERE form_token = ?")
            .bind(&form_token)
            .execute(&mut *tx)
            .await?;

        for member in &form.household_members {
            sqlx::query(
                r#"INSERT INTO compliance_people (
                    id, role, application_id, first_name, last_name, date_of_birth,
                    relationship, dbs_status, created_at, updated_at
                ) VALUES (?, 'household_member', ?, ?, ?, ?, ?, 'not_requested', ?, ?)"#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&id)
            .bind(&member.first_name)
            .bind(&member.last_name)
            .bind(member.date_of_birth)
            .bind(&member.relationship)
            .bind(&now)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(Application {
            id,
            form: form.clone(),
            status: ApplicationStatus::Pending,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Replace an application's form data (admin edits).
    pub async fn update_application(
        &self,
        id: &str,
        form: &ApplicationForm,
    ) -> Result<Application, AppError> {
        let existing = self
            .get_application(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Application {} not found", id)))?;

        let now = Utc::now().to_rfc3339();
        let form_json = serde_json::to_string(form)?;
        let applicant_name = format!("{} {}", form.first_name.trim(), form.last_name.trim());

        sqlx::query(
            "UPDATE applications SET form = ?, applicant_name = ?, email = ?, updated_at = ? WHERE id = ?"
        )
        .bind(&form_json)
        .bind(&applicant_name)
        .bind(&form.email)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(Application {
            id: id.to_string(),
            form: form.clone(),
            status: existing.status,
            created_at: existing.created_at,
            updated_at: now,
        })
    }

    /// Reject a pending application. Rejection of a non-pending application
    /// is a status machine violation.
    pub async fn reject_application(&self, id: &str) -> Result<Application, AppError> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE applications SET status = 'rejected', updated_at = ? WHERE id = ? AND status = 'pending'"
        )
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get_application(id).await? {
                Some(existing) => Err(AppError::InvalidTransition(format!(
                    "Application {} is {}, only pending applications can be rejected",
                    id,
                    existing.status.as_str()
                ))),
                None => Err(AppError::NotFound(format!("Application {} not found", id))),
            };
        }

        self.get_application(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Application {} not found", id)))
    }

    /// Approve an application and convert it into an employee aggregate.
    ///
    /// Idempotent: an already-converted application returns its existing
    /// employee with `created: false`. The whole pipeline is one transaction;
    /// the UNIQUE constraint on employees.application_id closes the
    /// check-then-act race under concurrent approval.
    pub async fn approve_and_convert(
        &self,
        id: &str,
        start_date: NaiveDate,
    ) -> Result<ConversionOutcome, AppError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "SELECT id, form, status, created_at, updated_at FROM applications WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let application = row
            .as_ref()
            .map(application_from_row)
            .ok_or_else(|| AppError::NotFound(format!("Application {} not found", id)))?;

        match application.status {
            ApplicationStatus::Rejected => {
                return Err(AppError::InvalidTransition(format!(
                    "Application {} was rejected and cannot be approved",
                    id
                )));
            }
            ApplicationStatus::Approved => {
                let existing = sqlx::query("SELECT id FROM employees WHERE application_id = ?")
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await?;
                if let Some(row) = existing {
                    return Ok(ConversionOutcome {
                        employee_id: row.get("id"),
                        created: false,
                        people_copied: 0,
                    });
                }
                // Approved but unconverted: an earlier run failed before
                // commit, so convert now.
            }
            ApplicationStatus::Pending => {}
        }

        let now = Utc::now().to_rfc3339();
        let employee_id = Uuid::new_v4().to_string();
        let employee = employee_fields_from(&application, start_date);

        let insert = sqlx::query(
            r#"INSERT INTO employees (
                id, application_id, first_name, last_name, date_of_birth, ni_number,
                email, phone, current_address, premises_description, capacity,
                qualifications, employment_status, employment_start_date, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&employee_id)
        .bind(&employee.application_id)
        .bind(&employee.first_name)
        .bind(&employee.last_name)
        .bind(employee.date_of_birth)
        .bind(&employee.ni_number)
        .bind(&employee.email)
        .bind(&employee.phone)
        .bind(serde_json::to_string(&employee.current_address)?)
        .bind(&employee.premises_description)
        .bind(serde_json::to_string(&employee.capacity)?)
        .bind(serde_json::to_string(&employee.qualifications)?)
        .bind(employee.employment_status.as_str())
        .bind(employee.employment_start_date)
        .bind(&now)
        .execute(&mut *tx)
        .await;

        if let Err(err) = insert {
            if is_unique_violation(&err) {
                // Lost the race: another approval converted this application
                // first. Surface its employee as the idempotent result.
                drop(tx);
                let existing = self.get_employee_by_application(id).await?.ok_or_else(|| {
                    AppError::Internal(format!(
                        "Employee for application {} vanished after conflict",
                        id
                    ))
                })?;
                return Ok(ConversionOutcome {
                    employee_id: existing.id,
                    created: false,
                    people_copied: 0,
                });
            }
            return Err(err.into());
        }

        sqlx::query("UPDATE applications SET status = 'approved', updated_at = ? WHERE id = ?")
            .bind(&now)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        // Fan out: copy, not move. The application-side records stay for audit.
        let people = sqlx::query(
            r#"SELECT role, first_name, last_name, date_of_birth, email, relationship,
                      dbs_status, dbs_certificate_number, dbs_certificate_date,
                      dbs_certificate_expiry, reminder_count, last_reminder_at
               FROM compliance_people WHERE application_id = ?"#,
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        for person in &people {
            sqlx::query(
                r#"INSERT INTO compliance_people (
                    id, role, employee_id, first_name, last_name, date_of_birth, email,
                    relationship, dbs_status, dbs_certificate_number, dbs_certificate_date,
                    dbs_certificate_expiry, reminder_count, last_reminder_at,
                    created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(person.get::<String, _>("role"))
            .bind(&employee_id)
            .bind(person.get::<String, _>("first_name"))
            .bind(person.get::<String, _>("last_name"))
            .bind(person.get::<Option<NaiveDate>, _>("date_of_birth"))
            .bind(person.get::<Option<String>, _>("email"))
            .bind(person.get::<Option<String>, _>("relationship"))
            .bind(person.get::<String, _>("dbs_status"))
            .bind(person.get::<Option<String>, _>("dbs_certificate_number"))
            .bind(person.get::<Option<NaiveDate>, _>("dbs_certificate_date"))
            .bind(person.get::<Option<NaiveDate>, _>("dbs_certificate_expiry"))
            .bind(person.get::<i64, _>("reminder_count"))
            .bind(person.get::<Option<String>, _>("last_reminder_at"))
            .bind(&now)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(ConversionOutcome {
            employee_id,
            created: true,
            people_copied: people.len(),
        })
    }

    // ==================== EMPLOYEE OPERATIONS ====================

    /// List all employees.
    pub async fn list_employees(&self) -> Result<Vec<Employee>, AppError> {
        let rows = sqlx::query(
            r#"SELECT id, application_id, first_name, last_name, date_of_birth, ni_number,
                      email, phone, current_address, premises_description, capacity,
                      qualifications, employment_status, employment_start_date, created_at
               FROM employees ORDER BY created_at DESC"#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(employee_from_row).collect())
    }

    /// Get an employee by ID.
    pub async fn get_employee(&self, id: &str) -> Result<Option<Employee>, AppError> {
        let row = sqlx::query(
            r#"SELECT id, application_id, first_name, last_name, date_of_birth, ni_number,
                      email, phone, current_address, premises_description, capacity,
                      qualifications, employment_status, employment_start_date, created_at
               FROM employees WHERE id = ?"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(employee_from_row))
    }

    /// Get the employee converted from a given application, if any.
    pub async fn get_employee_by_application(
        &self,
        application_id: &str,
    ) -> Result<Option<Employee>, AppError> {
        let row = sqlx::query(
            r#"SELECT id, application_id, first_name, last_name, date_of_birth, ni_number,
                      email, phone, current_address, premises_description, capacity,
                      qualifications, employment_status, employment_start_date, created_at
               FROM employees WHERE application_id = ?"#,
        )
        .bind(application_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(employee_from_row))
    }

    // ==================== COMPLIANCE PERSON OPERATIONS ====================

    /// Create a compliance person under an application or an employee.
    pub async fn create_person(
        &self,
        request: &CreatePersonRequest,
    ) -> Result<CompliancePerson, AppError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"INSERT INTO compliance_people (
                id, role, application_id, employee_id, first_name, last_name,
                date_of_birth, email, relationship, dbs_status, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'not_requested', ?, ?)"#,
        )
        .bind(&id)
        .bind(request.role.as_str())
        .bind(&request.application_id)
        .bind(&request.employee_id)
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(request.date_of_birth)
        .bind(&request.email)
        .bind(&request.relationship)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(CompliancePerson {
            id,
            role: request.role,
            application_id: request.application_id.clone(),
            employee_id: request.employee_id.clone(),
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            date_of_birth: request.date_of_birth,
            email: request.email.clone(),
            relationship: request.relationship.clone(),
            dbs_status: DbsStatus::NotRequested,
            dbs_certificate_number: None,
            dbs_certificate_date: None,
            dbs_certificate_expiry: None,
            reminder_count: 0,
            last_reminder_at: None,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Get a compliance person by ID.
    pub async fn get_person(&self, id: &str) -> Result<Option<CompliancePerson>, AppError> {
        let row = sqlx::query(&format!(
            "{} WHERE id = ?",
            SELECT_PERSON
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(person_from_row))
    }

    /// List people linked to an application.
    pub async fn list_people_by_application(
        &self,
        application_id: &str,
    ) -> Result<Vec<CompliancePerson>, AppError> {
        let rows = sqlx::query(&format!(
            "{} WHERE application_id = ? ORDER BY created_at",
            SELECT_PERSON
        ))
        .bind(application_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(person_from_row).collect())
    }

    /// List people linked to an employee.
    pub async fn list_people_by_employee(
        &self,
        employee_id: &str,
    ) -> Result<Vec<CompliancePerson>, AppError> {
        let rows = sqlx::query(&format!(
            "{} WHERE employee_id = ? ORDER BY created_at",
            SELECT_PERSON
        ))
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(person_from_row).collect())
    }

    /// Update a person's DBS fields, enforcing the lifecycle.
    ///
    /// Certificate fields are overwritten when provided, never cleared.
    pub async fn update_person_dbs(
        &self,
        id: &str,
        request: &UpdateDbsRequest,
    ) -> Result<CompliancePerson, AppError> {
        let existing = self
            .get_person(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Person {} not found", id)))?;

        if !existing.dbs_status.can_transition_to(request.dbs_status) {
            return Err(AppError::InvalidTransition(format!(
                "DBS status cannot move from {} to {}",
                existing.dbs_status.as_str(),
                request.dbs_status.as_str()
            )));
        }

        let now = Utc::now().to_rfc3339();
        let certificate_number = request
            .dbs_certificate_number
            .clone()
            .or(existing.dbs_certificate_number.clone());
        let certificate_date = request
            .dbs_certificate_date
            .or(existing.dbs_certificate_date);
        let certificate_expiry = request
            .dbs_certificate_expiry
            .or(existing.dbs_certificate_expiry);

        sqlx::query(
            r#"UPDATE compliance_people SET
                dbs_status = ?, dbs_certificate_number = ?, dbs_certificate_date = ?,
                dbs_certificate_expiry = ?, updated_at = ?
            WHERE id = ?"#,
        )
        .bind(request.dbs_status.as_str())
        .bind(&certificate_number)
        .bind(certificate_date)
        .bind(certificate_expiry)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(CompliancePerson {
            dbs_status: request.dbs_status,
            dbs_certificate_number: certificate_number,
            dbs_certificate_date: certificate_date,
            dbs_certificate_expiry: certificate_expiry,
            updated_at: now,
            ..existing
        })
    }

    /// Delete a compliance person.
    pub async fn delete_person(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM compliance_people WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Person {} not found", id)));
        }
        Ok(())
    }

    /// Record that a reminder/request was sent for this person.
    pub async fn record_reminder(&self, id: &str) -> Result<(), AppError> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE compliance_people SET reminder_count = reminder_count + 1, last_reminder_at = ?, updated_at = ? WHERE id = ?"
        )
        .bind(&now)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Person {} not found", id)));
        }
        Ok(())
    }

    // ==================== FORM SUBMISSION OPERATIONS ====================

    /// Create a pending form submission record with a fresh token.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_form_submission(
        &self,
        kind: FormKind,
        application_id: Option<&str>,
        employee_id: Option<&str>,
        person_id: Option<&str>,
        recipient_email: Option<&str>,
        authority_name: Option<&str>,
    ) -> Result<FormSubmission, AppError> {
        let id = Uuid::new_v4().to_string();
        let form_token = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"INSERT INTO form_submissions (
                id, form_token, kind, application_id, employee_id, person_id,
                recipient_email, authority_name, status, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?)"#,
        )
        .bind(&id)
        .bind(&form_token)
        .bind(kind.as_str())
        .bind(application_id)
        .bind(employee_id)
        .bind(person_id)
        .bind(recipient_email)
        .bind(authority_name)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(FormSubmission {
            id,
            form_token,
            kind,
            application_id: application_id.map(String::from),
            employee_id: employee_id.map(String::from),
            person_id: person_id.map(String::from),
            recipient_email: recipient_email.map(String::from),
            authority_name: authority_name.map(String::from),
            status: FormStatus::Pending,
            response_data: None,
            created_at: now,
            submitted_at: None,
        })
    }

    /// Get a form submission by its token.
    pub async fn get_form_by_token(
        &self,
        token: &str,
    ) -> Result<Option<FormSubmission>, AppError> {
        let row = sqlx::query(&format!("{} WHERE form_token = ?", SELECT_FORM))
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(form_from_row))
    }

    /// List form submissions raised for an application.
    pub async fn list_forms_by_application(
        &self,
        application_id: &str,
    ) -> Result<Vec<FormSubmission>, AppError> {
        let rows = sqlx::query(&format!(
            "{} WHERE application_id = ? ORDER BY created_at",
            SELECT_FORM
        ))
        .bind(application_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(form_from_row).collect())
    }

    /// List form submissions raised for a person.
    pub async fn list_forms_by_person(
        &self,
        person_id: &str,
    ) -> Result<Vec<FormSubmission>, AppError> {
        let rows = sqlx::query(&format!(
            "{} WHERE person_id = ? ORDER BY created_at",
            SELECT_FORM
        ))
        .bind(person_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(form_from_row).collect())
    }

    /// Mark a satellite form submitted, exactly once.
    ///
    /// The conditional UPDATE on status is the single-use guard: a spent
    /// token is rejected and its response_data left untouched. The draft for
    /// the token is cleared in the same transaction.
    pub async fn submit_form(
        &self,
        token: &str,
        answers: &serde_json::Value,
    ) -> Result<FormSubmission, AppError> {
        let now = Utc::now().to_rfc3339();
        let answers_json = serde_json::to_string(answers)?;

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE form_submissions SET status = 'submitted', response_data = ?, submitted_at = ? WHERE form_token = ? AND status = 'pending'"
        )
        .bind(&answers_json)
        .bind(&now)
        .bind(token)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get_form_by_token(token).await? {
                Some(_) => Err(AppError::AlreadySubmitted(format!(
                    "Form {} has already been submitted",
                    token
                ))),
                None => Err(AppError::NotFound(format!("Form {} not found", token))),
            };
        }

        sqlx::query("DELETE FROM drafts WHERE form_token = ?")
            .bind(token)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.get_form_by_token(token)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Form {} not found", token)))
    }

    // ==================== DRAFT OPERATIONS ====================

    /// Upsert a draft, last-write-wins by strictly increasing revision.
    pub async fn save_draft(
        &self,
        token: &str,
        revision: i64,
        answers: &serde_json::Value,
    ) -> Result<Draft, AppError> {
        let now = Utc::now().to_rfc3339();
        let answers_json = serde_json::to_string(answers)?;

        let result = sqlx::query(
            r#"INSERT INTO drafts (form_token, revision, answers, updated_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT(form_token) DO UPDATE SET
                   revision = excluded.revision,
                   answers = excluded.answers,
                   updated_at = excluded.updated_at
               WHERE excluded.revision > drafts.revision"#,
        )
        .bind(token)
        .bind(revision)
        .bind(&answers_json)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let current = self
                .get_draft(token)
                .await?
                .map(|d| d.revision)
                .unwrap_or(0);
            return Err(AppError::StaleDraft {
                message: format!(
                    "Draft revision {} is not newer than stored revision {}",
                    revision, current
                ),
                current_revision: current,
            });
        }

        Ok(Draft {
            form_token: token.to_string(),
            revision,
            answers: answers.clone(),
            updated_at: now,
        })
    }

    /// Get a draft by token.
    pub async fn get_draft(&self, token: &str) -> Result<Option<Draft>, AppError> {
        let row = sqlx::query(
            "SELECT form_token, revision, answers, updated_at FROM drafts WHERE form_token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| {
            let answers_str: String = row.get("answers");
            Draft {
                form_token: row.get("form_token"),
                revision: row.get("revision"),
                answers: serde_json::from_str(&answers_str).unwrap_or(serde_json::Value::Null),
                updated_at: row.get("updated_at"),
            }
        }))
    }
}

const SELECT_PERSON: &str = r#"SELECT id, role, application_id, employee_id, first_name, last_name,
           date_of_birth, email, relationship, dbs_status, dbs_certificate_number,
           dbs_certificate_date, dbs_certificate_expiry, reminder_count,
           last_reminder_at, created_at, updated_at
    FROM compliance_people"#;

const SELECT_FORM: &str = r#"SELECT id, form_token, kind, application_id, employee_id, person_id,
           recipient_email, authority_name, status, response_data, created_at, submitted_at
    FROM form_submissions"#;

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|e| e.is_unique_violation())
        .unwrap_or(false)
}

// Helper functions for row conversion

fn application_from_row(row: &sqlx::sqlite::SqliteRow) -> Application {
    let form_str: String = row.get("form");
    let status_str: String = row.get("status");
    Application {
        id: row.get("id"),
        form: serde_json::from_str(&form_str).unwrap_or_default(),
        status: ApplicationStatus::parse(&status_str).unwrap_or(ApplicationStatus::Pending),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn employee_from_row(row: &sqlx::sqlite::SqliteRow) -> Employee {
    let address_str: String = row.get("current_address");
    let capacity_str: String = row.get("capacity");
    let qualifications_str: String = row.get("qualifications");
    let status_str: String = row.get("employment_status");
    Employee {
        id: row.get("id"),
        application_id: row.get("application_id"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        date_of_birth: row.get("date_of_birth"),
        ni_number: row.get("ni_number"),
        email: row.get("email"),
        phone: row.get("phone"),
        current_address: serde_json::from_str(&address_str).unwrap_or_default(),
        premises_description: row.get("premises_description"),
        capacity: serde_json::from_str(&capacity_str).unwrap_or_default(),
        qualifications: serde_json::from_str(&qualifications_str).unwrap_or_default(),
        employment_status: EmploymentStatus::parse(&status_str)
            .unwrap_or(EmploymentStatus::Active),
        employment_start_date: row.get("employment_start_date"),
        created_at: row.get("created_at"),
    }
}

fn person_from_row(row: &sqlx::sqlite::SqliteRow) -> CompliancePerson {
    let role_str: String = row.get("role");
    let dbs_str: String = row.get("dbs_status");
    CompliancePerson {
        id: row.get("id"),
        role: PersonRole::parse(&role_str).unwrap_or(PersonRole::HouseholdMember),
        application_id: row.get("application_id"),
        employee_id: row.get("employee_id"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        date_of_birth: row.get("date_of_birth"),
        email: row.get("email"),
        relationship: row.get("relationship"),
        dbs_status: DbsStatus::parse(&dbs_str).unwrap_or(DbsStatus::NotRequested),
        dbs_certificate_number: row.get("dbs_certificate_number"),
        dbs_certificate_date: row.get("dbs_certificate_date"),
        dbs_certificate_expiry: row.get("dbs_certificate_expiry"),
        reminder_count: row.get("reminder_count"),
        last_reminder_at: row.get("last_reminder_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn form_from_row(row: &sqlx::sqlite::SqliteRow) -> FormSubmission {
    let kind_str: String = row.get("kind");
    let status_str: String = row.get("status");
    let response_str: Option<String> = row.get("response_data");
    FormSubmission {
        id: row.get("id"),
        form_token: row.get("form_token"),
        kind: FormKind::parse(&kind_str).unwrap_or(FormKind::Application),
        application_id: row.get("application_id"),
        employee_id: row.get("employee_id"),
        person_id: row.get("person_id"),
        recipient_email: row.get("recipient_email"),
        authority_name: row.get("authority_name"),
        status: FormStatus::parse(&status_str).unwrap_or(FormStatus::Pending),
        response_data: response_str.and_then(|s| serde_json::from_str(&s).ok()),
        created_at: row.get("created_at"),
        submitted_at: row.get("submitted_at"),
    }
}
