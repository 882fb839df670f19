//! Database module for SQLite persistence.
//!
//! SQLite is the source of truth for all application data.

mod repository;

pub use repository::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // Run embedded migrations
    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS applications (
            id TEXT PRIMARY KEY,
            form TEXT NOT NULL,
            applicant_name TEXT NOT NULL,
            email TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // The UNIQUE constraint on application_id is the storage-level guard for
    // exactly-once conversion.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS employees (
            id TEXT PRIMARY KEY,
            application_id TEXT NOT NULL UNIQUE,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            date_of_birth TEXT,
            ni_number TEXT NOT NULL,
            email TEXT NOT NULL,
            phone TEXT NOT NULL,
            current_address TEXT NOT NULL,
            premises_description TEXT NOT NULL,
            capacity TEXT NOT NULL,
            qualifications TEXT NOT NULL,
            employment_status TEXT NOT NULL DEFAULT 'active',
            employment_start_date TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Household members, assistants and co-childminders share one table; a
    // person belongs to exactly one of an application or an employee.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS compliance_people (
            id TEXT PRIMARY KEY,
            role TEXT NOT NULL,
            application_id TEXT,
            employee_id TEXT,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            date_of_birth TEXT,
            email TEXT,
            relationship TEXT,
            dbs_status TEXT NOT NULL DEFAULT 'not_requested',
            dbs_certificate_number TEXT,
            dbs_certificate_date TEXT,
            dbs_certificate_expiry TEXT,
            reminder_count INTEGER NOT NULL DEFAULT 0,
            last_reminder_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            CHECK ((application_id IS NULL) <> (employee_id IS NULL))
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS form_submissions (
            id TEXT PRIMARY KEY,
            form_token TEXT NOT NULL UNIQUE,
            kind TEXT NOT NULL,
            application_id TEXT,
            employee_id TEXT,
            person_id TEXT,
            recipient_email TEXT,
            authority_name TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            response_data TEXT,
            created_at TEXT NOT NULL,
            submitted_at TEXT
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS drafts (
            form_token TEXT PRIMARY KEY,
            revision INTEGER NOT NULL,
            answers TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for common queries
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_applications_status ON applications(status);
        CREATE INDEX IF NOT EXISTS idx_people_application ON compliance_people(application_id);
        CREATE INDEX IF NOT EXISTS idx_people_employee ON compliance_people(employee_id);
        CREATE INDEX IF NOT EXISTS idx_forms_application ON form_submissions(application_id);
        CREATE INDEX IF NOT EXISTS idx_forms_person ON form_submissions(person_id);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
