//! Database initialization
//!
//! Creates the record store schema on first run and reopens it afterwards.
//! Schema creation is idempotent.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL lets the review service read while a batch holds the write lock
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create every record table (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_students_table(pool).await?;
    create_semesters_table(pool).await?;
    create_subjects_table(pool).await?;

    Ok(())
}

pub async fn create_students_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS students (
            enrollment TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            sid TEXT,
            scheme_id TEXT,
            inst_code INTEGER,
            batch TEXT NOT NULL,
            prg_code TEXT,
            programme TEXT NOT NULL,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_students_name ON students(name)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_students_programme_batch ON students(prg_code, batch)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Semesters are ordered per student by `seq` (insertion order)
pub async fn create_semesters_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS semesters (
            enrollment TEXT NOT NULL REFERENCES students(enrollment) ON DELETE CASCADE,
            seq INTEGER NOT NULL,
            sem INTEGER NOT NULL,
            subject_count INTEGER NOT NULL,
            total_marks REAL NOT NULL,
            max_marks INTEGER NOT NULL,
            total_credits INTEGER NOT NULL,
            max_credits INTEGER NOT NULL,
            total_credit_marks REAL NOT NULL,
            max_credit_marks INTEGER NOT NULL,
            percentage REAL NOT NULL,
            credit_percentage REAL NOT NULL,
            sgpa REAL NOT NULL,
            PRIMARY KEY (enrollment, seq)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_subjects_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS subjects (
            enrollment TEXT NOT NULL,
            semester_seq INTEGER NOT NULL,
            seq INTEGER NOT NULL,
            paper_id TEXT NOT NULL,
            paper_code TEXT NOT NULL,
            paper_name TEXT NOT NULL,
            type TEXT,
            credits INTEGER NOT NULL,
            internal REAL NOT NULL DEFAULT 0,
            external REAL NOT NULL DEFAULT 0,
            total REAL NOT NULL DEFAULT 0,
            grade TEXT NOT NULL DEFAULT '',
            backlog INTEGER NOT NULL DEFAULT 0,
            reappear INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (enrollment, semester_seq, seq),
            FOREIGN KEY (enrollment, semester_seq)
                REFERENCES semesters(enrollment, seq) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
