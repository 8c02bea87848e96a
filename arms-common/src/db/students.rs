//! Student record persistence
//!
//! Every function takes a `&mut SqliteConnection` so callers can run it either
//! on a pooled connection or inside a batch transaction (`&mut *tx`).

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::records::{Semester, Student, Subject};
use crate::Result;

/// Selection criteria for [`search_students`]
#[derive(Debug, Clone, Default)]
pub struct StudentFilter {
    /// Case-insensitive substring of the student's name
    pub name_contains: Option<String>,
    pub prg_code: Option<String>,
    pub batch: Option<String>,
}

/// Load a student with every semester and subject, by enrollment
pub async fn load_student(conn: &mut SqliteConnection, enrollment: &str) -> Result<Option<Student>> {
    let row = sqlx::query(
        r#"
        SELECT enrollment, name, sid, scheme_id, inst_code, batch, prg_code, programme
        FROM students
        WHERE enrollment = ?
        "#,
    )
    .bind(enrollment)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(row) => {
            let mut student = student_from_row(&row);
            student.semesters = load_semesters(conn, enrollment).await?;
            Ok(Some(student))
        }
        None => Ok(None),
    }
}

/// Find students matching a filter, ordered by enrollment
pub async fn search_students(conn: &mut SqliteConnection, filter: &StudentFilter) -> Result<Vec<Student>> {
    let rows = sqlx::query(
        r#"
        SELECT enrollment, name, sid, scheme_id, inst_code, batch, prg_code, programme
        FROM students
        WHERE (?1 IS NULL OR instr(lower(name), lower(?1)) > 0)
          AND (?2 IS NULL OR prg_code = ?2)
          AND (?3 IS NULL OR batch = ?3)
        ORDER BY enrollment
        "#,
    )
    .bind(filter.name_contains.as_deref())
    .bind(filter.prg_code.as_deref())
    .bind(filter.batch.as_deref())
    .fetch_all(&mut *conn)
    .await?;

    let mut students = Vec::with_capacity(rows.len());
    for row in rows {
        let mut student = student_from_row(&row);
        student.semesters = load_semesters(conn, &student.enrollment).await?;
        students.push(student);
    }

    Ok(students)
}

/// Insert a new student together with its semesters
pub async fn insert_student(conn: &mut SqliteConnection, student: &Student) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO students (enrollment, name, sid, scheme_id, inst_code, batch, prg_code, programme)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&student.enrollment)
    .bind(&student.name)
    .bind(student.sid.as_deref())
    .bind(student.scheme_id.as_deref())
    .bind(student.inst_code)
    .bind(&student.batch)
    .bind(student.prg_code.as_deref())
    .bind(&student.programme)
    .execute(&mut *conn)
    .await?;

    for (seq, semester) in student.semesters.iter().enumerate() {
        insert_semester(conn, &student.enrollment, seq as i64, semester).await?;
    }

    Ok(())
}

/// Append a semester after the student's existing ones
///
/// Returns the position the semester was stored at.
pub async fn append_semester(conn: &mut SqliteConnection, enrollment: &str, semester: &Semester) -> Result<i64> {
    let seq: i64 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(seq) + 1, 0) FROM semesters WHERE enrollment = ?",
    )
    .bind(enrollment)
    .fetch_one(&mut *conn)
    .await?;

    insert_semester(conn, enrollment, seq, semester).await?;
    touch_student(conn, enrollment).await?;

    Ok(seq)
}

/// Overwrite the semester stored at `seq` (aggregates and subject list)
pub async fn replace_semester(
    conn: &mut SqliteConnection,
    enrollment: &str,
    seq: i64,
    semester: &Semester,
) -> Result<()> {
    let updated = sqlx::query(
        r#"
        UPDATE semesters
        SET sem = ?, subject_count = ?, total_marks = ?, max_marks = ?,
            total_credits = ?, max_credits = ?, total_credit_marks = ?,
            max_credit_marks = ?, percentage = ?, credit_percentage = ?, sgpa = ?
        WHERE enrollment = ? AND seq = ?
        "#,
    )
    .bind(semester.sem)
    .bind(semester.subject_count)
    .bind(semester.total_marks)
    .bind(semester.max_marks)
    .bind(semester.total_credits)
    .bind(semester.max_credits)
    .bind(semester.total_credit_marks)
    .bind(semester.max_credit_marks)
    .bind(semester.percentage)
    .bind(semester.credit_percentage)
    .bind(semester.sgpa)
    .bind(enrollment)
    .bind(seq)
    .execute(&mut *conn)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(crate::Error::NotFound(format!(
            "semester {} of {} (position {})",
            semester.sem, enrollment, seq
        )));
    }

    sqlx::query("DELETE FROM subjects WHERE enrollment = ? AND semester_seq = ?")
        .bind(enrollment)
        .bind(seq)
        .execute(&mut *conn)
        .await?;

    insert_subjects(conn, enrollment, seq, &semester.subjects).await?;
    touch_student(conn, enrollment).await?;

    Ok(())
}

/// Count stored students
pub async fn count_students(conn: &mut SqliteConnection) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM students")
        .fetch_one(conn)
        .await?;
    Ok(count)
}

async fn insert_semester(conn: &mut SqliteConnection, enrollment: &str, seq: i64, semester: &Semester) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO semesters (
            enrollment, seq, sem, subject_count, total_marks, max_marks,
            total_credits, max_credits, total_credit_marks, max_credit_marks,
            percentage, credit_percentage, sgpa
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(enrollment)
    .bind(seq)
    .bind(semester.sem)
    .bind(semester.subject_count)
    .bind(semester.total_marks)
    .bind(semester.max_marks)
    .bind(semester.total_credits)
    .bind(semester.max_credits)
    .bind(semester.total_credit_marks)
    .bind(semester.max_credit_marks)
    .bind(semester.percentage)
    .bind(semester.credit_percentage)
    .bind(semester.sgpa)
    .execute(&mut *conn)
    .await?;

    insert_subjects(conn, enrollment, seq, &semester.subjects).await
}

async fn insert_subjects(
    conn: &mut SqliteConnection,
    enrollment: &str,
    semester_seq: i64,
    subjects: &[Subject],
) -> Result<()> {
    for (seq, subject) in subjects.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO subjects (
                enrollment, semester_seq, seq, paper_id, paper_code, paper_name, type,
                credits, internal, external, total, grade, backlog, reappear
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(enrollment)
        .bind(semester_seq)
        .bind(seq as i64)
        .bind(&subject.paper_id)
        .bind(&subject.paper_code)
        .bind(&subject.paper_name)
        .bind(subject.kind.as_deref())
        .bind(subject.credits)
        .bind(subject.internal)
        .bind(subject.external)
        .bind(subject.total)
        .bind(&subject.grade)
        .bind(subject.backlog)
        .bind(subject.reappear)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

async fn touch_student(conn: &mut SqliteConnection, enrollment: &str) -> Result<()> {
    sqlx::query("UPDATE students SET updated_at = CURRENT_TIMESTAMP WHERE enrollment = ?")
        .bind(enrollment)
        .execute(conn)
        .await?;
    Ok(())
}

async fn load_semesters(conn: &mut SqliteConnection, enrollment: &str) -> Result<Vec<Semester>> {
    let semester_rows = sqlx::query(
        r#"
        SELECT seq, sem, subject_count, total_marks, max_marks, total_credits, max_credits,
               total_credit_marks, max_credit_marks, percentage, credit_percentage, sgpa
        FROM semesters
        WHERE enrollment = ?
        ORDER BY seq
        "#,
    )
    .bind(enrollment)
    .fetch_all(&mut *conn)
    .await?;

    let subject_rows = sqlx::query(
        r#"
        SELECT semester_seq, paper_id, paper_code, paper_name, type, credits,
               internal, external, total, grade, backlog, reappear
        FROM subjects
        WHERE enrollment = ?
        ORDER BY semester_seq, seq
        "#,
    )
    .bind(enrollment)
    .fetch_all(&mut *conn)
    .await?;

    let semesters = semester_rows
        .iter()
        .map(|row| {
            let seq: i64 = row.get("seq");
            let subjects = subject_rows
                .iter()
                .filter(|s| s.get::<i64, _>("semester_seq") == seq)
                .map(subject_from_row)
                .collect();

            Semester {
                sem: row.get("sem"),
                subject_count: row.get("subject_count"),
                subjects,
                total_marks: row.get("total_marks"),
                max_marks: row.get("max_marks"),
                total_credits: row.get("total_credits"),
                max_credits: row.get("max_credits"),
                total_credit_marks: row.get("total_credit_marks"),
                max_credit_marks: row.get("max_credit_marks"),
                percentage: row.get("percentage"),
                credit_percentage: row.get("credit_percentage"),
                sgpa: row.get("sgpa"),
            }
        })
        .collect();

    Ok(semesters)
}

fn student_from_row(row: &SqliteRow) -> Student {
    Student {
        enrollment: row.get("enrollment"),
        name: row.get("name"),
        sid: row.get("sid"),
        scheme_id: row.get("scheme_id"),
        inst_code: row.get("inst_code"),
        batch: row.get("batch"),
        prg_code: row.get("prg_code"),
        programme: row.get("programme"),
        semesters: Vec::new(),
    }
}

fn subject_from_row(row: &SqliteRow) -> Subject {
    Subject {
        paper_id: row.get("paper_id"),
        paper_code: row.get("paper_code"),
        paper_name: row.get("paper_name"),
        kind: row.get("type"),
        credits: row.get("credits"),
        internal: row.get("internal"),
        external: row.get("external"),
        total: row.get("total"),
        grade: row.get("grade"),
        backlog: row.get("backlog"),
        reappear: row.get("reappear"),
    }
}
