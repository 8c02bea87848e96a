//! Record store tests against SQLite

use arms_common::db::{
    append_semester, count_students, create_schema, init_database, insert_student, load_student,
    replace_semester, search_students, StudentFilter,
};
use arms_common::{Semester, Student, Subject};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tempfile::TempDir;

async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    create_schema(&pool).await.unwrap();
    pool
}

fn subject(code: &str, total: f64, grade: &str) -> Subject {
    Subject {
        paper_id: format!("P{}", code),
        paper_code: code.to_string(),
        paper_name: format!("Paper {}", code),
        kind: Some("T".to_string()),
        credits: if total > 39.0 { 4 } else { 0 },
        internal: 20.0,
        external: total - 20.0,
        total,
        grade: grade.to_string(),
        backlog: total <= 39.0,
        reappear: false,
    }
}

fn semester(sem: u32, subjects: Vec<Subject>) -> Semester {
    Semester {
        sem,
        subject_count: subjects.len() as u32,
        total_marks: subjects.iter().map(|s| s.total).sum(),
        max_marks: 100 * subjects.len() as u32,
        total_credits: subjects.iter().map(|s| s.credits).sum(),
        max_credits: 4 * subjects.len() as u32,
        total_credit_marks: subjects.iter().map(|s| s.credit_marks()).sum(),
        max_credit_marks: 400 * subjects.len() as u32,
        percentage: 55.0,
        credit_percentage: 40.0,
        sgpa: 5.0,
        subjects,
    }
}

fn student(enrollment: &str, name: &str, semesters: Vec<Semester>) -> Student {
    Student {
        enrollment: enrollment.to_string(),
        name: name.to_string(),
        sid: None,
        scheme_id: Some("SCH1".to_string()),
        inst_code: Some(967),
        batch: "2023".to_string(),
        prg_code: Some("020".to_string()),
        programme: "BCA".to_string(),
        semesters,
    }
}

#[tokio::test]
async fn insert_and_load_round_trip_keeps_order() {
    let pool = memory_pool().await;
    let expected = student(
        "01196702023",
        "Asha Verma",
        vec![semester(
            1,
            vec![subject("ZZ9", 80.0, "O"), subject("AA1", 30.0, "F"), subject("MM5", 61.0, "A")],
        )],
    );

    let mut conn = pool.acquire().await.unwrap();
    insert_student(&mut conn, &expected).await.unwrap();
    let loaded = load_student(&mut conn, "01196702023").await.unwrap().unwrap();

    assert_eq!(loaded, expected);
    assert!(load_student(&mut conn, "00000000000").await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_enrollment_is_rejected() {
    let pool = memory_pool().await;
    let mut conn = pool.acquire().await.unwrap();

    insert_student(&mut conn, &student("01196702023", "Asha", vec![])).await.unwrap();
    let err = insert_student(&mut conn, &student("01196702023", "Asha", vec![])).await;

    assert!(matches!(err, Err(arms_common::Error::Database(_))));
    assert_eq!(count_students(&mut conn).await.unwrap(), 1);
}

#[tokio::test]
async fn append_places_semester_last() {
    let pool = memory_pool().await;
    let mut conn = pool.acquire().await.unwrap();

    insert_student(
        &mut conn,
        &student("01196702023", "Asha", vec![semester(1, vec![subject("CS1", 70.0, "A")])]),
    )
    .await
    .unwrap();

    let seq = append_semester(&mut conn, "01196702023", &semester(2, vec![subject("CS2", 45.0, "C")]))
        .await
        .unwrap();
    assert_eq!(seq, 1);
    let seq = append_semester(&mut conn, "01196702023", &semester(1, vec![subject("CS1", 75.0, "A")]))
        .await
        .unwrap();
    assert_eq!(seq, 2);

    let loaded = load_student(&mut conn, "01196702023").await.unwrap().unwrap();
    let sems: Vec<u32> = loaded.semesters.iter().map(|s| s.sem).collect();
    assert_eq!(sems, vec![1, 2, 1]);
    assert_eq!(loaded.semester_positions(1), vec![0, 2]);
}

#[tokio::test]
async fn replace_overwrites_one_semester() {
    let pool = memory_pool().await;
    let mut conn = pool.acquire().await.unwrap();

    insert_student(
        &mut conn,
        &student(
            "01196702023",
            "Asha",
            vec![
                semester(1, vec![subject("CS1", 80.0, "O"), subject("CS2", 30.0, "F")]),
                semester(2, vec![subject("CS3", 70.0, "A")]),
            ],
        ),
    )
    .await
    .unwrap();

    let mut patched = semester(1, vec![subject("CS1", 80.0, "O"), subject("CS2", 65.0, "A")]);
    patched.subjects[1].reappear = true;
    patched.sgpa = 9.0;
    replace_semester(&mut conn, "01196702023", 0, &patched).await.unwrap();

    let loaded = load_student(&mut conn, "01196702023").await.unwrap().unwrap();
    assert_eq!(loaded.semesters[0], patched);
    assert_eq!(loaded.semesters[1].sem, 2);
    assert_eq!(loaded.semesters[1].subjects[0].paper_code, "CS3");
}

#[tokio::test]
async fn replace_missing_position_is_not_found() {
    let pool = memory_pool().await;
    let mut conn = pool.acquire().await.unwrap();
    insert_student(&mut conn, &student("01196702023", "Asha", vec![])).await.unwrap();

    let err = replace_semester(&mut conn, "01196702023", 3, &semester(1, vec![])).await;
    assert!(matches!(err, Err(arms_common::Error::NotFound(_))));
}

#[tokio::test]
async fn search_filters_combine() {
    let pool = memory_pool().await;
    let mut conn = pool.acquire().await.unwrap();

    let mut bba = student("01317702022", "ASHA SINGH", vec![]);
    bba.prg_code = Some("017".to_string());
    bba.batch = "2022".to_string();
    for s in [
        student("01196702023", "Asha Verma", vec![]),
        student("01296702023", "Rahul Kumar", vec![]),
        bba,
    ] {
        insert_student(&mut conn, &s).await.unwrap();
    }

    let by_name = search_students(
        &mut conn,
        &StudentFilter {
            name_contains: Some("asha".to_string()),
            ..StudentFilter::default()
        },
    )
    .await
    .unwrap();
    let enrollments: Vec<&str> = by_name.iter().map(|s| s.enrollment.as_str()).collect();
    assert_eq!(enrollments, vec!["01196702023", "01317702022"]);

    let by_programme = search_students(
        &mut conn,
        &StudentFilter {
            prg_code: Some("020".to_string()),
            batch: Some("2023".to_string()),
            ..StudentFilter::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(by_programme.len(), 2);

    let everyone = search_students(&mut conn, &StudentFilter::default()).await.unwrap();
    assert_eq!(everyone.len(), 3);
}

#[tokio::test]
async fn init_database_creates_file_and_reopens() {
    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("data").join("arms.db");

    let pool = init_database(&db_path).await.unwrap();
    {
        let mut conn = pool.acquire().await.unwrap();
        insert_student(&mut conn, &student("01196702023", "Asha", vec![])).await.unwrap();
    }
    pool.close().await;
    assert!(db_path.exists());

    let reopened = init_database(&db_path).await.unwrap();
    let mut conn = reopened.acquire().await.unwrap();
    assert_eq!(count_students(&mut conn).await.unwrap(), 1);
}
