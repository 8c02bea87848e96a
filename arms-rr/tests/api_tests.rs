//! Review API integration tests
//!
//! Routes are exercised through the router against a seeded in-memory store.

use arms_common::db::{create_schema, insert_student};
use arms_common::{Semester, Student};
use arms_rr::{build_router, AppState};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;

fn semester(sem: u32, total_marks: f64, sgpa: f64) -> Semester {
    Semester {
        sem,
        subject_count: 0,
        subjects: Vec::new(),
        total_marks,
        max_marks: 300,
        total_credits: 10,
        max_credits: 12,
        total_credit_marks: total_marks * 4.0,
        max_credit_marks: 1200,
        percentage: 0.0,
        credit_percentage: 0.0,
        sgpa,
    }
}

fn student(enrollment: &str, name: &str, prg_code: &str, batch: &str, semesters: Vec<Semester>) -> Student {
    Student {
        enrollment: enrollment.to_string(),
        name: name.to_string(),
        sid: Some(format!("SID{}", enrollment)),
        scheme_id: Some("SCH1".to_string()),
        inst_code: Some(967),
        batch: batch.to_string(),
        prg_code: Some(prg_code.to_string()),
        programme: "PROGRAMME".to_string(),
        semesters,
    }
}

async fn test_app() -> Router {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    create_schema(&pool).await.unwrap();

    let seed = vec![
        student(
            "01196702023",
            "Asha Verma",
            "020",
            "2023",
            vec![semester(1, 210.0, 7.5), semester(2, 240.0, 8.5)],
        ),
        student("01296702023", "Rahul Kumar", "020", "2023", vec![semester(1, 180.0, 6.0)]),
        student("01317702022", "ASHA SINGH", "017", "2022", vec![semester(1, 200.0, 7.0)]),
    ];
    let mut conn = pool.acquire().await.unwrap();
    for s in &seed {
        insert_student(&mut conn, s).await.unwrap();
    }
    drop(conn);

    build_router(AppState::new(pool))
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn student_lookup_returns_summary() {
    let app = test_app().await;

    let (status, body) = get(&app, "/api/v1/student/01196702023").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["statusCode"], 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Fetched data for student with enrollment '01196702023'");

    let data = &body["data"];
    assert_eq!(data["name"], "Asha Verma");
    assert_eq!(data["schemeID"], "SCH1");
    assert_eq!(data["semestersCount"], 2);
    assert_eq!(data["gpa"], 8.0);
    assert_eq!(data["totalMarks"], 450.0);
    assert_eq!(data["maxMarks"], 600);
    assert_eq!(data["totalCredits"], 20);
    assert_eq!(data["maxCreditMarks"], 2400);
    assert_eq!(data["semesters"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn student_lookup_trims_enrollment() {
    let app = test_app().await;

    let (status, body) = get(&app, "/api/v1/student/%2001296702023%20").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["enrollment"], "01296702023");
}

#[tokio::test]
async fn student_lookup_rejects_malformed_enrollment() {
    let app = test_app().await;

    let (status, body) = get(&app, "/api/v1/student/12345").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["statusCode"], 400);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Invalid enrollment number: '12345'");
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn unknown_student_is_not_found() {
    let app = test_app().await;

    let (status, body) = get(&app, "/api/v1/student/09999999999").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "No student found with enrollment number '09999999999'");
}

#[tokio::test]
async fn name_search_is_case_insensitive() {
    let app = test_app().await;

    let (status, body) = get(&app, "/api/v1/student/search-by-name?name=asha").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Found 2 student(s) matching 'asha'.");
    let data = body["data"].as_array().unwrap();
    assert_eq!(data[0]["enrollment"], "01196702023");
    assert_eq!(data[1]["enrollment"], "01317702022");
    assert!(data[0].get("semesters").is_none());
}

#[tokio::test]
async fn name_search_filters_by_programme() {
    let app = test_app().await;

    let (status, body) = get(&app, "/api/v1/student/search-by-name?name=Asha&programme=BBA").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Found 1 student(s) matching 'Asha' in programme 'BBA'.");
    assert_eq!(body["data"][0]["prgCode"], "017");
}

#[tokio::test]
async fn name_search_validates_parameters() {
    let app = test_app().await;

    let (status, body) = get(&app, "/api/v1/student/search-by-name").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "`name` query parameter is required");

    let (status, body) = get(&app, "/api/v1/student/search-by-name?name=asha&programme=mca").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid programme 'mca'. Valid options: bca, bba, bcom");
}

#[tokio::test]
async fn name_search_without_matches_is_not_found() {
    let app = test_app().await;

    let (status, body) = get(&app, "/api/v1/student/search-by-name?name=zed").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "No students found matching 'zed'.");

    let (status, body) = get(&app, "/api/v1/student/search-by-name?name=rahul&programme=bba").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "No students found matching 'rahul' in programme 'bba'.");
}

#[tokio::test]
async fn programme_batch_returns_summaries() {
    let app = test_app().await;

    let (status, body) = get(&app, "/api/v1/programme/BCA/2023").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Fetched 2 student(s) for programme \"bca\" in batch 2023");
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[1]["enrollment"], "01296702023");
    assert_eq!(data[1]["gpa"], 6.0);
    assert_eq!(data[1]["semestersCount"], 1);
}

#[tokio::test]
async fn programme_batch_validation() {
    let app = test_app().await;

    let (status, body) = get(&app, "/api/v1/programme/mca/2023").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid programme mca. Valid options are: bca, bba, bcom");

    let (status, body) = get(&app, "/api/v1/programme/bca/2021").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "No result data available for batch 2021");

    let (status, body) = get(&app, "/api/v1/programme/bca/latest").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "No result data available for batch latest");

    let (status, body) = get(&app, "/api/v1/programme/bca/2024").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "No students found for programme bca in batch 2024");
}

#[tokio::test]
async fn health_endpoint_responds() {
    let app = test_app().await;

    let (status, body) = get(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "arms-rr");
}
