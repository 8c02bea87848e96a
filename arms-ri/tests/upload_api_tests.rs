//! Upload route integration tests
//!
//! Requests go through the full router with a stub gateway standing in for
//! the external parser.

use std::path::Path;
use std::sync::{Arc, Mutex};

use arms_common::config::MergeConfig;
use arms_common::db::{count_students, create_schema, load_student};
use arms_ri::ingest::{
    parse_extraction, BatchWorkspace, Extraction, ExtractionGateway, IngestError, IngestService,
};
use arms_ri::{build_router, AppState};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "arms-test-boundary";

const SCHEME: &str = r#"[{
    "subjects": {
        "CS101": { "paperID": "X1", "paperName": "Programming in C", "credits": 4 },
        "CS102": { "paperID": "X2", "paperName": "Digital Logic", "credits": 4 }
    }
}]"#;

/// Gateway returning canned payloads and remembering the document it saw
struct StubGateway {
    payloads: Option<(String, String)>,
    seen: Mutex<Vec<Vec<u8>>>,
}

impl StubGateway {
    fn returning(records: Value) -> Self {
        Self {
            payloads: Some((records.to_string(), SCHEME.to_string())),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            payloads: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl ExtractionGateway for StubGateway {
    async fn extract(&self, workspace: &BatchWorkspace) -> Result<Extraction, IngestError> {
        let document = tokio::fs::read(workspace.document_path()).await.unwrap();
        self.seen.lock().unwrap().push(document);

        match &self.payloads {
            Some((result, scheme)) => parse_extraction(result, scheme),
            None => Err(IngestError::ExtractionFailed("parser exited with status 1".into())),
        }
    }
}

struct TestApp {
    router: Router,
    pool: SqlitePool,
    gateway: Arc<StubGateway>,
    temp: TempDir,
}

async fn test_app(gateway: StubGateway) -> TestApp {
    test_app_with_limit(gateway, 1024 * 1024).await
}

async fn test_app_with_limit(gateway: StubGateway, max_upload_bytes: usize) -> TestApp {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    create_schema(&pool).await.unwrap();

    let temp = TempDir::new().unwrap();
    let gateway = Arc::new(gateway);
    let ingest = IngestService::new(
        pool.clone(),
        gateway.clone(),
        temp.path().to_path_buf(),
        MergeConfig::default(),
    );
    let router = build_router(AppState::new(pool.clone(), ingest, max_upload_bytes));

    TestApp {
        router,
        pool,
        gateway,
        temp,
    }
}

fn student(enrollment: &str, sem: u32, subjects: Value) -> Value {
    json!({
        "enrollment": enrollment,
        "name": "Asha Verma",
        "sid": "S1001",
        "schemeID": "SCH1",
        "institute": { "instCode": 967 },
        "batch": "2023",
        "prgCode": "020",
        "programme": "BCA",
        "resultHeader": { "sem": sem },
        "subjects": subjects
    })
}

fn multipart_body(field: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"result.pdf\"\r\n",
            field
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/pdf\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload_request(method: Method, uri: &str, field: &str, content: &[u8]) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(field, content)))
        .unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn is_empty_dir(path: &Path) -> bool {
    std::fs::read_dir(path).unwrap().next().is_none()
}

#[tokio::test]
async fn upload_stores_batch_and_returns_records() {
    let records = json!([student(
        "01196702023",
        1,
        json!({ "CS101": { "internal": 20, "external": 60, "total": 80, "totalGrade": "O" } })
    )]);
    let app = test_app(StubGateway::returning(records)).await;

    let (status, body) = send(
        &app.router,
        upload_request(Method::POST, "/api/v1/result/upload", "file", b"%PDF-1.4 result"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["statusCode"], 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Result data processed and saved successfully");
    assert_eq!(body["data"][0]["enrollment"], "01196702023");
    assert_eq!(body["data"][0]["resultHeader"]["sem"], 1);

    assert_eq!(app.gateway.seen.lock().unwrap()[0], b"%PDF-1.4 result".to_vec());

    let mut conn = app.pool.acquire().await.unwrap();
    let stored = load_student(&mut conn, "01196702023").await.unwrap().unwrap();
    assert_eq!(stored.semesters[0].sgpa, 10.0);
    drop(conn);

    assert!(is_empty_dir(app.temp.path()));
}

#[tokio::test]
async fn upload_returns_parser_records_verbatim() {
    let records = json!([{
        "enrollment": "01196702023",
        "name": "Asha Verma",
        "institute": { "instCode": "967", "instName": "Institute of Technology" },
        "batch": 2023,
        "programme": "BCA",
        "resultHeader": { "sem": "1", "examName": "Regular Dec 2023" },
        "subjects": {
            "X1": { "internal": "20", "external": 60, "total": 80, "totalGrade": "O", "credits": 4 }
        }
    }]);
    let app = test_app(StubGateway::returning(records.clone())).await;

    let (status, body) = send(
        &app.router,
        upload_request(Method::POST, "/api/v1/result/upload", "file", b"%PDF"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], records);

    let mut conn = app.pool.acquire().await.unwrap();
    let stored = load_student(&mut conn, "01196702023").await.unwrap().unwrap();
    assert_eq!(stored.inst_code, Some(967));
    assert_eq!(stored.semesters[0].subjects[0].paper_code, "CS101");
}

#[tokio::test]
async fn oversized_upload_is_payload_too_large() {
    let app = test_app_with_limit(StubGateway::returning(json!([])), 256).await;

    let (status, body) = send(
        &app.router,
        upload_request(Method::POST, "/api/v1/result/upload", "file", &[b'x'; 4096]),
    )
    .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["statusCode"], 413);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "File too large");
    assert!(body["data"].is_null());
    assert_eq!(app.gateway.calls(), 0);
}

#[tokio::test]
async fn truncated_multipart_is_file_not_found() {
    let app = test_app(StubGateway::returning(json!([]))).await;

    let mut body = multipart_body("file", b"%PDF");
    body.truncate(body.len() - 12);
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/result/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap();
    let (status, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "File not found");
    assert_eq!(app.gateway.calls(), 0);
}

#[tokio::test]
async fn reappear_upload_reports_update() {
    let app = test_app(StubGateway::returning(json!([student(
        "01196702023",
        1,
        json!({ "CS102": { "total": 30, "totalGrade": "B" } })
    )])))
    .await;

    let (status, body) = send(
        &app.router,
        upload_request(Method::PATCH, "/api/v1/result/reappear/upload", "file", b"%PDF"),
    )
    .await;

    // No stored record to patch: still a successful, empty-effect batch
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Result data processed and updated successfully");
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn missing_file_field_is_bad_request() {
    let app = test_app(StubGateway::returning(json!([]))).await;

    let (status, body) = send(
        &app.router,
        upload_request(Method::POST, "/api/v1/result/upload", "document", b"%PDF"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["statusCode"], 400);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "File not found");
    assert!(body["data"].is_null());
    assert_eq!(app.gateway.calls(), 0);
}

#[tokio::test]
async fn non_multipart_body_is_bad_request() {
    let app = test_app(StubGateway::returning(json!([]))).await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/result/upload")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let (status, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "File not found");
}

#[tokio::test]
async fn extraction_failure_is_internal_error_and_cleans_workspace() {
    let app = test_app(StubGateway::failing()).await;

    let (status, body) = send(
        &app.router,
        upload_request(Method::POST, "/api/v1/result/upload", "file", b"%PDF"),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["statusCode"], 500);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Failed to extract result data");
    assert!(body["data"].is_null());
    assert_eq!(app.gateway.calls(), 1);
    assert!(is_empty_dir(app.temp.path()));
}

#[tokio::test]
async fn unresolvable_subject_fails_transaction() {
    let records = json!([
        student("01196702023", 1, json!({ "CS101": { "total": 80, "totalGrade": "O" } })),
        student("01296702023", 1, json!({ "ZZ404": { "total": 60, "totalGrade": "B" } }))
    ]);
    let app = test_app(StubGateway::returning(records)).await;

    let (status, body) = send(
        &app.router,
        upload_request(Method::POST, "/api/v1/result/upload", "file", b"%PDF"),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Transaction failed");

    let mut conn = app.pool.acquire().await.unwrap();
    assert_eq!(count_students(&mut conn).await.unwrap(), 0);
    drop(conn);

    assert!(is_empty_dir(app.temp.path()));
}

#[tokio::test]
async fn health_reports_last_error() {
    let app = test_app(StubGateway::failing()).await;

    send(
        &app.router,
        upload_request(Method::POST, "/api/v1/result/upload", "file", b"%PDF"),
    )
    .await;

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["module"], "arms-ri");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["students"], 0);
    assert!(body["last_error"].as_str().unwrap().contains("parser exited"));
}
