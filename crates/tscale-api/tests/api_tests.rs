use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use tscale_api::{AppSettings, EMPTY_FILE, EMPTY_FILE_NAME, UPLOAD_OK};
use tscale_db::MemoryStore;

const BOUNDARY: &str = "tscale-test-boundary";

fn app() -> Router {
    let (app, _state) =
        tscale_api::build_app(Arc::new(MemoryStore::new()), AppSettings::default()).unwrap();
    app
}

fn upload_request(file_name: &str, content: &str) -> Request<Body> {
    let body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
         Content-Type: text/csv\r\n\
         \r\n\
         {content}\r\n\
         --{BOUNDARY}--\r\n"
    );
    Request::builder()
        .method("POST")
        .uri("/api/TimeScale/UploadCsv")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, String) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

async fn send_json(app: &Router, uri: &str) -> Vec<Value> {
    let (status, body) = send(app, get(uri)).await;
    assert_eq!(status, StatusCode::OK, "body: {body}");
    serde_json::from_str(&body).unwrap()
}

#[tokio::test]
async fn upload_then_query_summary() {
    let app = app();
    let csv = "2021-01-01;1.0;10\n2021-01-02;2.0;30\n2021-01-03;3.0;20";

    let (status, body) = send(&app, upload_request("runs/report.csv", csv)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, UPLOAD_OK);

    // The path is stripped from the transport file name.
    let summaries = send_json(&app, "/api/TimeScale/GetResults?fileName=report.csv").await;
    assert_eq!(summaries.len(), 1);
    let s = &summaries[0];
    assert_eq!(s["fileName"], "report.csv");
    assert_eq!(s["timeSpanSeconds"], 172800.0);
    assert_eq!(s["earliestTimestamp"], "2021-01-01T00:00:00Z");
    assert_eq!(s["meanExecutionTime"], 2.0);
    assert_eq!(s["meanValue"], 20.0);
    assert_eq!(s["medianValue"], 20.0);
    assert_eq!(s["maxValue"], 30.0);
    assert_eq!(s["minValue"], 10.0);
}

#[tokio::test]
async fn raw_query_returns_latest_ten_newest_first() {
    let app = app();
    let csv: String = (1..=12)
        .map(|d| format!("2021-01-{d:02};1;{d}\n"))
        .collect();

    let (status, _) = send(&app, upload_request("many.csv", &csv)).await;
    assert_eq!(status, StatusCode::OK);

    let records = send_json(&app, "/api/TimeScale/GetResultsByFile?fileName=many.csv").await;
    assert_eq!(records.len(), 10);
    assert_eq!(records[0]["value"], 12.0);
    assert_eq!(records[0]["timestamp"], "2021-01-12T00:00:00Z");
    assert_eq!(records[9]["value"], 3.0);
    assert_eq!(records[0]["fileName"], "many.csv");
}

#[tokio::test]
async fn reupload_replaces_dataset() {
    let app = app();
    send(&app, upload_request("same.csv", "2021-01-01;1;1\n2021-01-02;1;2")).await;
    let (status, _) = send(&app, upload_request("same.csv", "2022-02-02;5;50")).await;
    assert_eq!(status, StatusCode::OK);

    let summaries = send_json(&app, "/api/TimeScale/GetResults").await;
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0]["meanValue"], 50.0);

    let records = send_json(&app, "/api/TimeScale/GetResultsByFile?fileName=same.csv").await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["value"], 50.0);
}

#[tokio::test]
async fn rejected_upload_is_bad_request_and_stores_nothing() {
    let app = app();
    let (status, body) = send(&app, upload_request("old.csv", "1999-12-31;1;1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "Date must be between 2000-01-01 and now.");

    let (status, body) = send(&app, upload_request("neg.csv", "2021-01-01;-1;1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "ExecutionTime must not be negative.");

    assert!(send_json(&app, "/api/TimeScale/GetResults").await.is_empty());
}

#[tokio::test]
async fn oversized_batch_is_rejected_on_count() {
    let app = app();
    let csv = "2021-01-01;1;1\n".repeat(10_001);
    let (status, body) = send(&app, upload_request("huge.csv", &csv)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "Number of values must be between 1 and 10000.");

    let records = send_json(&app, "/api/TimeScale/GetResultsByFile?fileName=huge.csv").await;
    assert!(records.is_empty());
}

#[tokio::test]
async fn unparseable_upload_is_bad_request() {
    let app = app();
    let (status, body) = send(&app, upload_request("bad.csv", "2021-01-01;fast;1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Line 1"), "body: {body}");
}

#[tokio::test]
async fn empty_upload_is_bad_request() {
    let app = app();
    let (status, body) = send(&app, upload_request("empty.csv", "")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, EMPTY_FILE);

    let (status, body) = send(&app, upload_request("dir/", "2021-01-01;1;1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, EMPTY_FILE_NAME);
}

#[tokio::test]
async fn summary_filters_are_inclusive() {
    let app = app();
    send(&app, upload_request("a.csv", "2021-01-01;1;10\n2021-01-02;1;20")).await;
    send(&app, upload_request("b.csv", "2021-06-01;4;100")).await;

    let found = send_json(
        &app,
        "/api/TimeScale/GetResults?startDate=2021-01-01&endDate=2021-01-01",
    )
    .await;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["fileName"], "a.csv");

    let found = send_json(
        &app,
        "/api/TimeScale/GetResults?startExecutionTime=4&endExecutionTime=4",
    )
    .await;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["fileName"], "b.csv");

    let found = send_json(&app, "/api/TimeScale/GetResults?startAverageValue=15&endAverageValue=15").await;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["fileName"], "a.csv");

    // Blank parameters do not constrain.
    let found = send_json(&app, "/api/TimeScale/GetResults?fileName=&startDate=").await;
    assert_eq!(found.len(), 2);

    let found = send_json(&app, "/api/TimeScale/GetResults?fileName=missing.csv").await;
    assert!(found.is_empty());
}

#[tokio::test]
async fn malformed_filter_is_bad_request() {
    let app = app();
    let (status, body) = send(&app, get("/api/TimeScale/GetResults?startDate=soon")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.starts_with("startDate"));

    let (status, _) = send(&app, get("/api/TimeScale/GetResults?endAverageValue=lots")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn raw_query_requires_file_name() {
    let app = app();
    let (status, body) = send(&app, get("/api/TimeScale/GetResultsByFile")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, EMPTY_FILE_NAME);

    let (status, _) = send(&app, get("/api/TimeScale/GetResultsByFile?fileName=%20%20")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
