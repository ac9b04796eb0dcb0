use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Result;
use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use opentelemetry::metrics::{Counter, MeterProvider};
use opentelemetry::KeyValue;
use opentelemetry_prometheus::exporter;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::{Encoder, Registry, TextEncoder};
use serde::Deserialize;
use tscale_config::AppConfig;
use tscale_core::{parse_timestamp, SummaryFilter};
use tscale_db::{DatasetStore, LATEST_MEASUREMENTS_LIMIT};
use tscale_ingest::{base_file_name, require_file_name, DatasetReplacer, IngestError};

pub const UPLOAD_OK: &str = "File uploaded successfully.";
pub const EMPTY_FILE: &str = "File is empty or null.";
pub const EMPTY_FILE_NAME: &str = "File name is empty or null.";

/// Runtime knobs taken from [`AppConfig`]
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub upload_limit_bytes: usize,
    pub ingest_timeout: Duration,
}

impl AppSettings {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            upload_limit_bytes: cfg.upload_limit_bytes(),
            ingest_timeout: Duration::from_secs(cfg.ingest_timeout_secs()),
        }
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

pub struct AppState {
    ready: AtomicBool,
    registry: Registry,
    #[allow(dead_code)]
    provider: SdkMeterProvider,
    requests_total: Counter<u64>,
    ingest_total: Counter<u64>,
    replacer: DatasetReplacer,
    settings: AppSettings,
}

impl AppState {
    fn store(&self) -> &Arc<dyn DatasetStore> {
        self.replacer.store()
    }
}

pub fn build_app(
    store: Arc<dyn DatasetStore>,
    settings: AppSettings,
) -> Result<(Router, Arc<AppState>)> {
    // Prometheus exporter via OpenTelemetry
    let registry = Registry::new();
    let reader = exporter().with_registry(registry.clone()).build()?;
    let provider = SdkMeterProvider::builder().with_reader(reader).build();
    let meter = provider.meter("tscale-api");

    let requests_total = meter
        .u64_counter("tscale_requests_total")
        .with_description("Total HTTP requests served")
        .init();
    let ingest_total = meter
        .u64_counter("tscale_ingest_total")
        .with_description("Uploads processed, by outcome")
        .init();

    let body_limit = settings.upload_limit_bytes;
    let state = Arc::new(AppState {
        ready: AtomicBool::new(false),
        registry,
        provider,
        requests_total,
        ingest_total,
        replacer: DatasetReplacer::new(store),
        settings,
    });

    let router = Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/TimeScale/UploadCsv", post(upload_csv))
        .route("/api/TimeScale/GetResults", get(get_results))
        .route("/api/TimeScale/GetResultsByFile", get(get_results_by_file))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(Arc::clone(&state));

    Ok((router, state))
}

pub fn set_ready(state: &Arc<AppState>, is_ready: bool) {
    state.ready.store(is_ready, Ordering::Relaxed);
}

/// Handler failures, mapped onto status codes
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    /// Malformed or oversized multipart body, with axum's status
    Multipart(StatusCode, String),
    Storage(String),
    Timeout,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            ApiError::Multipart(status, msg) => (status, msg).into_response(),
            ApiError::Storage(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg).into_response(),
            ApiError::Timeout => (
                StatusCode::GATEWAY_TIMEOUT,
                "Upload timed out; the dataset may not have been replaced.",
            )
                .into_response(),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        ApiError::Multipart(e.status(), e.body_text())
    }
}

impl From<tscale_db::DbError> for ApiError {
    fn from(e: tscale_db::DbError) -> Self {
        tracing::error!(error = ?e, "query failed");
        ApiError::Storage(e.to_string())
    }
}

async fn healthz(State(state): State<Arc<AppState>>) -> StatusCode {
    state.requests_total.add(1, &[]);
    StatusCode::OK
}

async fn readyz(State(state): State<Arc<AppState>>) -> StatusCode {
    if state.ready.load(Ordering::Relaxed) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn metrics(
    State(state): State<Arc<AppState>>,
) -> (
    [(axum::http::header::HeaderName, axum::http::HeaderValue); 1],
    String,
) {
    let encoder = TextEncoder::new();
    let metric_families = state.registry.gather();
    let mut buf = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buf) {
        tracing::warn!(error=?e, "failed to encode metrics");
    }
    let body = String::from_utf8(buf).unwrap_or_default();
    let header = (
        header::CONTENT_TYPE,
        axum::http::HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
    );
    ([header], body)
}

async fn upload_csv(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<&'static str, ApiError> {
    state.requests_total.add(1, &[]);

    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(base_file_name).unwrap_or("").to_string();
        let bytes = field.bytes().await?;
        upload = Some((file_name, bytes));
        break;
    }

    let Some((raw_name, payload)) = upload else {
        return Err(ApiError::BadRequest(EMPTY_FILE.to_string()));
    };
    if payload.is_empty() {
        return Err(ApiError::BadRequest(EMPTY_FILE.to_string()));
    }
    let Some(file_name) = require_file_name(&raw_name) else {
        return Err(ApiError::BadRequest(EMPTY_FILE_NAME.to_string()));
    };

    // Dropping the replace future on timeout rolls its transaction back.
    let outcome = tokio::time::timeout(
        state.settings.ingest_timeout,
        state.replacer.replace(file_name, &payload),
    )
    .await;

    let (label, result) = match outcome {
        Err(_) => {
            tracing::error!(file_name, "upload timed out");
            ("timeout", Err(ApiError::Timeout))
        }
        Ok(Ok(_)) => ("committed", Ok(UPLOAD_OK)),
        Ok(Err(e)) if e.is_client_error() => {
            let msg = match e {
                IngestError::Rejected(reason) => reason.to_string(),
                other => other.to_string(),
            };
            ("rejected", Err(ApiError::BadRequest(msg)))
        }
        Ok(Err(e)) => ("failed", Err(ApiError::Storage(e.to_string()))),
    };
    state
        .ingest_total
        .add(1, &[KeyValue::new("outcome", label)]);
    result
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsQuery {
    pub file_name: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub start_execution_time: Option<String>,
    pub end_execution_time: Option<String>,
    pub start_average_value: Option<String>,
    pub end_average_value: Option<String>,
}

impl TryFrom<ResultsQuery> for SummaryFilter {
    type Error = ApiError;

    fn try_from(q: ResultsQuery) -> Result<Self, Self::Error> {
        fn present(raw: &Option<String>) -> Option<&str> {
            raw.as_deref().map(str::trim).filter(|s| !s.is_empty())
        }
        let date = |name: &str, raw: &Option<String>| {
            present(raw)
                .map(|s| {
                    parse_timestamp(s)
                        .map_err(|e| ApiError::BadRequest(format!("{name}: {e}")))
                })
                .transpose()
        };
        let number = |name: &str, raw: &Option<String>| {
            present(raw)
                .map(|s| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|v| v.is_finite())
                        .ok_or_else(|| ApiError::BadRequest(format!("{name}: '{s}' is not a number")))
                })
                .transpose()
        };

        let mut filter = SummaryFilter::default()
            .with_date_range(date("startDate", &q.start_date)?, date("endDate", &q.end_date)?)
            .with_execution_time_range(
                number("startExecutionTime", &q.start_execution_time)?,
                number("endExecutionTime", &q.end_execution_time)?,
            )
            .with_average_value_range(
                number("startAverageValue", &q.start_average_value)?,
                number("endAverageValue", &q.end_average_value)?,
            );
        if let Some(name) = q.file_name {
            filter = filter.with_file_name(name);
        }
        Ok(filter)
    }
}

async fn get_results(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ResultsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    state.requests_total.add(1, &[]);
    let filter = SummaryFilter::try_from(q)?;
    let summaries = state.store().find_summaries(&filter).await?;
    Ok((StatusCode::OK, Json(summaries)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ByFileQuery {
    pub file_name: Option<String>,
}

async fn get_results_by_file(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ByFileQuery>,
) -> Result<impl IntoResponse, ApiError> {
    state.requests_total.add(1, &[]);
    let Some(file_name) = q.file_name.as_deref().and_then(require_file_name) else {
        return Err(ApiError::BadRequest(EMPTY_FILE_NAME.to_string()));
    };
    let records = state
        .store()
        .latest_measurements(file_name, LATEST_MEASUREMENTS_LIMIT)
        .await?;
    Ok((StatusCode::OK, Json(records)))
}
