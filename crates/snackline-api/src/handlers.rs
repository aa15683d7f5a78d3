//! Route handler functions for all API endpoints.
//!
//! Each handler extracts its payload via axum extractors, interacts with
//! the AppState services, and returns JSON (or an `.xlsx` attachment for
//! the export endpoints).

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use snackline_core::records::{BreakageSample, LeakTest, LogEntry, OxygenTest};
use snackline_dashboard::{DashboardData, DashboardEngine, FilterSpec, RawBundle};
use snackline_storage::{
    table_counts, BreakageRepository, LeakRepository, OxygenRepository, ProductionLogRepository,
};

use crate::auth::{bearer_token, Role};
use crate::error::ApiError;
use crate::state::AppState;

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

// =============================================================================
// Request / response types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub role: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub logged_out: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub leak_tests: u64,
    pub oxygen_tests: u64,
    pub breakage: u64,
    pub production_log: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecordCreated {
    pub created: bool,
}

// =============================================================================
// Payload coercion helpers
// =============================================================================

/// Required text field; missing or non-string is a client error.
fn required_text(payload: &Value, key: &str) -> Result<String, ApiError> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::BadRequest(format!("Field '{}' is required", key)))
}

/// Optional text field, defaulting to empty.
fn text(payload: &Value, key: &str) -> String {
    payload
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Best-effort numeric coercion: numbers pass through, numeric strings
/// parse, anything else contributes 0.0. Missing input and a true zero
/// reading are intentionally indistinguishable.
fn number(payload: &Value, key: &str) -> f64 {
    match payload.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

// =============================================================================
// Auth handlers
// =============================================================================

/// POST /login - check credentials against the configured user list and
/// issue a session token.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state
        .config
        .auth
        .users
        .iter()
        .find(|u| u.email == payload.email && u.password == payload.password)
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_string()))?;

    let role = Role::parse(&user.role).ok_or_else(|| {
        ApiError::Internal(format!("User '{}' has an unknown role", user.email))
    })?;

    let token = state.sessions.create(&user.email, role);
    info!(email = %user.email, role = role.as_str(), "User logged in");

    Ok(Json(LoginResponse {
        token,
        role: role.as_str().to_string(),
    }))
}

/// POST /logout - invalidate the bearer token.
pub async fn logout(State(state): State<AppState>, req: Request) -> Json<LogoutResponse> {
    let removed = bearer_token(&req)
        .map(|token| state.sessions.remove(&token))
        .unwrap_or(false);
    Json(LogoutResponse { logged_out: removed })
}

// =============================================================================
// Health
// =============================================================================

/// GET /health - liveness plus per-table row counts.
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let counts = table_counts(&state.database)?;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        leak_tests: counts.leak_tests,
        oxygen_tests: counts.oxygen_tests,
        breakage: counts.breakage,
        production_log: counts.production_log,
    }))
}

// =============================================================================
// Dashboard & export handlers (manager role)
// =============================================================================

/// POST /api/dashboard - normalize the filter payload and run the
/// aggregation engine.
pub async fn dashboard_data(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<Json<DashboardData>, ApiError> {
    if !payload.is_object() {
        return Err(ApiError::BadRequest(
            "Filter payload must be a JSON object".to_string(),
        ));
    }

    let spec = FilterSpec::from_value(&payload);
    let engine = DashboardEngine::new(Arc::clone(&state.database));
    let data = engine.aggregate(&spec)?;
    Ok(Json(data))
}

/// Wrap workbook bytes as a downloadable attachment.
fn xlsx_response(filename: &str, bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, XLSX_MIME.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
        .into_response()
}

/// POST /api/export - build the four-sheet workbook from an echoed raw
/// bundle. The bundle may be sent bare or nested under a `raw` key, as
/// returned by the dashboard endpoint.
pub async fn export_filtered(
    State(_state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<Response, ApiError> {
    let raw_value = payload.get("raw").unwrap_or(&payload);
    let bundle: RawBundle = serde_json::from_value(raw_value.clone()).map_err(|e| {
        ApiError::BadRequest(format!("Export payload is not a valid raw bundle: {}", e))
    })?;

    let bytes = snackline_export::build_workbook(&bundle)?;
    Ok(xlsx_response("dashboard_export.xlsx", bytes))
}

/// GET /export/leak - unfiltered dump of the leak test table.
pub async fn export_leak(State(state): State<AppState>) -> Result<Response, ApiError> {
    let rows = LeakRepository::new(Arc::clone(&state.database)).fetch_all()?;
    let bytes = snackline_export::leak_workbook(&rows)?;
    Ok(xlsx_response("leak_tests.xlsx", bytes))
}

/// GET /export/oxygen - unfiltered dump of the oxygen test table.
pub async fn export_oxygen(State(state): State<AppState>) -> Result<Response, ApiError> {
    let rows = OxygenRepository::new(Arc::clone(&state.database)).fetch_all()?;
    let bytes = snackline_export::oxygen_workbook(&rows)?;
    Ok(xlsx_response("oxygen_tests.xlsx", bytes))
}

/// GET /export/breakage - unfiltered dump of the breakage table.
pub async fn export_breakage(State(state): State<AppState>) -> Result<Response, ApiError> {
    let rows = BreakageRepository::new(Arc::clone(&state.database)).fetch_all()?;
    let bytes = snackline_export::breakage_workbook(&rows)?;
    Ok(xlsx_response("breakage.xlsx", bytes))
}

/// GET /export/log - unfiltered dump of the production log with resolved
/// stop-cause labels.
pub async fn export_log(State(state): State<AppState>) -> Result<Response, ApiError> {
    let rows = ProductionLogRepository::new(Arc::clone(&state.database)).fetch_all()?;
    let bytes = snackline_export::production_log_workbook(&rows)?;
    Ok(xlsx_response("production_log.xlsx", bytes))
}

// =============================================================================
// Record insertion handlers (any authenticated role)
// =============================================================================

/// POST /records/leak - append a leak test.
pub async fn create_leak(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<(axum::http::StatusCode, Json<RecordCreated>), ApiError> {
    let record = LeakTest {
        date: required_text(&payload, "date")?,
        line: required_text(&payload, "line")?,
        flavour: text(&payload, "flavour"),
        grammage: text(&payload, "grammage"),
        pressure: text(&payload, "pressure"),
        result: text(&payload, "result"),
        remarks: text(&payload, "remarks"),
        photo_ref: text(&payload, "photo_ref"),
    };
    LeakRepository::new(Arc::clone(&state.database)).insert(&record)?;
    Ok((axum::http::StatusCode::CREATED, Json(RecordCreated { created: true })))
}

/// POST /records/oxygen - append an oxygen test.
pub async fn create_oxygen(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<(axum::http::StatusCode, Json<RecordCreated>), ApiError> {
    let record = OxygenTest {
        date: required_text(&payload, "date")?,
        line: required_text(&payload, "line")?,
        flavour: text(&payload, "flavour"),
        grammage: text(&payload, "grammage"),
        temperature: number(&payload, "temperature"),
        oxygen: number(&payload, "oxygen"),
    };
    OxygenRepository::new(Arc::clone(&state.database)).insert(&record)?;
    Ok((axum::http::StatusCode::CREATED, Json(RecordCreated { created: true })))
}

/// POST /records/breakage - append a breakage sample.
pub async fn create_breakage(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<(axum::http::StatusCode, Json<RecordCreated>), ApiError> {
    let record = BreakageSample {
        date: required_text(&payload, "date")?,
        line: required_text(&payload, "line")?,
        product_code: text(&payload, "product_code"),
        good: number(&payload, "good"),
        broken: number(&payload, "broken"),
        cluster: number(&payload, "cluster"),
        residue: number(&payload, "residue"),
    };
    BreakageRepository::new(Arc::clone(&state.database)).insert(&record)?;
    Ok((axum::http::StatusCode::CREATED, Json(RecordCreated { created: true })))
}

/// POST /records/log - append a production log entry.
pub async fn create_log(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<(axum::http::StatusCode, Json<RecordCreated>), ApiError> {
    let record = LogEntry {
        date: required_text(&payload, "date")?,
        time: text(&payload, "time"),
        line: required_text(&payload, "line")?,
        action: required_text(&payload, "action")?,
        stop_reason: text(&payload, "stop_reason"),
        stop_other: text(&payload, "stop_other"),
    };
    ProductionLogRepository::new(Arc::clone(&state.database)).insert(&record)?;
    Ok((axum::http::StatusCode::CREATED, Json(RecordCreated { created: true })))
}
