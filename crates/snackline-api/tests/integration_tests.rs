//! Integration tests for the Snackline API.
//!
//! Covers login/session flows, role gating, the dashboard aggregation
//! endpoint, record insertion, and spreadsheet exports. Each test is
//! independent with its own in-memory state.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use snackline_api::handlers::{HealthResponse, LoginResponse};
use snackline_api::{create_router, AppState};
use snackline_core::config::{SnacklineConfig, UserConfig};
use snackline_core::records::{BreakageSample, LeakTest, LogEntry, OxygenTest};
use snackline_dashboard::DashboardData;
use snackline_storage::{
    BreakageRepository, Database, LeakRepository, OxygenRepository, ProductionLogRepository,
};

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

// =============================================================================
// Helpers
// =============================================================================

/// Create a fresh AppState with an in-memory DB and three seeded users,
/// one per role.
fn make_state() -> AppState {
    let mut config = SnacklineConfig::default();
    config.auth.users = vec![
        UserConfig {
            email: "manager@example.com".to_string(),
            password: "manager-pw".to_string(),
            role: "manager".to_string(),
        },
        UserConfig {
            email: "qa@example.com".to_string(),
            password: "qa-pw".to_string(),
            role: "quality".to_string(),
        },
        UserConfig {
            email: "op@example.com".to_string(),
            password: "op-pw".to_string(),
            role: "log".to_string(),
        },
    ];
    let db = Database::in_memory().unwrap();
    AppState::new(config, db)
}

async fn body_bytes(resp: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(resp.into_body(), 8 * 1024 * 1024)
        .await
        .unwrap()
        .to_vec()
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

/// Log a seeded user in and return the bearer token.
async fn login(app: &axum::Router, email: &str, password: &str) -> String {
    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/login",
            None,
            &json!({"email": email, "password": password}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let login: LoginResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    login.token
}

/// Insert a small, mixed dataset across all four tables.
fn seed_records(state: &AppState) {
    let leak = LeakRepository::new(Arc::clone(&state.database));
    leak.insert(&LeakTest {
        date: "2024-03-01".to_string(),
        line: "L1".to_string(),
        flavour: "Paprika".to_string(),
        grammage: "45g".to_string(),
        pressure: "250".to_string(),
        result: "Pass".to_string(),
        remarks: String::new(),
        photo_ref: String::new(),
    })
    .unwrap();
    leak.insert(&LeakTest {
        date: "2024-03-01".to_string(),
        line: "L1".to_string(),
        flavour: "Paprika".to_string(),
        grammage: "45g".to_string(),
        pressure: "250".to_string(),
        result: "Fail".to_string(),
        remarks: "seal split".to_string(),
        photo_ref: String::new(),
    })
    .unwrap();
    leak.insert(&LeakTest {
        date: "2024-03-02".to_string(),
        line: "L2".to_string(),
        flavour: "Salt".to_string(),
        grammage: "90g".to_string(),
        pressure: "250".to_string(),
        result: "Pass".to_string(),
        remarks: String::new(),
        photo_ref: String::new(),
    })
    .unwrap();

    let oxygen = OxygenRepository::new(Arc::clone(&state.database));
    oxygen
        .insert(&OxygenTest {
            date: "2024-03-01".to_string(),
            line: "L1".to_string(),
            flavour: "Paprika".to_string(),
            grammage: "45g".to_string(),
            temperature: 21.5,
            oxygen: 2.0,
        })
        .unwrap();
    oxygen
        .insert(&OxygenTest {
            date: "2024-03-02".to_string(),
            line: "L2".to_string(),
            flavour: "Salt".to_string(),
            grammage: "90g".to_string(),
            temperature: 22.0,
            oxygen: 4.0,
        })
        .unwrap();

    let breakage = BreakageRepository::new(Arc::clone(&state.database));
    breakage
        .insert(&BreakageSample {
            date: "2024-03-01".to_string(),
            line: "L1".to_string(),
            product_code: "PAP45".to_string(),
            good: 95.0,
            broken: 3.0,
            cluster: 2.0,
            residue: 0.5,
        })
        .unwrap();

    let log = ProductionLogRepository::new(Arc::clone(&state.database));
    log.insert(&LogEntry {
        date: "2024-03-01".to_string(),
        time: "08:15".to_string(),
        line: "L1".to_string(),
        action: "Stop".to_string(),
        stop_reason: "Film change".to_string(),
        stop_other: String::new(),
    })
    .unwrap();
    log.insert(&LogEntry {
        date: "2024-03-01".to_string(),
        time: "10:40".to_string(),
        line: "L1".to_string(),
        action: "Stop".to_string(),
        stop_reason: "Other".to_string(),
        stop_other: "Belt jam".to_string(),
    })
    .unwrap();
    log.insert(&LogEntry {
        date: "2024-03-01".to_string(),
        time: "11:00".to_string(),
        line: "L1".to_string(),
        action: "Start".to_string(),
        stop_reason: String::new(),
        stop_other: String::new(),
    })
    .unwrap();
}

// =============================================================================
// Public endpoints
// =============================================================================

#[tokio::test]
async fn test_health_no_auth_required() {
    let app = create_router(make_state());
    let resp = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let health: HealthResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.leak_tests, 0);
    assert_eq!(health.production_log, 0);
}

#[tokio::test]
async fn test_health_reports_table_counts() {
    let state = make_state();
    seed_records(&state);
    let app = create_router(state);

    let resp = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let health: HealthResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(health.leak_tests, 3);
    assert_eq!(health.oxygen_tests, 2);
    assert_eq!(health.breakage, 1);
    assert_eq!(health.production_log, 3);
}

// =============================================================================
// Login / logout
// =============================================================================

#[tokio::test]
async fn test_login_happy_path() {
    let app = create_router(make_state());
    let resp = app
        .oneshot(json_request(
            "POST",
            "/login",
            None,
            &json!({"email": "manager@example.com", "password": "manager-pw"}),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let login: LoginResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(login.role, "manager");
    assert_eq!(login.token.len(), 32);
}

#[tokio::test]
async fn test_login_wrong_password() {
    let app = create_router(make_state());
    let resp = app
        .oneshot(json_request(
            "POST",
            "/login",
            None,
            &json!({"email": "manager@example.com", "password": "nope"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_unknown_user() {
    let app = create_router(make_state());
    let resp = app
        .oneshot(json_request(
            "POST",
            "/login",
            None,
            &json!({"email": "ghost@example.com", "password": "x"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_invalidates_token() {
    let app = create_router(make_state());
    let token = login(&app, "op@example.com", "op-pw").await;

    let resp = app
        .clone()
        .oneshot(json_request("POST", "/logout", Some(&token), &json!({})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // Token no longer works on a protected route.
    let resp = app
        .oneshot(json_request(
            "POST",
            "/records/leak",
            Some(&token),
            &json!({"date": "2024-03-01", "line": "L1"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Role gating
// =============================================================================

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = create_router(make_state());
    for (method, uri) in [
        ("POST", "/records/leak"),
        ("POST", "/api/dashboard"),
        ("POST", "/api/export"),
    ] {
        let resp = app
            .clone()
            .oneshot(json_request(method, uri, None, &json!({})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{} {}", method, uri);
        let body: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
        assert_eq!(body["error"], "unauthorized");
    }
    let resp = app
        .oneshot(get_request("/export/leak", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_dashboard_forbidden_for_non_managers() {
    let app = create_router(make_state());
    let qa = login(&app, "qa@example.com", "qa-pw").await;
    let op = login(&app, "op@example.com", "op-pw").await;

    for token in [&qa, &op] {
        let resp = app
            .clone()
            .oneshot(json_request("POST", "/api/dashboard", Some(token), &json!({})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let body: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
        assert_eq!(body["error"], "forbidden");
    }
}

#[tokio::test]
async fn test_export_forbidden_for_quality_role() {
    let app = create_router(make_state());
    let qa = login(&app, "qa@example.com", "qa-pw").await;

    let resp = app
        .oneshot(get_request("/export/leak", Some(&qa)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_non_manager_can_append_records() {
    let app = create_router(make_state());
    let op = login(&app, "op@example.com", "op-pw").await;

    let resp = app
        .oneshot(json_request(
            "POST",
            "/records/log",
            Some(&op),
            &json!({
                "date": "2024-03-05",
                "time": "07:00",
                "line": "L1",
                "action": "Start"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
}

// =============================================================================
// Dashboard
// =============================================================================

#[tokio::test]
async fn test_dashboard_empty_filter_matches_everything() {
    let state = make_state();
    seed_records(&state);
    let app = create_router(state);
    let token = login(&app, "manager@example.com", "manager-pw").await;

    let resp = app
        .oneshot(json_request("POST", "/api/dashboard", Some(&token), &json!({})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let data: DashboardData = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    // 2 of 3 leak tests pass.
    assert_eq!(data.kpi.pass_rate, 66.67);
    assert_eq!(data.raw.leak.len(), 3);
    assert_eq!(data.raw.oxygen.len(), 2);
    assert_eq!(data.raw.breakage.len(), 1);
    // Only stop actions reach the raw bundle.
    assert_eq!(data.raw.stop.len(), 2);
    // "Other" resolves to the free-text cause.
    assert!(data.stop.label.iter().any(|l| l == "Belt jam"));
}

#[tokio::test]
async fn test_dashboard_filters_by_line() {
    let state = make_state();
    seed_records(&state);
    let app = create_router(state);
    let token = login(&app, "manager@example.com", "manager-pw").await;

    let resp = app
        .oneshot(json_request(
            "POST",
            "/api/dashboard",
            Some(&token),
            &json!({"lines": ["L2"]}),
        ))
        .await
        .unwrap();
    let data: DashboardData = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(data.raw.leak.len(), 1);
    assert_eq!(data.kpi.pass_rate, 100.0);
    assert!(data.raw.stop.is_empty());
}

#[tokio::test]
async fn test_dashboard_rejects_non_object_payload() {
    let app = create_router(make_state());
    let token = login(&app, "manager@example.com", "manager-pw").await;

    let resp = app
        .oneshot(json_request(
            "POST",
            "/api/dashboard",
            Some(&token),
            &json!([1, 2, 3]),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_insert_then_aggregate() {
    let app = create_router(make_state());
    let manager = login(&app, "manager@example.com", "manager-pw").await;

    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/records/leak",
            Some(&manager),
            &json!({
                "date": "2024-04-10",
                "line": "L3",
                "flavour": "Cheese",
                "grammage": "120g",
                "pressure": "240",
                "result": "Pass"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = app
        .oneshot(json_request("POST", "/api/dashboard", Some(&manager), &json!({})))
        .await
        .unwrap();
    let data: DashboardData = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(data.raw.leak.len(), 1);
    assert_eq!(data.kpi.pass_rate, 100.0);
}

#[tokio::test]
async fn test_record_insert_missing_required_field() {
    let app = create_router(make_state());
    let op = login(&app, "op@example.com", "op-pw").await;

    let resp = app
        .oneshot(json_request(
            "POST",
            "/records/leak",
            Some(&op),
            &json!({"line": "L1"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_breakage_insert_coerces_string_numbers() {
    let app = create_router(make_state());
    let qa = login(&app, "qa@example.com", "qa-pw").await;
    let manager = login(&app, "manager@example.com", "manager-pw").await;

    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/records/breakage",
            Some(&qa),
            &json!({
                "date": "2024-04-11",
                "line": "L1",
                "product_code": "SALT90",
                "good": "88",
                "broken": "7.5",
                "cluster": "junk"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = app
        .oneshot(json_request("POST", "/api/dashboard", Some(&manager), &json!({})))
        .await
        .unwrap();
    let data: DashboardData = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    let sample = &data.raw.breakage[0];
    assert_eq!(sample.good, 88.0);
    assert_eq!(sample.broken, 7.5);
    assert_eq!(sample.cluster, 0.0);
    assert_eq!(sample.residue, 0.0);
}

// =============================================================================
// Exports
// =============================================================================

#[tokio::test]
async fn test_filtered_export_round_trip() {
    let state = make_state();
    seed_records(&state);
    let app = create_router(state);
    let token = login(&app, "manager@example.com", "manager-pw").await;

    // Fetch the dashboard, then echo its payload straight back to export.
    let resp = app
        .clone()
        .oneshot(json_request("POST", "/api/dashboard", Some(&token), &json!({})))
        .await
        .unwrap();
    let dashboard: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();

    let resp = app
        .oneshot(json_request("POST", "/api/export", Some(&token), &dashboard))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("content-type").unwrap().to_str().unwrap(),
        XLSX_MIME
    );
    let disposition = resp
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("attachment"));

    let bytes = body_bytes(resp).await;
    assert!(bytes.starts_with(ZIP_MAGIC));
}

#[tokio::test]
async fn test_filtered_export_accepts_bare_bundle() {
    let app = create_router(make_state());
    let token = login(&app, "manager@example.com", "manager-pw").await;

    let bundle = json!({"leak": [], "oxygen": [], "breakage": [], "stop": []});
    let resp = app
        .oneshot(json_request("POST", "/api/export", Some(&token), &bundle))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_bytes(resp).await.starts_with(ZIP_MAGIC));
}

#[tokio::test]
async fn test_filtered_export_rejects_bad_bundle() {
    let app = create_router(make_state());
    let token = login(&app, "manager@example.com", "manager-pw").await;

    let resp = app
        .oneshot(json_request(
            "POST",
            "/api/export",
            Some(&token),
            &json!({"leak": "not-a-list"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unfiltered_table_exports() {
    let state = make_state();
    seed_records(&state);
    let app = create_router(state);
    let token = login(&app, "manager@example.com", "manager-pw").await;

    for uri in ["/export/leak", "/export/oxygen", "/export/breakage", "/export/log"] {
        let resp = app
            .clone()
            .oneshot(get_request(uri, Some(&token)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "{}", uri);
        assert_eq!(
            resp.headers().get("content-type").unwrap().to_str().unwrap(),
            XLSX_MIME,
            "{}",
            uri
        );
        assert!(body_bytes(resp).await.starts_with(ZIP_MAGIC), "{}", uri);
    }
}
