// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/` and speak JSON. None require server
// authentication; `/compare` optionally takes the caller's inference token in
// the `Authorization` header (see `InferenceToken`).
//
// CORS is configured permissively so a browser dashboard on another origin
// can call the API.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::analysis::{ComparisonReport, SymbolAnalysis};
use crate::api::auth::InferenceToken;
use crate::app_state::AppState;
use crate::error::{ApiError, StageError};

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/indicators/:symbol", get(indicators))
        .route("/api/v1/compare", post(compare))
        .route("/api/v1/errors", get(recent_errors))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    model: String,
    uptime_secs: u64,
    server_time: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        model: state.config.model.clone(),
        uptime_secs: state.uptime_secs(),
        server_time: chrono::Utc::now().timestamp_millis(),
    })
}

// =============================================================================
// Single-symbol indicators
// =============================================================================

async fn indicators(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<Json<SymbolAnalysis>, ApiError> {
    match state.service.analyze_symbol(&symbol).await {
        Ok(analysis) => Ok(Json(analysis)),
        Err(e) => {
            if let ApiError::Analysis(inner) = &e {
                state.push_error(StageError::from(inner), None);
            }
            Err(e)
        }
    }
}

// =============================================================================
// Two-symbol comparison
// =============================================================================

#[derive(Debug, Deserialize)]
struct CompareRequest {
    symbol_a: String,
    symbol_b: String,
}

async fn compare(
    State(state): State<Arc<AppState>>,
    InferenceToken(token): InferenceToken,
    Json(req): Json<CompareRequest>,
) -> Result<Json<ComparisonReport>, ApiError> {
    let credential = state.credential(token.as_deref());
    let report = state
        .service
        .compare(&req.symbol_a, &req.symbol_b, credential)
        .await?;

    for error in report.errors() {
        state.push_error(error.clone(), Some(report.request_id));
    }

    info!(request_id = %report.request_id, "Comparison served");
    Ok(Json(report))
}

// =============================================================================
// Error log
// =============================================================================

async fn recent_errors(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.recent_errors())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::analysis::tests::{FakeMarket, FakeNarrator};
    use crate::analysis::ComparisonService;
    use crate::indicators::IndicatorParams;
    use crate::runtime_config::RuntimeConfig;

    fn app(market: FakeMarket, narrator: FakeNarrator, default_token: Option<&str>) -> (Router, Arc<AppState>) {
        let service = ComparisonService::new(
            Arc::new(market),
            Arc::new(narrator),
            IndicatorParams::default(),
        );
        let state = Arc::new(AppState::new(
            RuntimeConfig::default(),
            service,
            default_token.map(str::to_string),
        ));
        (router(state.clone()), state)
    }

    async fn send(router: Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = router.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn compare_request(body: &str, auth: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/v1/compare")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn health_reports_model() {
        let (router, _) = app(FakeMarket::with(&[]), FakeNarrator::ok(""), None);
        let (status, json) = send(router, get("/api/v1/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["model"], RuntimeConfig::default().model);
    }

    #[tokio::test]
    async fn indicators_for_known_symbol() {
        let (router, _) = app(FakeMarket::with(&[("BTC", 60)]), FakeNarrator::ok(""), None);
        let (status, json) = send(router, get("/api/v1/indicators/btc")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["symbol"], "BTC");
        assert_eq!(json["indicators"]["rsi"].as_array().unwrap().len(), 60);
        assert!(json["indicators"]["sma_long"][48].is_null());
        assert!(json["indicators"]["sma_long"][49].is_number());
        assert_eq!(json["summary"]["sma_trend"], "BULLISH");
    }

    #[tokio::test]
    async fn indicators_for_unknown_symbol_is_404_and_logged() {
        let (router, state) = app(FakeMarket::with(&[]), FakeNarrator::ok(""), None);
        let (status, json) = send(router, get("/api/v1/indicators/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["stage"], "fetch");
        assert_eq!(json["symbol"], "NOPE");

        let errors = state.recent_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].error.symbol.as_deref(), Some("NOPE"));
    }

    #[tokio::test]
    async fn compare_uses_header_token() {
        let (router, _) = app(
            FakeMarket::with(&[("BTC", 40), ("ETH", 40)]),
            FakeNarrator::ok("## Verdict"),
            None,
        );
        let req = compare_request(r#"{"symbol_a":"btc","symbol_b":"eth"}"#, Some("Bearer hf_x"));
        let (status, json) = send(router, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["narrative"]["status"], "ready");
        assert_eq!(json["narrative"]["markdown"], "## Verdict");
        assert_eq!(json["symbols"][1]["symbol"], "ETH");
        assert!(json["disclaimer"].as_str().unwrap().starts_with("Disclaimer"));
    }

    #[tokio::test]
    async fn compare_falls_back_to_default_token() {
        let (router, state) = app(
            FakeMarket::with(&[("BTC", 40), ("ETH", 40)]),
            FakeNarrator::ok("ok"),
            Some("env_token"),
        );
        let req = compare_request(r#"{"symbol_a":"BTC","symbol_b":"ETH"}"#, None);
        let (status, json) = send(router, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["narrative"]["status"], "ready");
        assert!(state.recent_errors().is_empty());
    }

    #[tokio::test]
    async fn compare_partial_failure_is_200_and_logged() {
        let (router, state) = app(FakeMarket::with(&[("BTC", 40)]), FakeNarrator::ok("x"), None);
        let req = compare_request(r#"{"symbol_a":"BTC","symbol_b":"ZZZ"}"#, Some("Bearer t"));
        let (status, json) = send(router, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["symbols"][0]["status"], "ok");
        assert_eq!(json["symbols"][1]["status"], "failed");
        assert_eq!(json["narrative"]["status"], "failed");

        let errors = state.recent_errors();
        assert_eq!(errors.len(), 2);
        assert!(errors
            .iter()
            .all(|e| e.request_id.map(|id| id.to_string()) == json["request_id"].as_str().map(str::to_string)));
    }

    #[tokio::test]
    async fn compare_rejects_empty_symbol() {
        let (router, _) = app(FakeMarket::with(&[]), FakeNarrator::ok(""), None);
        let req = compare_request(r#"{"symbol_a":"  ","symbol_b":"ETH"}"#, None);
        let (status, json) = send(router, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["stage"].is_null());
    }

    #[tokio::test]
    async fn compare_rejects_malformed_authorization() {
        let (router, _) = app(FakeMarket::with(&[]), FakeNarrator::ok(""), None);
        let req = compare_request(r#"{"symbol_a":"BTC","symbol_b":"ETH"}"#, Some("Token abc"));
        let (status, _) = send(router, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn errors_endpoint_lists_log() {
        let (router, state) = app(FakeMarket::with(&[]), FakeNarrator::ok(""), None);
        state.push_error(
            StageError::new(crate::error::Stage::Fetch, Some("XYZ"), "symbol not listed"),
            None,
        );
        let (status, json) = send(router, get("/api/v1/errors")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["symbol"], "XYZ");
    }
}
