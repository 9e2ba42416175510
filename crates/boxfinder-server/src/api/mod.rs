mod candidates;
mod discovery_runs;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::discovery::DiscoveryService;
use crate::middleware::{request_id, RequestId};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    /// `None` when the pipeline could not be assembled (e.g. no API key);
    /// read endpoints keep working.
    pub discovery: Option<DiscoveryService>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(20).clamp(1, 200)
}

pub(super) fn map_db_error(request_id: String, error: &boxfinder_db::DbError) -> ApiError {
    if matches!(error, boxfinder_db::DbError::NotFound) {
        return ApiError::new(request_id, "not_found", "resource not found");
    }
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
        ])
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/health", get(health))
        .route(
            "/api/v1/discovery/runs",
            get(discovery_runs::list_discovery_runs).post(discovery_runs::trigger_discovery_run),
        )
        .route(
            "/api/v1/discovery/runs/{run_id}",
            get(discovery_runs::get_discovery_run),
        )
        .route(
            "/api/v1/discovery/status",
            get(discovery_runs::discovery_status),
        )
        .route(
            "/api/v1/inactive-candidates",
            get(candidates::list_inactive_candidates),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match boxfinder_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use boxfinder_pipeline::RunGuard;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::discovery::testing::HoldingLauncher;

    /// A pool that never connects; fine for routes that do not query.
    fn offline_pool() -> PgPool {
        PgPoolOptions::new()
            .connect_lazy("postgres://boxfinder@127.0.0.1:1/unused")
            .expect("lazy pool")
    }

    fn app_with(discovery: Option<DiscoveryService>) -> Router {
        build_app(AppState {
            pool: offline_pool(),
            discovery,
        })
    }

    async fn post_runs(app: Router) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/discovery/runs")
                    .header("x-request-id", "req-42")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        (status, serde_json::from_slice(&body).expect("json parse"))
    }

    #[test]
    fn normalize_limit_applies_defaults_and_bounds() {
        assert_eq!(normalize_limit(None), 20);
        assert_eq!(normalize_limit(Some(0)), 1);
        assert_eq!(normalize_limit(Some(1_000)), 200);
        assert_eq!(normalize_limit(Some(25)), 25);
    }

    #[test]
    fn api_error_codes_map_to_statuses() {
        let cases = [
            ("not_found", StatusCode::NOT_FOUND),
            ("conflict", StatusCode::CONFLICT),
            ("unavailable", StatusCode::SERVICE_UNAVAILABLE),
            ("validation_error", StatusCode::BAD_REQUEST),
            ("anything_else", StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (code, expected) in cases {
            let response = ApiError::new("req-1", code, "message").into_response();
            assert_eq!(response.status(), expected, "{code}");
        }
    }

    #[tokio::test]
    async fn manual_trigger_is_accepted_then_conflicts() {
        let launcher = Arc::new(HoldingLauncher::default());
        let service = DiscoveryService::new(launcher.clone(), RunGuard::new());

        let (status, json) = post_runs(app_with(Some(service.clone()))).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(json["data"]["status"], "started");
        assert_eq!(json["meta"]["request_id"], "req-42");

        let (status, json) = post_runs(app_with(Some(service))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"]["code"], "conflict");
        assert_eq!(launcher.triggers().len(), 1);
    }

    #[tokio::test]
    async fn manual_trigger_without_pipeline_is_unavailable() {
        let (status, json) = post_runs(app_with(None)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["error"]["code"], "unavailable");
    }

    #[tokio::test]
    async fn status_reports_active_run() {
        let launcher = Arc::new(HoldingLauncher::default());
        let service = DiscoveryService::new(launcher, RunGuard::new());
        service.trigger(boxfinder_core::TriggerKind::Scheduled);

        let response = app_with(Some(service))
            .oneshot(
                Request::builder()
                    .uri("/api/v1/discovery/status")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        assert_eq!(json["data"]["running"], true);
        assert_eq!(json["data"]["enabled"], true);
    }

    #[tokio::test]
    async fn request_id_is_generated_when_missing() {
        let response = app_with(None)
            .oneshot(
                Request::builder()
                    .uri("/api/v1/discovery/status")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn list_runs_returns_stored_runs(pool: PgPool) {
        let mut run = boxfinder_core::RunResult::start(boxfinder_core::TriggerKind::Manual);
        run.stats.final_count = 4;
        boxfinder_db::insert_discovery_run(&pool, &run)
            .await
            .expect("insert run");

        let app = build_app(AppState {
            pool,
            discovery: None,
        });
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/discovery/runs?limit=5")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        let data = json["data"].as_array().expect("data array");
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["run_id"], run.run_id.to_string());
        assert_eq!(data[0]["stats"]["final_count"], 4);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn unknown_run_is_404(pool: PgPool) {
        let app = build_app(AppState {
            pool,
            discovery: None,
        });
        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/v1/discovery/runs/{}", uuid::Uuid::new_v4()))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
