use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use boxfinder_core::TriggerKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::discovery::TriggerOutcome;
use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct DiscoveryRunsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct DiscoveryRunItem {
    run_id: Uuid,
    trigger_source: String,
    status: String,
    stage: String,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    duration_ms: Option<i64>,
    stats: serde_json::Value,
    errors: serde_json::Value,
}

impl From<boxfinder_db::DiscoveryRunRow> for DiscoveryRunItem {
    fn from(row: boxfinder_db::DiscoveryRunRow) -> Self {
        Self {
            run_id: row.public_id,
            duration_ms: row
                .finished_at
                .map(|end| (end - row.started_at).num_milliseconds()),
            trigger_source: row.trigger_source,
            status: row.status,
            stage: row.stage,
            started_at: row.started_at,
            finished_at: row.finished_at,
            stats: row.stats,
            errors: row.errors,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct TriggerAccepted {
    status: &'static str,
    trigger: TriggerKind,
}

#[derive(Debug, Serialize)]
pub(super) struct DiscoveryStatus {
    enabled: bool,
    running: bool,
}

pub(super) async fn list_discovery_runs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<DiscoveryRunsQuery>,
) -> Result<Json<ApiResponse<Vec<DiscoveryRunItem>>>, ApiError> {
    let rows = boxfinder_db::list_discovery_runs(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(DiscoveryRunItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn get_discovery_run(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(run_id): Path<Uuid>,
) -> Result<Json<ApiResponse<DiscoveryRunItem>>, ApiError> {
    let row = boxfinder_db::get_discovery_run(&state.pool, run_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: row.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// Starts a manual run in the background. The run's result is stored in
/// `discovery_runs` when it ends.
pub(super) async fn trigger_discovery_run(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<(StatusCode, Json<ApiResponse<TriggerAccepted>>), ApiError> {
    let Some(discovery) = state.discovery.as_ref() else {
        return Err(ApiError::new(
            req_id.0,
            "unavailable",
            "discovery is not configured on this server",
        ));
    };

    match discovery.trigger(TriggerKind::Manual) {
        TriggerOutcome::Started => Ok((
            StatusCode::ACCEPTED,
            Json(ApiResponse {
                data: TriggerAccepted {
                    status: "started",
                    trigger: TriggerKind::Manual,
                },
                meta: ResponseMeta::new(req_id.0),
            }),
        )),
        TriggerOutcome::AlreadyRunning => Err(ApiError::new(
            req_id.0,
            "conflict",
            "a discovery run is already in progress",
        )),
    }
}

pub(super) async fn discovery_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<DiscoveryStatus>> {
    let data = DiscoveryStatus {
        enabled: state.discovery.is_some(),
        running: state
            .discovery
            .as_ref()
            .is_some_and(crate::discovery::DiscoveryService::is_running),
    };
    Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    })
}
