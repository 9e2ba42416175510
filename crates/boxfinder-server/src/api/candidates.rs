use axum::{extract::State, Extension, Json};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct InactiveCandidateItem {
    id: i64,
    directory_record_id: i64,
    detected_on: NaiveDate,
    created_at: DateTime<Utc>,
}

/// Open candidates only; resolved ones are history.
pub(super) async fn list_inactive_candidates(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<InactiveCandidateItem>>>, ApiError> {
    let rows = boxfinder_db::list_open_inactive_candidates(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| InactiveCandidateItem {
            id: row.id,
            directory_record_id: row.directory_record_id,
            detected_on: row.detected_on,
            created_at: row.created_at,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
