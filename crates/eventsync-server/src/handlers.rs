use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use chrono::Utc;
use eventsync_types::{
    CalendarEvent, DeleteEventResponse, RecommendRequest, RecommendResponse, SubmitEventRequest,
    SubmitEventResponse, SyncResponse, UpcomingEvent, UpcomingQuery, UpcomingResponse,
};

use crate::error::{ApiError, ApiResult};
use crate::normalize::{self, NotParseable};
use crate::AppState;

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_MESSAGE_CHARS: usize = 1000;
pub const DEFAULT_UPCOMING_DAYS: i64 = 30;
pub const DEFAULT_UPCOMING_LIMIT: u32 = 3;
pub const MAX_UPCOMING_LIMIT: u32 = 50;

pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

// ============================================================================
// Event routes
// ============================================================================

pub async fn submit_event(
    State(state): State<AppState>,
    payload: Result<Json<SubmitEventRequest>, JsonRejection>,
) -> ApiResult<Json<SubmitEventResponse>> {
    let Json(request) = payload?;
    let event = validate_submission(&request)?;

    let created = state.calendar.insert(&event).await?;
    tracing::info!("Submitted event {:?} ({:?})", created.title, created.external_id);

    Ok(Json(SubmitEventResponse {
        ok: true,
        event: created.into(),
    }))
}

fn validate_submission(request: &SubmitEventRequest) -> ApiResult<CalendarEvent> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("name is required"));
    }
    if name.chars().count() > MAX_TITLE_CHARS {
        return Err(ApiError::bad_request(format!(
            "name must be at most {} characters",
            MAX_TITLE_CHARS
        )));
    }
    if request.date.trim().is_empty() || request.start_time.trim().is_empty() {
        return Err(ApiError::bad_request("date and start_time are required"));
    }

    let times = normalize::normalize_submission(
        &request.date,
        &request.start_time,
        request.end_time.as_deref(),
    )
    .map_err(|e| match e {
        NotParseable::DateShape(_) | NotParseable::Day { .. } => {
            ApiError::bad_request("date must be YYYY-MM-DD")
        }
        NotParseable::Time(_) => ApiError::bad_request("start_time and end_time must be HH:MM"),
        other => ApiError::bad_request(other.to_string()),
    })?;

    Ok(CalendarEvent {
        title: name.to_string(),
        description: request.description.clone().unwrap_or_default(),
        location: request.location.clone().unwrap_or_default(),
        start: times.start_utc(),
        end: times.end_utc(),
        external_id: None,
        html_link: None,
    })
}

pub async fn list_upcoming(
    State(state): State<AppState>,
    query: Result<Query<UpcomingQuery>, QueryRejection>,
) -> ApiResult<Json<UpcomingResponse>> {
    let Query(query) = query?;
    let days = query.days.unwrap_or(DEFAULT_UPCOMING_DAYS);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_UPCOMING_LIMIT)
        .clamp(1, MAX_UPCOMING_LIMIT);

    let events = state
        .calendar
        .upcoming(Utc::now(), days, Some(limit))
        .await?;

    Ok(Json(UpcomingResponse {
        ok: true,
        events: events.into_iter().map(UpcomingEvent::from).collect(),
    }))
}

/// Admin only; guarded by [`crate::auth::require_admin`].
pub async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteEventResponse>> {
    if id.trim().is_empty() {
        return Err(ApiError::bad_request("event id is required"));
    }

    state.calendar.delete(&id).await?;
    tracing::info!("Admin deleted event {}", id);

    Ok(Json(DeleteEventResponse {
        ok: true,
        deleted: id,
    }))
}

pub async fn sync_candidates(State(state): State<AppState>) -> Json<SyncResponse> {
    let report = state.pipeline.run().await;
    Json(SyncResponse { ok: true, report })
}

// ============================================================================
// Assistant routes
// ============================================================================

pub async fn recommend(
    State(state): State<AppState>,
    payload: Result<Json<RecommendRequest>, JsonRejection>,
) -> ApiResult<Json<RecommendResponse>> {
    let Json(request) = payload?;
    let message = request.message.trim();
    if message.is_empty() {
        return Err(ApiError::bad_request("message is required"));
    }
    if message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ApiError::bad_request(format!(
            "message must be at most {} characters",
            MAX_MESSAGE_CHARS
        )));
    }

    let response = state.engine.recommend(message, Utc::now()).await;
    tracing::debug!("Recommend answered with {}", response.kind());

    Ok(Json(RecommendResponse { ok: true, response }))
}
