use crate::auth::authenticate;
use crate::db::{self, CreatePollData, PollFilter};
use crate::error::AppError;
use crate::response::ApiResponse;
use crate::sse::{self, PollUpdate, SseEvent};
use crate::startup::AppState;
use axum::{
    extract::{Extension, Json, Path, Query},
    http::HeaderMap,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;

const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Debug, Deserialize)]
pub struct ListPollsQuery {
    pub filter: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastVoteRequest {
    pub option_id: String,
}

/// List polls, optionally filtered and paginated.
pub async fn list_polls(
    Extension(app_state): Extension<AppState>,
    Query(query): Query<ListPollsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = query
        .filter
        .as_deref()
        .map(PollFilter::parse)
        .unwrap_or_default();

    let polls = db::list_polls(
        &app_state.db,
        filter,
        query.limit.unwrap_or(DEFAULT_PAGE_SIZE),
        query.offset.unwrap_or(0),
    )
    .await?;

    Ok(ApiResponse::ok(polls))
}

/// Create a new poll (authenticated users only)
pub async fn create_poll(
    Extension(app_state): Extension<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreatePollData>,
) -> Result<impl IntoResponse, AppError> {
    let user = authenticate(&app_state, &headers).await?;

    let poll = db::create_poll(&app_state.db, &user.user_id, payload).await?;
    sse::publish(&app_state.sse_tx, SseEvent::PollCreated(poll.clone()));

    Ok(ApiResponse::created(poll))
}

pub async fn get_poll(
    Extension(app_state): Extension<AppState>,
    Path(poll_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let poll = db::get_poll(&app_state.db, &poll_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Poll".to_string()))?;

    Ok(ApiResponse::ok(poll))
}

/// Cast a vote on a poll option (authenticated users only)
pub async fn vote_on_poll(
    Extension(app_state): Extension<AppState>,
    headers: HeaderMap,
    Path(poll_id): Path<String>,
    Json(payload): Json<CastVoteRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = authenticate(&app_state, &headers).await?;

    match db::create_vote(&app_state.db, &user.user_id, &poll_id, &payload.option_id).await? {
        Some(vote) => {
            if let Some(poll) = db::get_poll(&app_state.db, &poll_id).await? {
                sse::publish(
                    &app_state.sse_tx,
                    SseEvent::VoteUpdate(PollUpdate {
                        poll,
                        option_id: payload.option_id,
                    }),
                );
            }
            Ok(ApiResponse::ok(vote))
        }
        None => {
            let reason =
                explain_rejected_vote(&app_state, &user.user_id, &poll_id, &payload.option_id)
                    .await?;
            Err(reason)
        }
    }
}

/// The store only reports that a vote was refused; work out why for the client.
async fn explain_rejected_vote(
    app_state: &AppState,
    user_id: &str,
    poll_id: &str,
    option_id: &str,
) -> Result<AppError, AppError> {
    let Some(poll) = db::get_poll(&app_state.db, poll_id).await? else {
        return Ok(AppError::NotFound("Poll".to_string()));
    };

    if db::user_has_voted(&app_state.db, poll_id, user_id).await? {
        return Ok(AppError::Conflict(
            "User already voted on this poll".to_string(),
        ));
    }

    if poll.is_expired_at(Utc::now()) {
        return Ok(AppError::Validation("Poll has expired".to_string()));
    }

    if !poll.options.iter().any(|opt| opt.id == option_id) {
        return Ok(AppError::NotFound("Poll option".to_string()));
    }

    Ok(AppError::Conflict("Vote was not recorded".to_string()))
}

pub async fn get_poll_votes(
    Extension(app_state): Extension<AppState>,
    Path(poll_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if db::get_poll(&app_state.db, &poll_id).await?.is_none() {
        return Err(AppError::NotFound("Poll".to_string()));
    }

    let votes = db::get_poll_votes(&app_state.db, &poll_id).await?;

    Ok(ApiResponse::ok(votes))
}

pub async fn get_poll_analytics(
    Extension(app_state): Extension<AppState>,
    Path(poll_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let analytics = db::get_poll_analytics(&app_state.db, &poll_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Poll".to_string()))?;

    Ok(ApiResponse::ok(analytics))
}
