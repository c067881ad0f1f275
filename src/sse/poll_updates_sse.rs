use crate::db;
use crate::sse::models::SseEvent;
use crate::startup::AppState;
use axum::{
    extract::{Extension, Path},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use serde_json::json;
use std::{convert::Infallible, time::Duration};
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

pub async fn poll_updates_sse(
    Extension(app_state): Extension<AppState>,
    Path(poll_id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = app_state.sse_tx.subscribe();

    let stream = async_stream::stream! {
        match db::get_poll(&app_state.db, &poll_id).await {
            Ok(Some(poll)) => {
                yield Ok(Event::default()
                    .event("init")
                    .data(json!({
                        "poll": poll,
                        "totalVotes": poll.total_votes,
                    }).to_string()));
            }
            Ok(None) => {
                yield Ok(Event::default()
                    .event("error")
                    .data(json!({"error": "Poll not found"}).to_string()));
                return;
            }
            Err(_) => {
                yield Ok(Event::default()
                    .event("error")
                    .data(json!({"error": "Database error"}).to_string()));
                return;
            }
        }

        loop {
            match rx.recv().await {
                Ok(SseEvent::VoteUpdate(update)) if update.poll.poll_id == poll_id => {
                    yield Ok(Event::default()
                        .event("vote_update")
                        .data(json!({
                            "options": update.poll.options,
                            "totalVotes": update.poll.total_votes,
                            "updatedOptionId": update.option_id,
                        }).to_string()));
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    debug!("Poll {} stream lagged by {} events", poll_id, skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("keep-alive"),
    )
}
