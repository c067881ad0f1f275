use crate::db::{self, PollFilter};
use crate::sse::models::SseEvent;
use crate::startup::AppState;
use axum::{
    extract::Extension,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use serde_json::json;
use std::{convert::Infallible, time::Duration};
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

const INITIAL_FEED_SIZE: usize = 50;

pub async fn all_polls_sse(
    Extension(app_state): Extension<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = app_state.sse_tx.subscribe();

    let stream = async_stream::stream! {
        match db::list_polls(&app_state.db, PollFilter::Recent, INITIAL_FEED_SIZE, 0).await {
            Ok(polls) => {
                yield Ok(Event::default()
                    .event("init")
                    .data(json!({"polls": polls}).to_string()));
            }
            Err(_) => {
                yield Ok(Event::default()
                    .event("error")
                    .data(json!({"error": "Failed to load polls"}).to_string()));
            }
        }

        loop {
            match rx.recv().await {
                Ok(SseEvent::PollCreated(poll)) => {
                    yield Ok(Event::default()
                        .event("poll_created")
                        .data(json!({
                            "pollId": poll.poll_id,
                            "poll": poll,
                        }).to_string()));
                }
                Ok(SseEvent::VoteUpdate(update)) => {
                    yield Ok(Event::default()
                        .event("poll_updated")
                        .data(json!({
                            "pollId": update.poll.poll_id,
                            "updatedOptionId": update.option_id,
                            "poll": update.poll,
                        }).to_string()));
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!("Poll feed stream lagged by {} events", skipped);
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
