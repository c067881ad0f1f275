//! API integration tests

use anyhow::Result;
use anyhow::anyhow;
use axum::{
    Router,
    body::{Body, BodyDataStream},
    http::{Request, StatusCode, header::CONTENT_TYPE},
};
use chrono::{Duration, Utc};
use futures::StreamExt;
use pollpulse::auth::HeaderVerifier;
use pollpulse::db::{Database, Document, MemoryStore, Poll, PollOption};
use pollpulse::startup::{AppState, app};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::time::timeout;
use tower::ServiceExt; // for `oneshot`

fn create_test_app(document: Document) -> (Router, Database) {
    let db = Database::new(Arc::new(MemoryStore::with_document(document)));
    let state = AppState::new(db.clone(), Arc::new(HeaderVerifier));

    (app(state), db)
}

fn expired_poll() -> Poll {
    let now = Utc::now();
    Poll {
        poll_id: "expired".to_string(),
        creator_id: "someone".to_string(),
        question: "Too late?".to_string(),
        options: vec![
            PollOption {
                id: "1".to_string(),
                text: "Yes".to_string(),
                votes: 0,
                percentage: 0,
            },
            PollOption {
                id: "2".to_string(),
                text: "No".to_string(),
                votes: 0,
                percentage: 0,
            },
        ],
        theme: None,
        created_at: now - Duration::hours(30),
        expires_at: now - Duration::hours(6),
        is_public: true,
        total_votes: 0,
    }
}

async fn send(app: &Router, request: Request<Body>) -> Result<(StatusCode, Value)> {
    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;

    Ok((status, serde_json::from_slice(&body)?))
}

fn post_json(uri: &str, user_id: Option<&str>, body: Value) -> Result<Request<Body>> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(user_id) = user_id {
        builder = builder.header("x-user-id", user_id);
    }

    Ok(builder.body(Body::from(body.to_string()))?)
}

fn get(uri: &str, user_id: Option<&str>) -> Result<Request<Body>> {
    let mut builder = Request::builder().uri(uri);
    if let Some(user_id) = user_id {
        builder = builder.header("x-user-id", user_id);
    }

    Ok(builder.body(Body::empty())?)
}

fn new_poll_body() -> Value {
    json!({
        "question": "Which Base ecosystem project are you most excited about?",
        "options": ["Friend.tech", "Farcaster", "Coinbase Wallet"],
        "duration": 24,
        "isPublic": true,
    })
}

#[tokio::test]
async fn test_list_polls_empty() -> Result<()> {
    let (app, _db) = create_test_app(Document::default());

    let (status, body) = send(&app, get("/api/polls?filter=active&limit=5", None)?).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"], json!([]));
    assert!(body["timestamp"].is_string());

    Ok(())
}

#[tokio::test]
async fn test_create_poll_requires_identity() -> Result<()> {
    let (app, db) = create_test_app(Document::default());

    let (status, body) = send(&app, post_json("/api/polls", None, new_poll_body())?).await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Authentication required");
    assert!(db.snapshot().await?.polls.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_create_poll_and_vote_flow() -> Result<()> {
    let (app, db) = create_test_app(Document::default());

    let (status, body) =
        send(&app, post_json("/api/polls", Some("creator"), new_poll_body())?).await?;
    assert_eq!(status, StatusCode::CREATED);
    let poll_id = body["data"]["pollId"].as_str().expect("poll id").to_string();
    assert_eq!(body["data"]["options"][1]["id"], "2");

    let vote_uri = format!("/api/polls/{poll_id}/vote");
    let (status, body) = send(
        &app,
        post_json(&vote_uri, Some("voter"), json!({"optionId": "2"}))?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["selectedOption"], "2");
    assert_eq!(body["data"]["userId"], "voter");

    let (status, body) = send(&app, get(&format!("/api/polls/{poll_id}"), None)?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalVotes"], 1);
    assert_eq!(body["data"]["options"][1]["percentage"], 100);

    let (_, body) = send(&app, get("/api/users", Some("creator"))?).await?;
    assert_eq!(body["data"]["tokenBalance"], 50);

    let (_, body) = send(&app, get("/api/users/transactions", Some("voter"))?).await?;
    assert_eq!(body["data"][0]["type"], "vote_reward");
    assert_eq!(body["data"][0]["amount"], 10);

    let (status, body) = send(
        &app,
        post_json(&vote_uri, Some("voter"), json!({"optionId": "1"}))?,
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(db.snapshot().await?.votes.len(), 1);

    let (status, body) =
        send(&app, get(&format!("/api/polls/{poll_id}/analytics"), None)?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["uniqueVoters"], 1);

    Ok(())
}

#[tokio::test]
async fn test_vote_rejections() -> Result<()> {
    let document = Document {
        polls: vec![expired_poll()],
        ..Document::default()
    };
    let (app, _db) = create_test_app(document);

    let (status, _) = send(
        &app,
        post_json("/api/polls/expired/vote", Some("voter"), json!({"optionId": "1"}))?,
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        post_json("/api/polls/missing/vote", Some("voter"), json!({"optionId": "1"}))?,
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Poll not found");

    Ok(())
}

#[tokio::test]
async fn test_invalid_poll_is_rejected() -> Result<()> {
    let (app, _db) = create_test_app(Document::default());

    let body = json!({
        "question": "Pick one",
        "options": ["Only option", "  "],
        "duration": 24,
        "isPublic": true,
    });
    let (status, body) = send(&app, post_json("/api/polls", Some("creator"), body)?).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    Ok(())
}

#[tokio::test]
async fn test_unknown_poll_and_route() -> Result<()> {
    let (app, _db) = create_test_app(Document::default());

    let (status, _) = send(&app, get("/api/polls/nope", None)?).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, get("/api/polls/nope/votes", None)?).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, get("/nothing/here", None)?).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);

    Ok(())
}

#[tokio::test]
async fn test_health_endpoint() -> Result<()> {
    let (app, _db) = create_test_app(Document::default());

    let (status, body) = send(&app, get("/health", None)?).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["polls"], 0);

    Ok(())
}

async fn open_stream(app: &Router, uri: &str) -> Result<BodyDataStream> {
    let response = app.clone().oneshot(get(uri, None)?).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "text/event-stream");

    Ok(response.into_body().into_data_stream())
}

/// Reads one SSE frame and returns its event name and data payload.
async fn next_event(stream: &mut BodyDataStream) -> Result<(String, Value)> {
    let chunk = timeout(std::time::Duration::from_secs(5), stream.next())
        .await?
        .ok_or_else(|| anyhow!("stream ended"))??;
    let text = String::from_utf8(chunk.to_vec())?;

    let field = |name: &str| {
        text.lines()
            .find_map(|line| line.strip_prefix(name))
            .map(|value| value.trim().to_string())
            .ok_or_else(|| anyhow!("missing {name} in {text:?}"))
    };

    Ok((field("event:")?, serde_json::from_str(&field("data:")?)?))
}

#[tokio::test]
async fn test_poll_feed_stream() -> Result<()> {
    let document = Document {
        polls: vec![expired_poll()],
        ..Document::default()
    };
    let (app, _db) = create_test_app(document);

    let mut stream = open_stream(&app, "/api/stream/polls").await?;

    let (event, data) = next_event(&mut stream).await?;
    assert_eq!(event, "init");
    assert_eq!(data["polls"][0]["pollId"], "expired");

    let (_, body) = send(&app, post_json("/api/polls", Some("creator"), new_poll_body())?).await?;
    let poll_id = body["data"]["pollId"].as_str().expect("poll id").to_string();

    let (event, data) = next_event(&mut stream).await?;
    assert_eq!(event, "poll_created");
    assert_eq!(data["pollId"], poll_id.as_str());

    let vote_uri = format!("/api/polls/{poll_id}/vote");
    send(&app, post_json(&vote_uri, Some("voter"), json!({"optionId": "3"}))?).await?;

    let (event, data) = next_event(&mut stream).await?;
    assert_eq!(event, "poll_updated");
    assert_eq!(data["updatedOptionId"], "3");
    assert_eq!(data["poll"]["totalVotes"], 1);

    Ok(())
}

#[tokio::test]
async fn test_single_poll_stream() -> Result<()> {
    let (app, _db) = create_test_app(Document::default());

    let (_, body) = send(&app, post_json("/api/polls", Some("creator"), new_poll_body())?).await?;
    let poll_id = body["data"]["pollId"].as_str().expect("poll id").to_string();

    let mut stream = open_stream(&app, &format!("/api/stream/polls/{poll_id}")).await?;

    let (event, data) = next_event(&mut stream).await?;
    assert_eq!(event, "init");
    assert_eq!(data["totalVotes"], 0);

    let vote_uri = format!("/api/polls/{poll_id}/vote");
    send(&app, post_json(&vote_uri, Some("voter"), json!({"optionId": "1"}))?).await?;

    let (event, data) = next_event(&mut stream).await?;
    assert_eq!(event, "vote_update");
    assert_eq!(data["updatedOptionId"], "1");
    assert_eq!(data["totalVotes"], 1);
    assert_eq!(data["options"][0]["percentage"], 100);

    Ok(())
}

#[tokio::test]
async fn test_unknown_poll_stream_reports_error_and_ends() -> Result<()> {
    let (app, _db) = create_test_app(Document::default());

    let mut stream = open_stream(&app, "/api/stream/polls/nope").await?;

    let (event, data) = next_event(&mut stream).await?;
    assert_eq!(event, "error");
    assert_eq!(data["error"], "Poll not found");

    let end = timeout(std::time::Duration::from_secs(5), stream.next()).await?;
    assert!(end.is_none());

    Ok(())
}

#[tokio::test]
async fn test_overlong_duration_is_rejected() -> Result<()> {
    let (app, db) = create_test_app(Document::default());

    let mut body = new_poll_body();
    body["duration"] = json!(u32::MAX);
    let (status, body) = send(&app, post_json("/api/polls", Some("creator"), body)?).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(db.snapshot().await?.polls.is_empty());

    Ok(())
}
