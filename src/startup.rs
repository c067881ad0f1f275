use crate::auth::{
    FARCASTER_ID_HEADER, HeaderVerifier, IdentityVerifier, USER_ID_HEADER, WALLET_ADDRESS_HEADER,
};
use crate::config::Config;
use crate::db::connection::{Database, JsonFileStore, PgDocumentStore, init_db};
use crate::error::AppError;
use crate::retry::with_retry;
use crate::sse::{SseSender, all_polls_sse, create_sse_broadcaster, poll_updates_sse};
use crate::{polls, users};
use axum::{
    Json, Router,
    extract::Extension,
    http::{
        HeaderName, Method, StatusCode,
        header::{ACCEPT, CONTENT_TYPE},
    },
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub verifier: Arc<dyn IdentityVerifier>,
    pub sse_tx: SseSender,
}

impl AppState {
    pub fn new(db: Database, verifier: Arc<dyn IdentityVerifier>) -> Self {
        AppState {
            db,
            verifier,
            sse_tx: create_sse_broadcaster(),
        }
    }

    /// Builds the state the server runs with: Postgres when `DATABASE_URL`
    /// is set, the JSON file otherwise.
    pub async fn from_config(config: &Config) -> Result<Self, AppError> {
        let db = match config.database_url.as_deref() {
            Some(url) => {
                let pool = with_retry(
                    move || async move { init_db(url).await.map_err(AppError::from) },
                    5,
                    Duration::from_millis(500),
                )
                .await?;
                info!("Using Postgres document store");
                Database::new(Arc::new(PgDocumentStore::new(pool)))
            }
            None => {
                info!("Using JSON document store at {}", config.data_path.display());
                Database::new(Arc::new(JsonFileStore::new(config.data_path.clone())))
            }
        };

        warn!(
            "Identity is taken from request headers without verification; do not expose this server publicly"
        );

        Ok(AppState::new(db, Arc::new(HeaderVerifier)))
    }
}

pub fn app(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/polls", get(polls::list_polls).post(polls::create_poll))
        .route("/api/polls/:poll_id", get(polls::get_poll))
        .route("/api/polls/:poll_id/vote", post(polls::vote_on_poll))
        .route("/api/polls/:poll_id/votes", get(polls::get_poll_votes))
        .route("/api/polls/:poll_id/analytics", get(polls::get_poll_analytics))
        .route("/api/users", get(users::current_user))
        .route("/api/users/transactions", get(users::user_transactions))
        .route("/api/stream/polls", get(all_polls_sse))
        .route("/api/stream/polls/:poll_id", get(poll_updates_sse))
        .fallback(handler_404)
        .layer(Extension(app_state))
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::mirror_request())
                .allow_credentials(true)
                .allow_methods([Method::POST, Method::GET, Method::OPTIONS])
                .allow_headers([
                    CONTENT_TYPE,
                    ACCEPT,
                    HeaderName::from_static(USER_ID_HEADER),
                    HeaderName::from_static(WALLET_ADDRESS_HEADER),
                    HeaderName::from_static(FARCASTER_ID_HEADER),
                ]),
        )
        .layer(TraceLayer::new_for_http())
}

async fn health(Extension(app_state): Extension<AppState>) -> Result<impl IntoResponse, AppError> {
    let document = app_state.db.snapshot().await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "users": document.users.len(),
            "polls": document.polls.len(),
            "votes": document.votes.len(),
            "tokenTransactions": document.token_transactions.len(),
            "lastUpdated": document.last_updated,
        })),
    ))
}

async fn handler_404() -> impl IntoResponse {
    AppError::NotFound("Route".to_string())
}
