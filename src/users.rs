use crate::auth::authenticate;
use crate::db;
use crate::error::AppError;
use crate::response::ApiResponse;
use crate::startup::AppState;
use axum::{extract::Extension, http::HeaderMap, response::IntoResponse};

/// The authenticated caller, provisioned on first contact.
pub async fn current_user(
    Extension(app_state): Extension<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let user = authenticate(&app_state, &headers).await?;

    Ok(ApiResponse::ok(user))
}

pub async fn user_transactions(
    Extension(app_state): Extension<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let user = authenticate(&app_state, &headers).await?;
    let transactions = db::get_user_token_transactions(&app_state.db, &user.user_id).await?;

    Ok(ApiResponse::ok(transactions))
}
