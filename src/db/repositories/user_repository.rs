use crate::db::connection::Database;
use crate::db::models::{Document, NewUser, User};
use crate::error::StoreError;
use crate::utils::generate_id;
use chrono::Utc;
use tracing::info;

pub async fn get_user(db: &Database, user_id: &str) -> Result<Option<User>, StoreError> {
    let document = db.snapshot().await?;

    Ok(document.users.into_iter().find(|u| u.user_id == user_id))
}

pub async fn create_user(db: &Database, new_user: NewUser) -> Result<User, StoreError> {
    db.update(|document| insert_user(document, new_user)).await
}

/// Looks up the user, provisioning it on first contact. The lookup and the
/// insert happen in one cycle so concurrent first requests create one record.
pub async fn get_or_create_user(db: &Database, new_user: NewUser) -> Result<User, StoreError> {
    if let Some(user_id) = new_user.user_id.as_deref() {
        if let Some(user) = get_user(db, user_id).await? {
            return Ok(user);
        }
    }

    db.update(|document| {
        let existing = new_user
            .user_id
            .as_deref()
            .and_then(|id| document.users.iter().find(|u| u.user_id == id))
            .cloned();

        match existing {
            Some(user) => user,
            None => {
                let user = insert_user(document, new_user);
                info!("Provisioned user {}", user.user_id);
                user
            }
        }
    })
    .await
}

/// Adds `delta` to the balance, clamping at zero. `None` if the user is unknown.
pub async fn update_user_token_balance(
    db: &Database,
    user_id: &str,
    delta: i64,
) -> Result<Option<User>, StoreError> {
    db.try_update(|document| {
        let user = document.users.iter_mut().find(|u| u.user_id == user_id)?;
        user.token_balance = if delta >= 0 {
            user.token_balance.saturating_add(delta as u64)
        } else {
            user.token_balance.saturating_sub(delta.unsigned_abs())
        };
        Some(user.clone())
    })
    .await
}

fn insert_user(document: &mut Document, new_user: NewUser) -> User {
    let user = User {
        user_id: new_user.user_id.unwrap_or_else(generate_id),
        wallet_address: new_user.wallet_address,
        farcaster_id: new_user.farcaster_id,
        token_balance: new_user.token_balance.unwrap_or(0),
        created_at: Utc::now(),
    };

    document.users.push(user.clone());
    user
}
