//! Reward ledger. A credit bumps the user's balance and appends the matching
//! transaction inside the same document mutation, so both land or neither does.

use crate::db::models::{Document, TokenTransaction, TransactionType};
use crate::utils::generate_id;
use chrono::Utc;
use tracing::{info, warn};

pub const VOTE_REWARD: u64 = 10;
pub const CREATE_POLL_REWARD: u64 = 50;
pub const REFERRAL_REWARD: u64 = 100;
pub const DAILY_BONUS: u64 = 25;

/// Returns `None`, leaving the document untouched, when the user is unknown.
pub fn credit(
    document: &mut Document,
    user_id: &str,
    amount: u64,
    kind: TransactionType,
    from_user_id: Option<&str>,
) -> Option<TokenTransaction> {
    let Some(user) = document.users.iter_mut().find(|u| u.user_id == user_id) else {
        warn!("Skipping {:?} credit for unknown user {}", kind, user_id);
        return None;
    };

    user.token_balance = user.token_balance.saturating_add(amount);

    let transaction = TokenTransaction {
        tx_id: generate_id(),
        from_user_id: from_user_id.map(str::to_string),
        to_user_id: user_id.to_string(),
        amount,
        kind,
        timestamp: Utc::now(),
    };
    document.token_transactions.push(transaction.clone());

    info!("Credited {} tokens ({:?}) to {}", amount, kind, user_id);
    Some(transaction)
}
