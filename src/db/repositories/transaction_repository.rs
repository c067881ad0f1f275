use crate::db::connection::Database;
use crate::db::models::{NewTokenTransaction, TokenTransaction, TransactionType};
use crate::error::StoreError;
use crate::rewards;
use crate::utils::generate_id;
use chrono::Utc;

/// Appends a raw ledger entry. Balances are not touched; use
/// [`credit_reward`] for a paired credit.
pub async fn create_token_transaction(
    db: &Database,
    entry: NewTokenTransaction,
) -> Result<TokenTransaction, StoreError> {
    db.update(|document| {
        let transaction = TokenTransaction {
            tx_id: entry.tx_id.unwrap_or_else(generate_id),
            from_user_id: entry.from_user_id,
            to_user_id: entry.to_user_id,
            amount: entry.amount,
            kind: entry.kind,
            timestamp: entry.timestamp.unwrap_or_else(Utc::now),
        };
        document.token_transactions.push(transaction.clone());
        transaction
    })
    .await
}

/// Newest first, matching either side of the transfer.
pub async fn get_user_token_transactions(
    db: &Database,
    user_id: &str,
) -> Result<Vec<TokenTransaction>, StoreError> {
    let document = db.snapshot().await?;

    let mut transactions: Vec<_> = document
        .token_transactions
        .into_iter()
        .filter(|tx| tx.from_user_id.as_deref() == Some(user_id) || tx.to_user_id == user_id)
        .collect();
    transactions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    Ok(transactions)
}

/// Direct credit for reward types with no automatic trigger, such as
/// referral bonuses and boost payments.
pub async fn credit_reward(
    db: &Database,
    user_id: &str,
    amount: u64,
    kind: TransactionType,
    from_user_id: Option<&str>,
) -> Result<Option<TokenTransaction>, StoreError> {
    db.try_update(|document| rewards::credit(document, user_id, amount, kind, from_user_id))
        .await
}
