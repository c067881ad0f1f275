use crate::db::connection::Database;
use crate::db::models::{TransactionType, Vote};
use crate::error::StoreError;
use crate::rewards::{self, VOTE_REWARD};
use crate::utils::{calculate_percentages, generate_id};
use chrono::Utc;
use tracing::{debug, info};

/// Records a vote and credits the voter. Returns `None` without writing when
/// the user already voted, the poll is missing or expired, or the option does
/// not belong to the poll.
pub async fn create_vote(
    db: &Database,
    user_id: &str,
    poll_id: &str,
    option_id: &str,
) -> Result<Option<Vote>, StoreError> {
    let vote = db
        .try_update(|document| {
            if document
                .votes
                .iter()
                .any(|v| v.user_id == user_id && v.poll_id == poll_id)
            {
                debug!("{} already voted on {}", user_id, poll_id);
                return None;
            }

            let now = Utc::now();
            let poll = document.polls.iter_mut().find(|p| p.poll_id == poll_id)?;
            if poll.is_expired_at(now) {
                debug!("Poll {} has expired", poll_id);
                return None;
            }

            let option = poll.options.iter_mut().find(|opt| opt.id == option_id)?;
            option.votes += 1;
            poll.total_votes += 1;
            calculate_percentages(&mut poll.options);

            let vote = Vote {
                vote_id: generate_id(),
                user_id: user_id.to_string(),
                poll_id: poll_id.to_string(),
                selected_option: option_id.to_string(),
                voted_at: now,
            };
            document.votes.push(vote.clone());

            rewards::credit(
                document,
                user_id,
                VOTE_REWARD,
                TransactionType::VoteReward,
                None,
            );

            Some(vote)
        })
        .await?;

    if let Some(vote) = &vote {
        info!("Vote {} recorded on poll {}", vote.vote_id, poll_id);
    }

    Ok(vote)
}

pub async fn get_poll_votes(db: &Database, poll_id: &str) -> Result<Vec<Vote>, StoreError> {
    let document = db.snapshot().await?;

    Ok(document
        .votes
        .into_iter()
        .filter(|v| v.poll_id == poll_id)
        .collect())
}

pub async fn user_has_voted(
    db: &Database,
    poll_id: &str,
    user_id: &str,
) -> Result<bool, StoreError> {
    let document = db.snapshot().await?;

    Ok(document
        .votes
        .iter()
        .any(|v| v.poll_id == poll_id && v.user_id == user_id))
}
