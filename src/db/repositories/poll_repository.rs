use crate::db::connection::Database;
use crate::db::models::{
    CreatePollData, OptionDistribution, Poll, PollAnalytics, PollFilter, PollOption,
    TransactionType,
};
use crate::error::{AppError, StoreError};
use crate::rewards::{self, CREATE_POLL_REWARD};
use crate::utils::{POLL_THEMES, generate_id, validate_string_length};
use chrono::{Duration, Timelike, Utc};
use std::collections::{BTreeMap, HashSet};
use tracing::info;

pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 6;
pub const MAX_QUESTION_LEN: usize = 200;
pub const MAX_OPTION_LEN: usize = 100;
pub const MAX_DURATION_HOURS: u32 = 168;

pub async fn list_polls(
    db: &Database,
    filter: PollFilter,
    limit: usize,
    offset: usize,
) -> Result<Vec<Poll>, StoreError> {
    let mut polls = db.snapshot().await?.polls;

    match filter {
        PollFilter::Trending => polls.sort_by(|a, b| b.total_votes.cmp(&a.total_votes)),
        PollFilter::Recent => polls.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        PollFilter::Active => {
            let now = Utc::now();
            polls.retain(|poll| poll.expires_at > now);
        }
        PollFilter::All => {}
    }

    Ok(polls.into_iter().skip(offset).take(limit).collect())
}

pub async fn get_poll(db: &Database, poll_id: &str) -> Result<Option<Poll>, StoreError> {
    let document = db.snapshot().await?;

    Ok(document.polls.into_iter().find(|p| p.poll_id == poll_id))
}

/// Validates and stores a new poll, crediting the creator in the same write.
pub async fn create_poll(
    db: &Database,
    creator_id: &str,
    data: CreatePollData,
) -> Result<Poll, AppError> {
    let (question, option_texts) = validate_poll_data(&data)?;

    let now = Utc::now();
    let expires_at = Duration::try_hours(i64::from(data.duration))
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| AppError::Validation("Duration is too long".to_string()))?;
    let poll = Poll {
        poll_id: generate_id(),
        creator_id: creator_id.to_string(),
        question,
        options: option_texts
            .into_iter()
            .enumerate()
            .map(|(index, text)| PollOption {
                id: (index + 1).to_string(),
                text,
                votes: 0,
                percentage: 0,
            })
            .collect(),
        theme: data.theme,
        created_at: now,
        expires_at,
        is_public: data.is_public,
        total_votes: 0,
    };

    let stored = poll.clone();
    db.update(move |document| {
        document.polls.push(stored);
        rewards::credit(
            document,
            creator_id,
            CREATE_POLL_REWARD,
            TransactionType::CreateReward,
            None,
        );
    })
    .await?;

    info!("Poll {} created by {}", poll.poll_id, creator_id);
    Ok(poll)
}

pub async fn get_poll_analytics(
    db: &Database,
    poll_id: &str,
) -> Result<Option<PollAnalytics>, StoreError> {
    let document = db.snapshot().await?;

    let Some(poll) = document.polls.into_iter().find(|p| p.poll_id == poll_id) else {
        return Ok(None);
    };

    let votes: Vec<_> = document
        .votes
        .iter()
        .filter(|v| v.poll_id == poll_id)
        .collect();

    let unique_voters = votes
        .iter()
        .map(|v| v.user_id.as_str())
        .collect::<HashSet<_>>()
        .len();

    let mut vote_timeline = BTreeMap::new();
    for vote in &votes {
        *vote_timeline.entry(vote.voted_at.hour()).or_insert(0) += 1;
    }

    let vote_distribution = poll
        .options
        .iter()
        .map(|opt| OptionDistribution {
            option: opt.text.clone(),
            votes: opt.votes,
            percentage: opt.percentage,
        })
        .collect();

    Ok(Some(PollAnalytics {
        total_votes: poll.total_votes,
        poll,
        unique_voters,
        vote_distribution,
        vote_timeline,
    }))
}

/// Returns the trimmed question and the trimmed, non-blank options.
fn validate_poll_data(data: &CreatePollData) -> Result<(String, Vec<String>), AppError> {
    let question = data.question.trim();
    validate_string_length(question, "Question", 1, MAX_QUESTION_LEN)?;

    let options: Vec<String> = data
        .options
        .iter()
        .map(|opt| opt.trim())
        .filter(|opt| !opt.is_empty())
        .map(str::to_string)
        .collect();

    if options.len() < MIN_OPTIONS || options.len() > MAX_OPTIONS {
        return Err(AppError::Validation(format!(
            "Polls need between {MIN_OPTIONS} and {MAX_OPTIONS} options"
        )));
    }

    let mut seen = HashSet::new();
    for option in &options {
        validate_string_length(option, "Option", 1, MAX_OPTION_LEN)?;
        if !seen.insert(option.as_str()) {
            return Err(AppError::Validation(format!(
                "Duplicate option: {option}"
            )));
        }
    }

    if data.duration == 0 {
        return Err(AppError::Validation(
            "Duration must be at least one hour".to_string(),
        ));
    }
    if data.duration > MAX_DURATION_HOURS {
        return Err(AppError::Validation(format!(
            "Duration cannot exceed {MAX_DURATION_HOURS} hours"
        )));
    }

    if let Some(theme) = data.theme.as_deref() {
        if !POLL_THEMES.contains(&theme) {
            return Err(AppError::Validation(format!("Unknown theme: {theme}")));
        }
    }

    Ok((question.to_string(), options))
}
