use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub farcaster_id: Option<String>,
    pub token_balance: u64,
    pub created_at: DateTime<Utc>,
}

/// Partial user as supplied on first contact.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub user_id: Option<String>,
    pub wallet_address: Option<String>,
    pub farcaster_id: Option<String>,
    pub token_balance: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    pub poll_id: String,
    pub creator_id: String,
    pub question: String,
    pub options: Vec<PollOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_public: bool,
    pub total_votes: u64,
}

impl Poll {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOption {
    pub id: String,
    pub text: String,
    pub votes: u64,
    pub percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub vote_id: String,
    pub user_id: String,
    pub poll_id: String,
    pub selected_option: String,
    pub voted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    VoteReward,
    CreateReward,
    ReferralBonus,
    BoostPayment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenTransaction {
    pub tx_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_user_id: Option<String>,
    pub to_user_id: String,
    pub amount: u64,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTokenTransaction {
    pub tx_id: Option<String>,
    pub from_user_id: Option<String>,
    pub to_user_id: String,
    pub amount: u64,
    pub kind: TransactionType,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Client payload for poll creation. `duration` is in hours.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollData {
    pub question: String,
    pub options: Vec<String>,
    pub duration: u32,
    #[serde(default = "default_public")]
    pub is_public: bool,
    #[serde(default)]
    pub theme: Option<String>,
}

fn default_public() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollFilter {
    #[default]
    All,
    Trending,
    Recent,
    Active,
}

impl PollFilter {
    /// Unrecognised filters fall back to `All`.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "trending" => PollFilter::Trending,
            "recent" => PollFilter::Recent,
            "active" => PollFilter::Active,
            _ => PollFilter::All,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionDistribution {
    pub option: String,
    pub votes: u64,
    pub percentage: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollAnalytics {
    pub poll: Poll,
    pub total_votes: u64,
    pub unique_voters: usize,
    pub vote_distribution: Vec<OptionDistribution>,
    /// Votes keyed by UTC hour of day.
    pub vote_timeline: BTreeMap<u32, u64>,
}

/// The persisted document. Every collection lives here and is saved whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub polls: Vec<Poll>,
    #[serde(default)]
    pub votes: Vec<Vote>,
    #[serde(default)]
    pub token_transactions: Vec<TokenTransaction>,
    pub last_updated: DateTime<Utc>,
}

impl Default for Document {
    fn default() -> Self {
        Document {
            users: Vec::new(),
            polls: Vec::new(),
            votes: Vec::new(),
            token_transactions: Vec::new(),
            last_updated: Utc::now(),
        }
    }
}
