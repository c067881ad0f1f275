use crate::db::models::Poll;

#[derive(Debug, Clone)]
pub struct PollUpdate {
    pub poll: Poll,
    pub option_id: String,
}

#[derive(Debug, Clone)]
pub enum SseEvent {
    VoteUpdate(PollUpdate),
    PollCreated(Poll),
}

pub type SseSender = tokio::sync::broadcast::Sender<SseEvent>;
