use crate::sse::models::{SseEvent, SseSender};
use tokio::sync::broadcast;
use tracing::trace;

pub fn create_sse_broadcaster() -> SseSender {
    let (tx, _rx) = broadcast::channel(100);
    tx
}

/// Fan an event out to every open stream. Having no subscribers is normal.
pub fn publish(sse_tx: &SseSender, event: SseEvent) {
    if sse_tx.send(event).is_err() {
        trace!("No SSE subscribers, event dropped");
    }
}
