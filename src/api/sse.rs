//! Server-Sent Events for outbound chat messages

use crate::chat::ChatMessage;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Stream the transcript so far, then every message as it is sent
pub fn sse_stream(
    transcript: Vec<ChatMessage>,
    broadcast_rx: tokio::sync::broadcast::Receiver<ChatMessage>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let init = futures::stream::once(async move { Ok(init_event(&transcript)) });

    let broadcasts = BroadcastStream::new(broadcast_rx).filter_map(|result| match result {
        Ok(message) => Some(Ok(message_event(&message))),
        Err(_) => None, // Skip lagged messages
    });

    Sse::new(init.chain(broadcasts)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn init_event(transcript: &[ChatMessage]) -> Event {
    let data = json!({ "type": "init", "messages": transcript });
    Event::default().event("init").data(data.to_string())
}

fn message_event(message: &ChatMessage) -> Event {
    let data = json!({ "type": "message", "message": message });
    Event::default().event("message").data(data.to_string())
}
