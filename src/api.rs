//! HTTP API for the expense chat

mod handlers;
mod sessions;
mod sse;
mod types;

pub use handlers::create_router;
pub use sessions::SessionRegistry;

use crate::chat::ChatSurface;
use std::sync::Arc;
use std::time::Duration;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatSurface>,
    pub sessions: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(chat: ChatSurface, session_idle: Duration) -> Self {
        Self {
            chat: Arc::new(chat),
            sessions: Arc::new(SessionRegistry::new(session_idle)),
        }
    }
}
