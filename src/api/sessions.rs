//! Live chat sessions and their UI channels
//!
//! A session ends on an explicit delete, or once it has been idle for the
//! configured timeout with no stream attached.

use crate::chat::{ChatMessage, ChatSession, ChatSurface, Outbox};
use crate::config::ConfigError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, Mutex as AsyncMutex, RwLock};
use tokio::task::JoinHandle;

const CHANNEL_CAPACITY: usize = 64;
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Transcript plus live fan-out of outbound messages for one session
pub struct SessionChannel {
    transcript: Mutex<Vec<ChatMessage>>,
    events: broadcast::Sender<ChatMessage>,
}

impl SessionChannel {
    fn new() -> Self {
        let (events, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            transcript: Mutex::new(Vec::new()),
            events,
        }
    }

    /// Record a message the user sent
    pub fn record_inbound(&self, text: &str) {
        self.publish(ChatMessage::user(text));
    }

    pub fn transcript(&self) -> Vec<ChatMessage> {
        self.lock_transcript().clone()
    }

    /// Snapshot and subscription taken together so no message falls between
    pub fn subscribe(&self) -> (Vec<ChatMessage>, broadcast::Receiver<ChatMessage>) {
        let transcript = self.lock_transcript();
        (transcript.clone(), self.events.subscribe())
    }

    fn has_subscribers(&self) -> bool {
        self.events.receiver_count() > 0
    }

    fn publish(&self, message: ChatMessage) {
        let mut transcript = self.lock_transcript();
        transcript.push(message.clone());
        // No subscribers is fine; the transcript still has it
        let _ = self.events.send(message);
    }

    fn lock_transcript(&self) -> std::sync::MutexGuard<'_, Vec<ChatMessage>> {
        self.transcript
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Outbox for SessionChannel {
    async fn send(&self, message: ChatMessage) {
        self.publish(message);
    }
}

/// One live session: its context behind a lock, and its channel
pub struct SessionEntry {
    pub session: AsyncMutex<ChatSession>,
    pub channel: Arc<SessionChannel>,
    last_active: Mutex<Instant>,
}

impl SessionEntry {
    fn touch(&self) {
        *self.last_active.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    /// An open stream keeps the session alive however long it is quiet
    fn is_idle(&self, now: Instant, timeout: Duration) -> bool {
        let last_active = *self.last_active.lock().unwrap_or_else(PoisonError::into_inner);
        !self.channel.has_subscribers() && now.saturating_duration_since(last_active) >= timeout
    }
}

/// All live sessions, keyed by id
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<SessionEntry>>>,
    idle_timeout: Duration,
}

impl SessionRegistry {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
        }
    }

    /// Start a session and return its id and the messages sent so far
    pub async fn start(&self, chat: &ChatSurface) -> Result<(String, Vec<ChatMessage>), ConfigError> {
        let id = uuid::Uuid::new_v4().to_string();
        let channel = Arc::new(SessionChannel::new());
        let session = chat.start_session(id.clone(), channel.clone()).await?;
        let messages = channel.transcript();

        self.sessions.write().await.insert(
            id.clone(),
            Arc::new(SessionEntry {
                session: AsyncMutex::new(session),
                channel,
                last_active: Mutex::new(Instant::now()),
            }),
        );

        Ok((id, messages))
    }

    /// Look up a session; any lookup counts as activity
    pub async fn get(&self, id: &str) -> Option<Arc<SessionEntry>> {
        let entry = self.sessions.read().await.get(id).cloned()?;
        entry.touch();
        Some(entry)
    }

    /// Discard a session; false if it did not exist
    pub async fn end(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            tracing::info!(session = %id, "Chat session ended");
        }
        removed
    }

    /// End every session idle as of `now`; returns how many were removed
    pub async fn sweep_idle(&self, now: Instant) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, entry| {
            let idle = entry.is_idle(now, self.idle_timeout);
            if idle {
                tracing::info!(session = %id, "Chat session expired");
            }
            !idle
        });
        before - sessions.len()
    }

    /// Sweep idle sessions periodically until the registry is dropped
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let registry: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                ticker.tick().await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                let expired = registry.sweep_idle(Instant::now()).await;
                if expired > 0 {
                    tracing::debug!(expired, "Swept idle chat sessions");
                }
            }
        })
    }
}
