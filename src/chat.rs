//! Chat surface: session start and per-message dispatch
//!
//! Every inbound message produces exactly one outbound reply. Failures below
//! this layer are turned into reply text here; only session start can fail.

use crate::command::{self, Command, RowNumber, UsageError};
use crate::config::{ConfigError, API_KEY_VAR};
use crate::ledger::{Ledger, LedgerError, Record};
use crate::llm::{LlmConfig, LlmError, ServiceFactory};
use crate::session::{Agent, Conversation, AGENT_INSTRUCTIONS, AGENT_NAME};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

pub const WELCOME_MESSAGE: &str = "✨ **Welcome to the Expense ChatBot!** ✨\n\
*I can add, edit, and remove expenses in your Google Sheet, and help you with your questions.*\n\
- ➕ `Add [category] [amount]`\n\
- ✏️ `Edit [row_number] [category] [amount]`\n\
- ❌ `Remove [row_number]`\n\
- 📄 `Show`\n\
- 💬 Or ask anything.";

pub const NO_RECORDS: &str = "📄 No records found.";

/// Per-message failure; `Display` is the reply the user sees
#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Usage(#[from] UsageError),
    #[error("⚠️ Row {row} does not exist. The sheet has {count} rows.")]
    InvalidRow { row: String, count: usize },
    #[error("⚠️ Could not reach the expense sheet: {0}")]
    StoreUnavailable(String),
    #[error("⚠️ The assistant is unavailable right now: {0}")]
    LlmUnavailable(#[from] LlmError),
}

impl From<LedgerError> for ChatError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InvalidRow { row, count } => ChatError::InvalidRow {
                row: row.to_string(),
                count,
            },
            LedgerError::Unavailable(e) => ChatError::StoreUnavailable(e.to_string()),
        }
    }
}

/// Who wrote a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Author {
    User,
    Assistant,
}

/// A message as shown in the chat UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub author: Author,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Author::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Author::Assistant, content)
    }

    fn new(author: Author, content: impl Into<String>) -> Self {
        Self {
            author,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// Delivery of outbound messages to the UI layer
#[async_trait]
pub trait Outbox: Send + Sync {
    async fn send(&self, message: ChatMessage);
}

/// Everything one chat session needs, created at session start
pub struct ChatSession {
    id: String,
    conversation: Conversation,
    outbox: Arc<dyn Outbox>,
}

#[cfg(test)]
impl ChatSession {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }
}

/// Shared entry points for all sessions
pub struct ChatSurface {
    ledger: Arc<Ledger>,
    llm_config: LlmConfig,
    service_factory: ServiceFactory,
}

impl ChatSurface {
    pub fn new(ledger: Arc<Ledger>, llm_config: LlmConfig, service_factory: ServiceFactory) -> Self {
        Self {
            ledger,
            llm_config,
            service_factory,
        }
    }

    /// Bind a model client for the new session and greet the user
    pub async fn start_session(
        &self,
        id: impl Into<String>,
        outbox: Arc<dyn Outbox>,
    ) -> Result<ChatSession, ConfigError> {
        let id = id.into();

        if self.llm_config.api_key.as_deref().is_none_or(str::is_empty) {
            return Err(ConfigError::MissingVar(API_KEY_VAR));
        }

        let service = (self.service_factory)(&self.llm_config)?;
        let agent = Agent::new(AGENT_NAME, AGENT_INSTRUCTIONS, service);

        tracing::info!(session = %id, model = %agent.model_id(), "Chat session started");

        let session = ChatSession {
            id,
            conversation: Conversation::new(Arc::new(agent)),
            outbox,
        };
        session
            .outbox
            .send(ChatMessage::assistant(WELCOME_MESSAGE))
            .await;

        Ok(session)
    }

    /// Handle one inbound message and send its reply
    pub async fn on_message(&self, session: &mut ChatSession, text: &str) -> String {
        let content = text.trim();

        let reply = match self.dispatch(&mut session.conversation, content).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(session = %session.id, error = ?e, "Message handling failed");
                e.to_string()
            }
        };

        session
            .outbox
            .send(ChatMessage::assistant(reply.clone()))
            .await;
        reply
    }

    async fn dispatch(
        &self,
        conversation: &mut Conversation,
        content: &str,
    ) -> Result<String, ChatError> {
        let command = command::parse(content)?;
        tracing::debug!(command = %command.kind(), "Dispatching message");

        match command {
            Command::Add { category, amount } => {
                self.ledger.append(&category, &amount).await?;
                Ok(format!("✅ Added: {category} - {amount}"))
            }
            Command::Edit {
                row,
                category,
                amount,
            } => {
                let index = self.row_index(&row).await?;
                self.ledger.update(index, &category, &amount).await?;
                Ok(format!("✏️ Edited row {row}: {category} - {amount}"))
            }
            Command::Remove { row } => {
                let index = self.row_index(&row).await?;
                self.ledger.delete(index).await?;
                Ok(format!("❌ Removed row {row}"))
            }
            Command::Show => {
                let rows = self.ledger.list_all().await?;
                Ok(render_rows(&rows))
            }
            Command::Freeform(text) => Ok(conversation.exchange(&text).await?),
        }
    }

    /// Rows too large for an index cannot exist; report them as typed
    async fn row_index(&self, row: &RowNumber) -> Result<usize, ChatError> {
        match row.index() {
            Some(index) => Ok(index),
            None => Err(ChatError::InvalidRow {
                row: row.to_string(),
                count: self.ledger.row_count().await?,
            }),
        }
    }
}

/// `1: a | b | c` per row, or the no-records sentinel
pub fn render_rows(rows: &[Record]) -> String {
    if rows.is_empty() {
        return NO_RECORDS.to_string();
    }
    rows.iter()
        .enumerate()
        .map(|(idx, row)| format!("{}: {}", idx + 1, row.join(" | ")))
        .collect::<Vec<_>>()
        .join("\n")
}
