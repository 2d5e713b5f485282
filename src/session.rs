//! Conversation session: rolling history plus the agent that answers it
//!
//! A `Conversation` only exists once a chat has started, so holding one is
//! what "active" means. It is owned by the per-session context and handed to
//! each free-form turn explicitly.

use crate::llm::{LlmError, LlmMessage, LlmRequest, LlmService};
use std::sync::Arc;

pub const AGENT_NAME: &str = "SimpleBot";
pub const AGENT_INSTRUCTIONS: &str = "You are a helpful assistant.";

/// A named model binding with fixed instructions
pub struct Agent {
    name: String,
    instructions: String,
    service: Arc<dyn LlmService>,
}

/// Outcome of one agent run
#[derive(Debug, Clone)]
pub struct RunResult {
    pub final_output: String,
    /// The input history followed by the assistant's reply
    pub history: Vec<LlmMessage>,
}

impl Agent {
    pub fn new(
        name: impl Into<String>,
        instructions: impl Into<String>,
        service: Arc<dyn LlmService>,
    ) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            service,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model_id(&self) -> &str {
        self.service.model_id()
    }

    /// Run one completion over `input` and report the extended history.
    pub async fn run(&self, input: &[LlmMessage]) -> Result<RunResult, LlmError> {
        let request = LlmRequest {
            system: Some(self.instructions.clone()),
            messages: input.to_vec(),
            max_tokens: None,
        };

        let response = self.service.complete(&request).await?;

        let mut history = input.to_vec();
        history.push(LlmMessage::assistant(response.text.clone()));

        Ok(RunResult {
            final_output: response.text,
            history,
        })
    }
}

/// Per-session conversation state
pub struct Conversation {
    agent: Arc<Agent>,
    history: Vec<LlmMessage>,
}

impl Conversation {
    pub fn new(agent: Arc<Agent>) -> Self {
        Self {
            agent,
            history: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn history(&self) -> &[LlmMessage] {
        &self.history
    }

    /// Send `text` with the full history and keep the agent's updated history.
    ///
    /// On failure the stored history is left as it was before the call.
    pub async fn exchange(&mut self, text: &str) -> Result<String, LlmError> {
        let mut input = self.history.clone();
        input.push(LlmMessage::user(text));

        let result = self.agent.run(&input).await?;
        self.history = result.history;

        tracing::debug!(
            agent = %self.agent.name(),
            history_len = self.history.len(),
            "Conversation turn complete"
        );

        Ok(result.final_output)
    }
}
