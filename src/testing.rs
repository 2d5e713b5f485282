//! Mock implementations for testing
//!
//! Stand-ins for the language model, the remote worksheet and the UI outbox
//! so the chat flow can be exercised without network I/O.

use crate::chat::{ChatMessage, Outbox};
use crate::ledger::{Record, SheetError, Worksheet};
use crate::llm::{LlmConfig, LlmError, LlmRequest, LlmResponse, LlmService, ServiceFactory};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

// ============================================================================
// Mock LLM Service
// ============================================================================

/// Mock language model that returns queued responses
pub struct MockLlmService {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    model_id: String,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlmService {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response
    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Factory that hands every session this same mock
    pub fn factory(self: &Arc<Self>) -> ServiceFactory {
        let mock = Arc::clone(self);
        Arc::new(
            move |_config: &LlmConfig| -> Result<Arc<dyn LlmService>, LlmError> {
                Ok(mock.clone())
            },
        )
    }
}

#[async_trait]
impl LlmService for MockLlmService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// In-memory worksheet
// ============================================================================

/// Worksheet held in memory, with optional forced failure
#[derive(Default)]
pub struct MemorySheet {
    rows: Mutex<Vec<Record>>,
    failure: Mutex<Option<String>>,
    mutations: Mutex<usize>,
}

impl MemorySheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<Record>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Self::default()
        }
    }

    /// Make every following call fail with `message`
    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn rows(&self) -> Vec<Record> {
        self.rows.lock().unwrap().clone()
    }

    /// Number of successful writes
    pub fn mutations(&self) -> usize {
        *self.mutations.lock().unwrap()
    }

    fn check(&self) -> Result<(), SheetError> {
        match self.failure.lock().unwrap().as_ref() {
            Some(message) => Err(SheetError::new(message.clone())),
            None => Ok(()),
        }
    }

    fn record_mutation(&self) {
        *self.mutations.lock().unwrap() += 1;
    }
}

#[async_trait]
impl Worksheet for MemorySheet {
    async fn append_row(&self, cells: &[String]) -> Result<(), SheetError> {
        self.check()?;
        self.rows.lock().unwrap().push(cells.to_vec());
        self.record_mutation();
        Ok(())
    }

    async fn delete_row(&self, row: usize) -> Result<(), SheetError> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        if row == 0 || row > rows.len() {
            return Err(SheetError::new(format!("row {row} out of bounds")));
        }
        rows.remove(row - 1);
        drop(rows);
        self.record_mutation();
        Ok(())
    }

    async fn get_all_values(&self) -> Result<Vec<Record>, SheetError> {
        self.check()?;
        Ok(self.rows())
    }

    async fn update_row(&self, row: usize, cells: &[String]) -> Result<(), SheetError> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        let Some(target) = row.checked_sub(1).and_then(|i| rows.get_mut(i)) else {
            return Err(SheetError::new(format!("row {row} out of bounds")));
        };
        target.resize(target.len().max(cells.len()), String::new());
        for (slot, value) in target.iter_mut().zip(cells) {
            slot.clone_from(value);
        }
        drop(rows);
        self.record_mutation();
        Ok(())
    }
}

// ============================================================================
// Recording outbox
// ============================================================================

/// Outbox that keeps everything it was asked to send
#[derive(Default)]
pub struct RecordingOutbox {
    sent: Mutex<Vec<ChatMessage>>,
}

impl RecordingOutbox {
    pub fn contents(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.content.clone())
            .collect()
    }
}

#[async_trait]
impl Outbox for RecordingOutbox {
    async fn send(&self, message: ChatMessage) {
        self.sent.lock().unwrap().push(message);
    }
}
