//! The prompt gateway seam.
//!
//! Every user-interactive decision the broker makes goes through one
//! generic button-indexed modal. The gateway may take arbitrarily long to
//! resolve — the broker imposes no timeout, and a call awaiting a human
//! decision simply remains pending. Only the logical call that issued a
//! prompt is blocked; concurrent calls show their own prompts
//! independently.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Severity/icon hint for a message box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MessageBoxKind {
    Info,
    #[default]
    Question,
    Warning,
}

/// A modal prompt with an ordered button set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageBoxRequest {
    pub title: String,
    pub message: String,
    pub buttons: Vec<String>,
    pub kind: MessageBoxKind,
}

/// The user's choice: an index into the request's button list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageBoxResponse {
    pub response: usize,
}

/// The interactive prompt surface.
#[async_trait]
pub trait PromptGateway: Send + Sync {
    /// Shows a modal and resolves to the clicked button's index.
    async fn show_message_box(&self, request: MessageBoxRequest) -> MessageBoxResponse;
}

/// A gateway that answers every prompt with the same button index.
///
/// Records every request it is shown; useful both in tests and for
/// headless embedders that auto-answer (index 0 declines every two-button
/// prompt the broker shows).
#[derive(Debug, Default)]
pub struct StaticPrompt {
    response: usize,
    seen: Mutex<Vec<MessageBoxRequest>>,
}

impl StaticPrompt {
    /// Creates a gateway that always answers with `response`.
    pub fn answering(response: usize) -> Self {
        Self {
            response,
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Returns every request shown so far.
    pub fn requests(&self) -> Vec<MessageBoxRequest> {
        self.seen.lock().expect("lock poisoned").clone()
    }

    /// Returns the number of prompts shown so far.
    pub fn prompt_count(&self) -> usize {
        self.seen.lock().expect("lock poisoned").len()
    }
}

#[async_trait]
impl PromptGateway for StaticPrompt {
    async fn show_message_box(&self, request: MessageBoxRequest) -> MessageBoxResponse {
        self.seen.lock().expect("lock poisoned").push(request);
        MessageBoxResponse {
            response: self.response,
        }
    }
}

/// A gateway that answers prompts from a scripted queue.
///
/// Once the queue runs dry it answers 0, which declines every two-button
/// prompt the broker shows.
#[derive(Debug, Default)]
pub struct QueuedPrompt {
    responses: Mutex<VecDeque<usize>>,
    seen: Mutex<Vec<MessageBoxRequest>>,
}

impl QueuedPrompt {
    /// Creates a gateway with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a response to the script.
    pub fn push_response(&self, response: usize) {
        self.responses
            .lock()
            .expect("lock poisoned")
            .push_back(response);
    }

    /// Returns every request shown so far.
    pub fn requests(&self) -> Vec<MessageBoxRequest> {
        self.seen.lock().expect("lock poisoned").clone()
    }

    /// Returns the number of prompts shown so far.
    pub fn prompt_count(&self) -> usize {
        self.seen.lock().expect("lock poisoned").len()
    }
}

#[async_trait]
impl PromptGateway for QueuedPrompt {
    async fn show_message_box(&self, request: MessageBoxRequest) -> MessageBoxResponse {
        self.seen.lock().expect("lock poisoned").push(request);
        let response = self
            .responses
            .lock()
            .expect("lock poisoned")
            .pop_front()
            .unwrap_or(0);
        MessageBoxResponse { response }
    }
}

/// A gateway whose prompts never resolve.
///
/// Models a user who ignores the dialog; the awaiting call stays pending
/// forever while the rest of the broker keeps serving.
#[derive(Debug, Default)]
pub struct PendingPrompt {
    seen: Mutex<Vec<MessageBoxRequest>>,
}

impl PendingPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every request shown so far.
    pub fn requests(&self) -> Vec<MessageBoxRequest> {
        self.seen.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl PromptGateway for PendingPrompt {
    async fn show_message_box(&self, request: MessageBoxRequest) -> MessageBoxResponse {
        self.seen.lock().expect("lock poisoned").push(request);
        std::future::pending().await
    }
}
