// ABOUTME: Per-file conversation state: memoized target content and an append-only message log
// ABOUTME: Owned by exactly one driver run and discarded once its outcome is collected

use crate::error::SessionError;
use depscout_core::{AssistantTurn, DependencyRecord, Message, Payload, ToolCall, ToolResult};
use depscout_tools::FileContentProvider;

/// Where a session is in its analyze/dispatch cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the next model turn
    Analyze,
    /// Waiting for the tool results of the last turn
    Dispatch,
    /// The model produced a final answer
    Terminated,
}

/// Terminal outcome of one file
#[derive(Debug)]
pub enum SessionOutcome {
    Resolved(DependencyRecord),
    /// The final answer did not reconcile into a record
    Unresolved(String),
    /// The session itself failed
    Failed(SessionError),
}

impl SessionOutcome {
    pub fn record(&self) -> Option<&DependencyRecord> {
        match self {
            SessionOutcome::Resolved(record) => Some(record),
            _ => None,
        }
    }

    pub fn into_record(self) -> Option<DependencyRecord> {
        match self {
            SessionOutcome::Resolved(record) => Some(record),
            _ => None,
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            SessionOutcome::Resolved(_) => "resolved",
            SessionOutcome::Unresolved(_) => "unresolved",
            SessionOutcome::Failed(_) => "failed",
        }
    }
}

/// State for one file's dependency-extraction conversation
#[derive(Debug)]
pub struct Session {
    target_file: String,
    file_content: Option<String>,
    history: Vec<Message>,
    state: SessionState,
    outcome: Option<SessionOutcome>,
    turns: usize,
    tool_calls: usize,
}

impl Session {
    pub fn new(target_file: impl Into<String>) -> Self {
        Self {
            target_file: target_file.into(),
            file_content: None,
            history: Vec::new(),
            state: SessionState::Analyze,
            outcome: None,
            turns: 0,
            tool_calls: 0,
        }
    }

    pub fn target_file(&self) -> &str {
        &self.target_file
    }

    pub fn file_content(&self) -> Option<&str> {
        self.file_content.as_deref()
    }

    /// Messages appended after the system and human prompts
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn outcome(&self) -> Option<&SessionOutcome> {
        self.outcome.as_ref()
    }

    /// Model turns taken so far
    pub fn turns(&self) -> usize {
        self.turns
    }

    /// Tool calls dispatched so far
    pub fn tool_calls(&self) -> usize {
        self.tool_calls
    }

    /// Fetch the target file once; later calls return the cached text
    pub async fn ensure_content(
        &mut self,
        provider: &dyn FileContentProvider,
    ) -> Result<&str, SessionError> {
        if self.file_content.is_none() {
            let content = provider
                .read(&self.target_file, 1, None)
                .await
                .map_err(SessionError::FileUnavailable)?;
            self.file_content = Some(content);
        }
        Ok(self.file_content.as_deref().unwrap_or_default())
    }

    /// Append a model turn and move to `Dispatch` or `Terminated`
    pub(crate) fn record_turn(&mut self, turn: AssistantTurn) {
        debug_assert_eq!(self.state, SessionState::Analyze);
        self.turns += 1;
        self.state = if turn.requests_tools() {
            SessionState::Dispatch
        } else {
            SessionState::Terminated
        };
        self.history.push(Message::Assistant(turn));
    }

    /// Append the observations for the pending calls and return to `Analyze`
    pub(crate) fn record_observations(&mut self, results: Vec<ToolResult>) {
        debug_assert_eq!(self.state, SessionState::Dispatch);
        self.tool_calls += results.len();
        self.history.extend(results.into_iter().map(Message::Tool));
        self.state = SessionState::Analyze;
    }

    /// Tool calls of the latest assistant turn
    pub fn pending_calls(&self) -> &[ToolCall] {
        match (self.state, self.history.last()) {
            (SessionState::Dispatch, Some(Message::Assistant(turn))) => &turn.tool_calls,
            _ => &[],
        }
    }

    /// Payload of the final assistant turn, once terminated
    pub fn final_payload(&self) -> Option<&Payload> {
        match (self.state, self.history.last()) {
            (SessionState::Terminated, Some(Message::Assistant(turn))) => Some(&turn.payload),
            _ => None,
        }
    }

    pub(crate) fn finish(&mut self, outcome: SessionOutcome) {
        self.state = SessionState::Terminated;
        self.outcome = Some(outcome);
    }

    pub(crate) fn take_outcome(&mut self) -> Option<SessionOutcome> {
        self.outcome.take()
    }
}
