// ABOUTME: Conversation driver alternating model turns and tool dispatch for one file
// ABOUTME: Runs a Session from Analyze to Terminated under a turn limit and model deadline

use crate::error::SessionError;
use crate::prompts::PromptSet;
use crate::session::{Session, SessionState};
use depscout_ai::{ModelClient, ModelRequest};
use depscout_core::{AssistantTurn, Message, OutputSchema, Payload, ToolSchema};
use depscout_tools::{FileContentProvider, ToolDispatcher};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

pub const DEFAULT_MAX_TURNS: usize = 10;
pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(180);

/// Drives sessions; holds only read-only collaborators so one driver can
/// serve every session of a batch
pub struct ConversationDriver {
    model: Arc<dyn ModelClient>,
    dispatcher: Arc<ToolDispatcher>,
    content: Arc<dyn FileContentProvider>,
    prompts: PromptSet,
    tool_schemas: Vec<ToolSchema>,
    output_schema: OutputSchema,
    max_turns: usize,
    model_timeout: Duration,
}

impl ConversationDriver {
    /// Create a driver that reads target files through the dispatcher's content provider
    pub fn new(model: Arc<dyn ModelClient>, dispatcher: Arc<ToolDispatcher>) -> Self {
        Self {
            content: dispatcher.content_provider(),
            tool_schemas: dispatcher.schemas(),
            model,
            dispatcher,
            prompts: PromptSet::default(),
            output_schema: OutputSchema::dependency_record(),
            max_turns: DEFAULT_MAX_TURNS,
            model_timeout: DEFAULT_MODEL_TIMEOUT,
        }
    }

    pub fn with_prompts(mut self, prompts: PromptSet) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns.max(1);
        self
    }

    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = timeout;
        self
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    pub fn model(&self) -> &Arc<dyn ModelClient> {
        &self.model
    }

    /// Run the session until the model gives a final answer.
    ///
    /// Returns that answer's payload. Tool failures never end the session;
    /// model failures, the model deadline and the turn limit do.
    pub async fn run(&self, session: &mut Session) -> Result<Payload, SessionError> {
        loop {
            match session.state() {
                SessionState::Analyze => {
                    let turn = self.analyze(session).await?;
                    session.record_turn(turn);
                    if session.state() == SessionState::Dispatch
                        && session.turns() >= self.max_turns
                    {
                        return Err(SessionError::TurnLimitExceeded {
                            max_turns: self.max_turns,
                        });
                    }
                }
                SessionState::Dispatch => {
                    let results = self.dispatcher.dispatch(session.pending_calls()).await;
                    debug!(
                        file = %session.target_file(),
                        turn = session.turns(),
                        calls = results.len(),
                        errors = results.iter().filter(|r| r.is_error).count(),
                        "Tool results appended"
                    );
                    session.record_observations(results);
                }
                SessionState::Terminated => {
                    return Ok(session.final_payload().cloned().unwrap_or(Payload::Empty));
                }
            }
        }
    }

    async fn analyze(&self, session: &mut Session) -> Result<AssistantTurn, SessionError> {
        let human = Message::human(
            self.prompts
                .human(session.ensure_content(self.content.as_ref()).await?),
        );

        let mut messages = Vec::with_capacity(session.history().len() + 2);
        messages.push(Message::system(self.prompts.system()));
        messages.push(human);
        messages.extend(session.history().iter().cloned());

        let request = ModelRequest::new(&messages)
            .with_tools(&self.tool_schemas)
            .with_output_schema(&self.output_schema);

        let start = Instant::now();
        let turn = tokio::time::timeout(self.model_timeout, self.model.invoke(request))
            .await
            .map_err(|_| SessionError::ModelTimeout(self.model_timeout))??;

        debug!(
            file = %session.target_file(),
            turn = session.turns() + 1,
            messages = messages.len(),
            tool_calls = turn.tool_calls.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Model turn complete"
        );
        Ok(turn)
    }
}
