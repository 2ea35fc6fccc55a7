// ABOUTME: Per-file dependency extraction agent and its batch coordinator
// ABOUTME: Conversation driver, result reconciler and bounded fan-out over many files

pub mod coordinator;
pub mod driver;
pub mod error;
pub mod prompts;
pub mod reconciler;
pub mod session;

pub use coordinator::{
    BatchSummary, DependencyResolver, FileResolution, DEFAULT_CONCURRENCY_LIMIT,
    DEFAULT_SESSION_TIMEOUT,
};
pub use driver::{ConversationDriver, DEFAULT_MAX_TURNS, DEFAULT_MODEL_TIMEOUT};
pub use error::{AgentError, SessionError};
pub use prompts::{human_prompt, PromptSet, FILE_DEPENDENCY_PROMPT};
pub use reconciler::{reconcile, Reconciliation};
pub use session::{Session, SessionOutcome, SessionState};
