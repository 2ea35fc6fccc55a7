// ABOUTME: Fan-out coordinator running one session per file under a concurrency limit
// ABOUTME: Returns one result per input file in input order; per-file failures never abort the batch

use crate::driver::ConversationDriver;
use crate::error::{AgentError, SessionError};
use crate::prompts::PromptSet;
use crate::reconciler::{reconcile, Reconciliation};
use crate::session::{Session, SessionOutcome};
use depscout_ai::ModelClient;
use depscout_core::{DepScoutConfig, DependencyRecord};
use depscout_tools::{ToolDispatcher, Workspace};
use futures::FutureExt;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

pub const DEFAULT_CONCURRENCY_LIMIT: usize = 5;
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(600);

/// Outcome and bookkeeping for one input file
#[derive(Debug)]
pub struct FileResolution {
    pub target_file: String,
    pub outcome: SessionOutcome,
    pub turns: usize,
    pub tool_calls: usize,
    pub duration_ms: u64,
}

impl FileResolution {
    fn failed(target_file: String, error: SessionError) -> Self {
        Self {
            target_file,
            outcome: SessionOutcome::Failed(error),
            turns: 0,
            tool_calls: 0,
            duration_ms: 0,
        }
    }

    pub fn record(&self) -> Option<&DependencyRecord> {
        self.outcome.record()
    }
}

/// Counts per outcome for one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub resolved: usize,
    pub unresolved: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn from_resolutions(resolutions: &[FileResolution]) -> Self {
        resolutions
            .iter()
            .fold(Self::default(), |mut summary, resolution| {
                summary.total += 1;
                match resolution.outcome {
                    SessionOutcome::Resolved(_) => summary.resolved += 1,
                    SessionOutcome::Unresolved(_) => summary.unresolved += 1,
                    SessionOutcome::Failed(_) => summary.failed += 1,
                }
                summary
            })
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} files: {} resolved, {} unresolved, {} failed",
            self.total, self.resolved, self.unresolved, self.failed
        )
    }
}

/// Batch entry point: resolves dependency records for many files at once
#[derive(Clone)]
pub struct DependencyResolver {
    driver: Arc<ConversationDriver>,
    limiter: Arc<Semaphore>,
    concurrency_limit: usize,
    session_timeout: Duration,
}

impl DependencyResolver {
    pub fn new(driver: ConversationDriver, concurrency_limit: usize) -> Self {
        let concurrency_limit = concurrency_limit.max(1);
        Self {
            driver: Arc::new(driver),
            limiter: Arc::new(Semaphore::new(concurrency_limit)),
            concurrency_limit,
            session_timeout: DEFAULT_SESSION_TIMEOUT,
        }
    }

    /// Assemble the workspace, tools, prompts and driver described by `config`
    pub fn from_config(
        config: &DepScoutConfig,
        model: Arc<dyn ModelClient>,
    ) -> Result<Self, AgentError> {
        depscout_core::ConfigManager::validate_config(config)?;

        let root = &config.workspace.root;
        let workspace = Workspace::new(root)
            .map_err(|source| AgentError::Workspace {
                path: root.clone(),
                source,
            })?
            .with_max_results(config.workspace.max_search_results);

        let dispatcher = ToolDispatcher::for_workspace(Arc::new(workspace))
            .with_call_timeout(config.agent.tool_timeout());

        let driver = ConversationDriver::new(model, Arc::new(dispatcher))
            .with_prompts(PromptSet::from_override(
                config.agent.system_prompt_file.as_deref(),
            )?)
            .with_max_turns(config.agent.max_turns)
            .with_model_timeout(config.agent.model_timeout());

        Ok(Self::new(driver, config.agent.concurrency_limit)
            .with_session_timeout(config.agent.session_timeout()))
    }

    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }

    /// Same driver with a different limit; the new limiter is not shared
    /// with `self`
    pub fn with_concurrency_limit(&self, limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            driver: self.driver.clone(),
            limiter: Arc::new(Semaphore::new(limit)),
            concurrency_limit: limit,
            session_timeout: self.session_timeout,
        }
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    /// Stop admitting sessions on this limiter and its clones.
    ///
    /// Sessions already running finish normally; files still waiting for a
    /// slot fail with [`SessionError::LimiterClosed`].
    pub fn close(&self) {
        self.limiter.close();
    }

    /// One record per input file in input order; `None` marks an
    /// unresolved or failed file
    pub async fn resolve(&self, files: &[String]) -> Vec<Option<DependencyRecord>> {
        self.resolve_detailed(files)
            .await
            .into_iter()
            .map(|resolution| resolution.outcome.into_record())
            .collect()
    }

    /// Like [`resolve`](Self::resolve) but keeps the outcome and counters of every session
    pub async fn resolve_detailed(&self, files: &[String]) -> Vec<FileResolution> {
        let start = Instant::now();
        info!(
            files = files.len(),
            concurrency_limit = self.concurrency_limit,
            model = %self.driver.model().model_name(),
            "Starting dependency resolution batch"
        );

        // Dropping the JoinSet aborts every session still running, so an
        // abandoned batch releases its permits
        let mut sessions = JoinSet::new();
        for (index, file) in files.iter().cloned().enumerate() {
            let resolver = self.clone();
            sessions.spawn(async move {
                let resolution = AssertUnwindSafe(resolver.resolve_one(file.clone()))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| {
                        let message = panic_message(panic.as_ref());
                        error!(file = %file, error = %message, "Session panicked");
                        FileResolution::failed(file, SessionError::Panicked(message))
                    });
                (index, resolution)
            });
        }

        let mut slots: Vec<Option<FileResolution>> = files.iter().map(|_| None).collect();
        while let Some(joined) = sessions.join_next().await {
            match joined {
                Ok((index, resolution)) => slots[index] = Some(resolution),
                Err(join_error) => error!(error = %join_error, "Session task aborted"),
            }
        }

        let resolutions: Vec<FileResolution> = slots
            .into_iter()
            .zip(files)
            .map(|(slot, file)| {
                slot.unwrap_or_else(|| {
                    FileResolution::failed(
                        file.clone(),
                        SessionError::Panicked("session task aborted".to_string()),
                    )
                })
            })
            .collect();

        let summary = BatchSummary::from_resolutions(&resolutions);
        info!(
            total = summary.total,
            resolved = summary.resolved,
            unresolved = summary.unresolved,
            failed = summary.failed,
            duration_ms = start.elapsed().as_millis() as u64,
            "Dependency resolution batch finished"
        );
        resolutions
    }

    async fn resolve_one(&self, target_file: String) -> FileResolution {
        // Held until the session finishes or its task is aborted
        let _permit = match self.limiter.acquire().await {
            Ok(permit) => permit,
            Err(_) => return FileResolution::failed(target_file, SessionError::LimiterClosed),
        };

        let start = Instant::now();
        info!(file = %target_file, "Session started");

        let mut session = Session::new(target_file);
        let outcome =
            match tokio::time::timeout(self.session_timeout, self.driver.run(&mut session)).await {
                Ok(Ok(payload)) => match reconcile(&payload) {
                    Reconciliation::Resolved(record) => SessionOutcome::Resolved(record),
                    Reconciliation::Unresolved(reason) => {
                        warn!(file = %session.target_file(), reason = %reason, "File unresolved");
                        SessionOutcome::Unresolved(reason)
                    }
                },
                Ok(Err(e)) => {
                    error!(file = %session.target_file(), error = %e, "Session failed");
                    SessionOutcome::Failed(e)
                }
                Err(_) => {
                    let e = SessionError::SessionTimeout(self.session_timeout);
                    error!(file = %session.target_file(), error = %e, "Session failed");
                    SessionOutcome::Failed(e)
                }
            };

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            file = %session.target_file(),
            status = outcome.status(),
            turns = session.turns(),
            tool_calls = session.tool_calls(),
            duration_ms,
            "Session finished"
        );
        session.finish(outcome);

        FileResolution {
            target_file: session.target_file().to_string(),
            turns: session.turns(),
            tool_calls: session.tool_calls(),
            duration_ms,
            outcome: session
                .take_outcome()
                .unwrap_or(SessionOutcome::Unresolved("no outcome recorded".to_string())),
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depscout_core::AgentConfig;

    #[test]
    fn test_summary_counts() {
        let record = DependencyRecord {
            target_file_path: "a.ts".to_string(),
            internal_deps: vec![],
            external_deps: vec![],
            type_of_file: "Module".to_string(),
            name: "A".to_string(),
        };
        let resolutions = vec![
            FileResolution {
                target_file: "a.ts".to_string(),
                outcome: SessionOutcome::Resolved(record),
                turns: 1,
                tool_calls: 0,
                duration_ms: 3,
            },
            FileResolution::failed(
                "b.ts".to_string(),
                SessionError::TurnLimitExceeded { max_turns: 10 },
            ),
            FileResolution {
                target_file: "c.ts".to_string(),
                outcome: SessionOutcome::Unresolved("bad json".to_string()),
                turns: 2,
                tool_calls: 1,
                duration_ms: 5,
            },
        ];
        let summary = BatchSummary::from_resolutions(&resolutions);
        assert_eq!(
            summary,
            BatchSummary {
                total: 3,
                resolved: 1,
                unresolved: 1,
                failed: 1
            }
        );
        assert_eq!(summary.to_string(), "3 files: 1 resolved, 1 unresolved, 1 failed");
    }

    #[test]
    fn test_default_limits_match_config_defaults() {
        let agent = AgentConfig::default();
        assert_eq!(agent.concurrency_limit, DEFAULT_CONCURRENCY_LIMIT);
        assert_eq!(agent.session_timeout(), DEFAULT_SESSION_TIMEOUT);
        assert_eq!(agent.max_turns, crate::driver::DEFAULT_MAX_TURNS);
        assert_eq!(agent.model_timeout(), crate::driver::DEFAULT_MODEL_TIMEOUT);
    }
}
