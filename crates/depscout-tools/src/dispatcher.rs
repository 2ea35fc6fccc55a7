// ABOUTME: Executes one assistant turn's tool calls against the sandboxed file tools
// ABOUTME: Calls run concurrently; each failure becomes an observation instead of an error

use crate::error::{Result, ToolError};
use crate::providers::{FileContentProvider, FileSearchProvider};
use crate::registry::{FileNameSearchArgs, FileTool, ReadFileArgs};
use crate::workspace::Workspace;
use depscout_core::{ToolCall, ToolResult, ToolSchema};
use futures::future::join_all;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const TOOL_LOG_TARGET: &str = "depscout::tools";

/// Default per-call deadline
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs tool calls requested by the model
pub struct ToolDispatcher {
    content: Arc<dyn FileContentProvider>,
    search: Arc<dyn FileSearchProvider>,
    tools: Vec<FileTool>,
    call_timeout: Duration,
    call_count: AtomicUsize,
}

impl ToolDispatcher {
    /// Create a dispatcher over explicit providers with every tool enabled
    pub fn new(content: Arc<dyn FileContentProvider>, search: Arc<dyn FileSearchProvider>) -> Self {
        Self {
            content,
            search,
            tools: FileTool::ALL.to_vec(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
            call_count: AtomicUsize::new(0),
        }
    }

    /// Create a dispatcher whose read and search tools share one workspace
    pub fn for_workspace(workspace: Arc<Workspace>) -> Self {
        Self::new(workspace.clone(), workspace)
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Restrict the tools advertised to and callable by the model
    pub fn with_tools(mut self, tools: Vec<FileTool>) -> Self {
        self.tools = tools;
        self
    }

    /// Tool definitions to bind on each model invocation
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.iter().map(FileTool::schema).collect()
    }

    pub fn content_provider(&self) -> Arc<dyn FileContentProvider> {
        self.content.clone()
    }

    /// Number of calls dispatched so far
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Get and reset the call count
    pub fn take_call_count(&self) -> usize {
        self.call_count.swap(0, Ordering::SeqCst)
    }

    /// Run every call of one turn concurrently.
    ///
    /// Returns exactly one result per call, in call order, each carrying the
    /// originating call id. Never fails: unknown tools, bad arguments,
    /// timeouts and panics all come back as `tool error: ...` observations.
    pub async fn dispatch(&self, calls: &[ToolCall]) -> Vec<ToolResult> {
        join_all(calls.iter().map(|call| self.run_isolated(call))).await
    }

    async fn run_isolated(&self, call: &ToolCall) -> ToolResult {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let start = Instant::now();
        debug!(
            target: TOOL_LOG_TARGET,
            tool = %call.name,
            call_id = %call.id,
            arguments = %call.arguments,
            "Tool call started"
        );

        let guarded = AssertUnwindSafe(self.execute(call)).catch_unwind();
        let outcome = match tokio::time::timeout(self.call_timeout, guarded).await {
            Ok(Ok(result)) => result,
            Ok(Err(panic)) => Err(ToolError::Panicked(panic_message(panic.as_ref()))),
            Err(_) => Err(ToolError::TimedOut(self.call_timeout)),
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        match outcome {
            Ok(content) => {
                debug!(
                    target: TOOL_LOG_TARGET,
                    tool = %call.name,
                    call_id = %call.id,
                    duration_ms,
                    bytes = content.len(),
                    "Tool call finished"
                );
                ToolResult {
                    call_id: call.id.clone(),
                    tool_name: call.name.clone(),
                    content,
                    is_error: false,
                }
            }
            Err(error) => {
                warn!(
                    target: TOOL_LOG_TARGET,
                    tool = %call.name,
                    call_id = %call.id,
                    duration_ms,
                    error = %error,
                    "Tool call failed"
                );
                ToolResult {
                    call_id: call.id.clone(),
                    tool_name: call.name.clone(),
                    content: error.to_observation(),
                    is_error: true,
                }
            }
        }
    }

    /// Resolve and run a single call, surfacing failures as typed errors
    pub async fn execute(&self, call: &ToolCall) -> Result<String> {
        let tool = FileTool::from_name(&call.name)
            .filter(|tool| self.tools.contains(tool))
            .ok_or_else(|| ToolError::UnknownTool(call.name.clone()))?;

        match tool {
            FileTool::ReadFile => {
                let args: ReadFileArgs = decode_args(tool, &call.arguments)?;
                self.content
                    .read(&args.relative_path, args.offset, args.limit)
                    .await
            }
            FileTool::FileNameSearch => {
                let args: FileNameSearchArgs = decode_args(tool, &call.arguments)?;
                let outcome = self.search.search(&args.pattern, &args.relative_path).await?;
                Ok(outcome.render(&args.pattern, &args.relative_path))
            }
        }
    }
}

/// Decode tool arguments, accepting a JSON object or a string holding one
fn decode_args<T: DeserializeOwned>(tool: FileTool, arguments: &JsonValue) -> Result<T> {
    let invalid = |message: String| ToolError::InvalidArguments {
        tool: tool.name().to_string(),
        message,
    };

    let value = match arguments {
        JsonValue::String(raw) => {
            serde_json::from_str(raw).map_err(|e| invalid(e.to_string()))?
        }
        JsonValue::Null => JsonValue::Object(Default::default()),
        other => other.clone(),
    };

    serde_json::from_value(value).map_err(|e| invalid(e.to_string()))
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
