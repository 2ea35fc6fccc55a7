// ABOUTME: Shared fixtures for agent integration tests
// ABOUTME: A scripted ModelClient keyed by target file and a read-counting workspace wrapper

#![allow(dead_code)]

use async_trait::async_trait;
use depscout_agent::{ConversationDriver, DependencyResolver};
use depscout_ai::{ModelClient, ModelError, ModelRequest, ModelResult};
use depscout_core::{AssistantTurn, Message, Payload, ToolCall};
use depscout_tools::{
    FileContentProvider, FileSearchProvider, SearchOutcome, ToolDispatcher, Workspace,
};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const APP_MODULE: &str = "src/app/app.module.ts";
pub const APP_COMPONENT: &str = "src/app/app.component.ts";
pub const LOGGER_SERVICE: &str = "src/app/shared/logger.service.ts";
pub const MAIN: &str = "src/main.ts";
pub const ENVIRONMENT: &str = "src/environments/environment.ts";

/// A small Angular-style source tree
pub fn angular_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("src/app/shared")).unwrap();
    fs::create_dir_all(root.join("src/environments")).unwrap();
    fs::write(
        root.join(APP_MODULE),
        "import { NgModule } from '@angular/core';\nimport { AppComponent } from './app.component';\n\n@NgModule({ declarations: [AppComponent] })\nexport class AppModule {}\n",
    )
    .unwrap();
    fs::write(
        root.join(APP_COMPONENT),
        "import { Component } from '@angular/core';\nimport { LoggerService } from './shared/logger.service';\n\n@Component({ selector: 'app-root' })\nexport class AppComponent {}\n",
    )
    .unwrap();
    fs::write(
        root.join(LOGGER_SERVICE),
        "import { Injectable } from '@angular/core';\n\n@Injectable()\nexport class LoggerService {}\n",
    )
    .unwrap();
    fs::write(
        root.join(MAIN),
        "import { platformBrowserDynamic } from '@angular/platform-browser-dynamic';\nimport { AppModule } from './app/app.module';\n",
    )
    .unwrap();
    fs::write(
        root.join(ENVIRONMENT),
        "export const environment = { production: false };\n",
    )
    .unwrap();
    dir
}

/// One scripted model reply
#[derive(Debug, Clone)]
pub enum Step {
    Tools(Vec<ToolCall>),
    Answer(Payload),
    Fail(u16),
    Panic(&'static str),
}

/// Final answer carrying a valid record for `file`
pub fn answer(file: &str, name: &str, internal_deps: &[&str]) -> Step {
    Step::Answer(Payload::Text(
        json!({
            "target_file_path": file,
            "internal_deps": internal_deps,
            "external_deps": ["@angular/core"],
            "type_of_file": "Component",
            "name": name,
        })
        .to_string(),
    ))
}

pub fn search(id: &str, pattern: &str) -> ToolCall {
    ToolCall::new(id, "file_name_search", json!({ "pattern": pattern }))
}

/// What the model was shown on one invocation
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub file: String,
    pub messages: Vec<Message>,
    pub tool_names: Vec<String>,
    pub schema_name: Option<String>,
}

/// Model whose replies are scripted per target file.
///
/// The file is recognised from the `Path: <file>)` header embedded in the
/// human prompt; the step is the number of assistant turns already in the
/// log. Past the end of a script the last step repeats.
#[derive(Default)]
pub struct ScriptedModel {
    scripts: HashMap<String, Vec<Step>>,
    delays: HashMap<String, Duration>,
    seen: Mutex<Vec<SeenRequest>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(mut self, file: &str, steps: Vec<Step>) -> Self {
        self.scripts.insert(file.to_string(), steps);
        self
    }

    /// Delay every reply for `file`
    pub fn delay(mut self, file: &str, delay: Duration) -> Self {
        self.delays.insert(file.to_string(), delay);
        self
    }

    pub fn requests_for(&self, file: &str) -> Vec<SeenRequest> {
        self.seen
            .lock()
            .iter()
            .filter(|seen| seen.file == file)
            .cloned()
            .collect()
    }

    pub fn invocations(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn file_for(&self, messages: &[Message]) -> Option<String> {
        let prompt = messages.iter().find_map(|message| match message {
            Message::Human { content } => Some(content.as_str()),
            _ => None,
        })?;
        self.scripts
            .keys()
            .find(|file| prompt.contains(&format!("Path: {file})")))
            .cloned()
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn invoke(&self, request: ModelRequest<'_>) -> ModelResult<AssistantTurn> {
        let file = self
            .file_for(request.messages)
            .ok_or_else(|| ModelError::InvalidRequest("no scripted file in prompt".to_string()))?;
        let step_index = request
            .messages
            .iter()
            .filter(|message| matches!(message, Message::Assistant(_)))
            .count();

        self.seen.lock().push(SeenRequest {
            file: file.clone(),
            messages: request.messages.to_vec(),
            tool_names: request.tools.iter().map(|tool| tool.name.clone()).collect(),
            schema_name: request.output_schema.map(|schema| schema.name.clone()),
        });

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(&file) {
            tokio::time::sleep(*delay).await;
        }

        let steps = &self.scripts[&file];
        let step = steps
            .get(step_index)
            .or_else(|| steps.last())
            .cloned()
            .ok_or_else(|| ModelError::InvalidRequest("empty script".to_string()))?;

        match step {
            Step::Tools(calls) => Ok(AssistantTurn::tool_calls(calls)),
            Step::Answer(payload) => Ok(AssistantTurn::final_answer(payload)),
            Step::Fail(status) => Err(ModelError::Api {
                provider: "scripted".to_string(),
                status,
                body: "scripted failure".to_string(),
            }),
            Step::Panic(message) => panic!("{message}"),
        }
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_name(&self) -> &str {
        "scripted-model"
    }
}

/// Workspace wrapper counting reads per path
pub struct CountingFiles {
    inner: Workspace,
    reads: Mutex<HashMap<String, usize>>,
}

impl CountingFiles {
    pub fn new(inner: Workspace) -> Self {
        Self {
            inner,
            reads: Mutex::new(HashMap::new()),
        }
    }

    pub fn reads_of(&self, path: &str) -> usize {
        self.reads.lock().get(path).copied().unwrap_or(0)
    }
}

#[async_trait]
impl FileContentProvider for CountingFiles {
    async fn read(
        &self,
        relative_path: &str,
        offset: i64,
        limit: Option<i64>,
    ) -> depscout_tools::Result<String> {
        *self
            .reads
            .lock()
            .entry(relative_path.to_string())
            .or_default() += 1;
        self.inner.read(relative_path, offset, limit).await
    }
}

#[async_trait]
impl FileSearchProvider for CountingFiles {
    async fn search(
        &self,
        pattern: &str,
        relative_path: &str,
    ) -> depscout_tools::Result<SearchOutcome> {
        self.inner.search(pattern, relative_path).await
    }
}

pub fn driver(dir: &TempDir, model: Arc<ScriptedModel>) -> ConversationDriver {
    let workspace = Arc::new(Workspace::new(dir.path()).unwrap());
    let dispatcher = ToolDispatcher::for_workspace(workspace).with_call_timeout(Duration::from_secs(5));
    ConversationDriver::new(model, Arc::new(dispatcher))
}

pub fn resolver(dir: &TempDir, model: Arc<ScriptedModel>, limit: usize) -> DependencyResolver {
    DependencyResolver::new(driver(dir, model), limit)
}

pub fn files(paths: &[&str]) -> Vec<String> {
    paths.iter().map(|path| path.to_string()).collect()
}
