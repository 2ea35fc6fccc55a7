// ABOUTME: Conversation driver behaviour for a single file against a scripted model
// ABOUTME: Round trips, tool observations, memoized reads and hard session failures

mod common;

use common::*;
use depscout_agent::{reconcile, ConversationDriver, Reconciliation, Session, SessionError, SessionState};
use depscout_ai::ModelError;
use depscout_core::{Message, ToolCall};
use depscout_tools::{ToolDispatcher, Workspace};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn tool_messages(messages: &[Message]) -> Vec<(String, String)> {
    messages
        .iter()
        .filter_map(|message| match message {
            Message::Tool(result) => Some((result.call_id.clone(), result.content.clone())),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn final_answer_on_first_turn_is_one_round_trip() {
    let dir = angular_tree();
    let model = Arc::new(
        ScriptedModel::new().script(ENVIRONMENT, vec![answer(ENVIRONMENT, "environment", &[])]),
    );
    let driver = driver(&dir, model.clone());

    let mut session = Session::new(ENVIRONMENT);
    let payload = driver.run(&mut session).await.unwrap();

    assert_eq!(session.state(), SessionState::Terminated);
    assert_eq!(session.turns(), 1);
    assert_eq!(session.tool_calls(), 0);
    assert_eq!(session.history().len(), 1);
    assert_eq!(model.invocations(), 1);

    let Reconciliation::Resolved(record) = reconcile(&payload) else {
        panic!("expected a record");
    };
    assert_eq!(record.name, "environment");
    assert_eq!(record.target_file_path, ENVIRONMENT);

    let seen = &model.requests_for(ENVIRONMENT)[0];
    assert_eq!(seen.messages.len(), 2);
    assert_eq!(seen.messages[0].role(), "system");
    let Message::Human { content } = &seen.messages[1] else {
        panic!("second message should be the human prompt");
    };
    assert!(content.starts_with("Analyze the file content and extract dependencies:\n\n--- START OF FILE CONTENT FOR 'environment.ts'"));
    assert!(content.contains("production: false"));
    assert_eq!(seen.tool_names, vec!["read_file", "file_name_search"]);
    assert_eq!(seen.schema_name.as_deref(), Some("file_dependency"));
}

#[tokio::test]
async fn tool_turns_append_observations_in_order() {
    let dir = angular_tree();
    let model = Arc::new(ScriptedModel::new().script(
        APP_COMPONENT,
        vec![
            Step::Tools(vec![
                search("call_1", "logger.service.ts"),
                search("call_2", "*.module.ts"),
            ]),
            answer(APP_COMPONENT, "AppComponent", &[LOGGER_SERVICE]),
        ],
    ));
    let driver = driver(&dir, model.clone());

    let mut session = Session::new(APP_COMPONENT);
    driver.run(&mut session).await.unwrap();

    let roles: Vec<_> = session.history().iter().map(Message::role).collect();
    assert_eq!(roles, vec!["assistant", "tool", "tool", "assistant"]);
    assert_eq!(session.turns(), 2);
    assert_eq!(session.tool_calls(), 2);

    let second = &model.requests_for(APP_COMPONENT)[1];
    let observations = tool_messages(&second.messages);
    assert_eq!(observations[0].0, "call_1");
    assert!(observations[0].1.contains(LOGGER_SERVICE));
    assert_eq!(observations[1].0, "call_2");
    assert!(observations[1].1.contains(APP_MODULE));
}

#[tokio::test]
async fn unknown_tool_is_observed_and_session_continues() {
    let dir = angular_tree();
    let model = Arc::new(ScriptedModel::new().script(
        MAIN,
        vec![
            Step::Tools(vec![ToolCall::new("call_x", "delete_everything", json!({}))]),
            answer(MAIN, "main", &[APP_MODULE]),
        ],
    ));
    let driver = driver(&dir, model.clone());

    let mut session = Session::new(MAIN);
    let payload = driver.run(&mut session).await.unwrap();

    assert!(matches!(reconcile(&payload), Reconciliation::Resolved(_)));
    let second = &model.requests_for(MAIN)[1];
    assert_eq!(
        tool_messages(&second.messages),
        vec![(
            "call_x".to_string(),
            "tool error: unknown tool 'delete_everything'".to_string()
        )]
    );
}

#[tokio::test]
async fn path_traversal_is_an_observation_not_a_failure() {
    let dir = angular_tree();
    let model = Arc::new(ScriptedModel::new().script(
        MAIN,
        vec![
            Step::Tools(vec![
                ToolCall::new("read", "read_file", json!({"relative_path": "../../secret"})),
                ToolCall::new(
                    "find",
                    "file_name_search",
                    json!({"pattern": "*", "relative_path": "../../secret"}),
                ),
            ]),
            answer(MAIN, "main", &[]),
        ],
    ));
    let driver = driver(&dir, model.clone());

    let mut session = Session::new(MAIN);
    driver.run(&mut session).await.unwrap();

    let second = &model.requests_for(MAIN)[1];
    for (_, content) in tool_messages(&second.messages) {
        assert!(content.starts_with("tool error: the path '../../secret' is outside the authorized workspace"));
    }
    assert_eq!(session.turns(), 2);
}

#[tokio::test]
async fn target_content_is_read_once_per_session() {
    let dir = angular_tree();
    let files = Arc::new(CountingFiles::new(Workspace::new(dir.path()).unwrap()));
    let dispatcher = Arc::new(ToolDispatcher::new(files.clone(), files.clone()));
    let model = Arc::new(ScriptedModel::new().script(
        APP_MODULE,
        vec![
            Step::Tools(vec![search("s1", "app.component.ts")]),
            Step::Tools(vec![search("s2", "*.service.ts")]),
            Step::Tools(vec![search("s3", "main.ts")]),
            answer(APP_MODULE, "AppModule", &[APP_COMPONENT]),
        ],
    ));
    let driver = ConversationDriver::new(model.clone(), dispatcher);

    let mut session = Session::new(APP_MODULE);
    driver.run(&mut session).await.unwrap();

    assert_eq!(session.turns(), 4);
    assert_eq!(files.reads_of(APP_MODULE), 1);
    let requests = model.requests_for(APP_MODULE);
    assert_eq!(requests.len(), 4);
    assert!(requests
        .windows(2)
        .all(|pair| pair[0].messages[1] == pair[1].messages[1]));
}

#[tokio::test]
async fn endless_tool_requests_hit_the_turn_limit() {
    let dir = angular_tree();
    let model = Arc::new(
        ScriptedModel::new().script(MAIN, vec![Step::Tools(vec![search("again", "*.ts")])]),
    );
    let driver = driver(&dir, model.clone()).with_max_turns(3);

    let mut session = Session::new(MAIN);
    let err = driver.run(&mut session).await.unwrap_err();

    assert!(matches!(err, SessionError::TurnLimitExceeded { max_turns: 3 }));
    assert_eq!(model.invocations(), 3);
    assert_eq!(session.turns(), 3);
    // The last turn's calls are not dispatched once the limit is hit
    assert_eq!(session.tool_calls(), 2);
}

#[tokio::test]
async fn model_errors_end_the_session() {
    let dir = angular_tree();
    let model = Arc::new(ScriptedModel::new().script(MAIN, vec![Step::Fail(401)]));
    let driver = driver(&dir, model);

    let mut session = Session::new(MAIN);
    let err = driver.run(&mut session).await.unwrap_err();

    assert!(matches!(
        err,
        SessionError::Model(ModelError::Api { status: 401, .. })
    ));
}

#[tokio::test]
async fn stalled_model_call_times_out() {
    let dir = angular_tree();
    let model = Arc::new(
        ScriptedModel::new()
            .script(MAIN, vec![answer(MAIN, "main", &[])])
            .delay(MAIN, Duration::from_secs(5)),
    );
    let driver = driver(&dir, model).with_model_timeout(Duration::from_millis(100));

    let mut session = Session::new(MAIN);
    let err = driver.run(&mut session).await.unwrap_err();

    assert!(matches!(err, SessionError::ModelTimeout(d) if d == Duration::from_millis(100)));
}

#[tokio::test]
async fn unreadable_target_fails_before_any_model_call() {
    let dir = angular_tree();
    let model = Arc::new(ScriptedModel::new().script("src/missing.ts", vec![answer("src/missing.ts", "x", &[])]));
    let driver = driver(&dir, model.clone());

    let mut session = Session::new("src/missing.ts");
    let err = driver.run(&mut session).await.unwrap_err();

    assert!(matches!(err, SessionError::FileUnavailable(_)));
    assert_eq!(model.invocations(), 0);
    assert!(session.history().is_empty());
}
