//! 交互集成测试：经由 SessionRegistry 驱动 Mock Planner 与 Mock Actuator

use std::sync::Arc;
use std::time::Duration;

use bee_browser::gateway::SessionRegistry;
use bee_browser::llm::{LlmError, MockLlmClient};
use bee_browser::memory::HistoryCompactor;
use bee_browser::react::{InteractionEvent, InteractionStatus, Planner, TurnEngine};
use bee_browser::tools::{ActionExecutor, MockActuatorFactory, OutcomeStatus};

fn registry(llm: MockLlmClient, factory: MockActuatorFactory) -> Arc<SessionRegistry> {
    let engine = TurnEngine::new(
        Planner::new(Arc::new(llm)),
        ActionExecutor::new(5),
        HistoryCompactor::default(),
    );
    Arc::new(SessionRegistry::new(engine, Arc::new(factory), "You control a browser.", 10))
}

fn action_results(events: &[InteractionEvent]) -> Vec<(String, OutcomeStatus)> {
    events
        .iter()
        .filter_map(|e| match e {
            InteractionEvent::ActionResult {
                function, status, ..
            } => Some((function.clone(), *status)),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_budget_exhausted_after_three_clicks() {
    let llm = MockLlmClient::new()
        .push_call("c1", "start_browser", "{}")
        .push_call("c2", "click_at_coordinates", r#"{"x": 10, "y": 20}"#)
        .push_call("c3", "click_at_coordinates", r#"{"x": 10, "y": 20}"#)
        .push_text("unreachable");
    let reg = registry(llm, MockActuatorFactory::new());

    let result = reg.interact("s", "keep clicking", Some(3)).await;
    assert_eq!(result.status, InteractionStatus::TurnBudgetExhausted);
    assert_eq!(result.actions.len(), 3);
    assert_eq!(action_results(&result.events).len(), 3);
    // system + user + 3 * (request, outcome) + 上限提示
    assert_eq!(reg.status().await["s"].messages_count, 9);
}

#[tokio::test]
async fn test_plain_text_reply_completes() {
    let reg = registry(MockLlmClient::new().push_text("Hello"), MockActuatorFactory::new());
    let result = reg.interact("s", "hi", None).await;
    assert_eq!(result.status, InteractionStatus::Completed);
    assert_eq!(result.final_response.as_deref(), Some("Hello"));
    assert!(result.actions.is_empty());
}

#[tokio::test]
async fn test_second_start_reports_already_started() {
    let llm = MockLlmClient::new()
        .push_call("c1", "start_browser", "{}")
        .push_call("c2", "start_browser", "{}")
        .push_text("ok");
    let factory = MockActuatorFactory::new();
    let probe = factory.probe();
    let reg = registry(llm, factory);

    let result = reg.interact("s", "start twice", None).await;
    assert_eq!(
        action_results(&result.events),
        vec![
            ("start_browser".to_string(), OutcomeStatus::Ok),
            ("start_browser".to_string(), OutcomeStatus::Error),
        ]
    );
    assert_eq!(probe.starts(), 1);
    assert!(reg.status().await["s"].browser_started);
}

#[tokio::test]
async fn test_planner_failure_on_second_turn() {
    let llm = MockLlmClient::new()
        .push_call("c1", "start_browser", "{}")
        .push_error(LlmError::Transport("connection reset".into()));
    let reg = registry(llm, MockActuatorFactory::new());

    let result = reg.interact("s", "go", Some(10)).await;
    assert_eq!(result.status, InteractionStatus::Failed);
    assert!(result.message.contains("connection reset"));
    assert!(matches!(
        result.events.last(),
        Some(InteractionEvent::PlannerFailed { turn: 2, .. })
    ));
    // 第一轮的请求/结果保留，之后只追加错误说明
    assert_eq!(reg.status().await["s"].messages_count, 5);
}

#[tokio::test]
async fn test_reset_restores_baseline_and_keeps_browser() {
    let llm = MockLlmClient::new()
        .push_call("c1", "start_browser", "{}")
        .push_text("started");
    let reg = registry(llm, MockActuatorFactory::new());
    reg.interact("s", "start", None).await;
    assert_eq!(reg.status().await["s"].messages_count, 5);

    reg.reset("s", false).await.unwrap();
    let status = &reg.status().await["s"];
    assert_eq!(status.messages_count, 1);
    assert!(status.browser_started);
}

#[tokio::test]
async fn test_actions_before_start_are_rejected_without_side_effects() {
    let llm = MockLlmClient::new()
        .push_call("c1", "go_to_website", r#"{"url": "https://example.com"}"#)
        .push_call("c2", "go_to_website", r#"{"url": "ftp://example.com"}"#)
        .push_text("gave up");
    let factory = MockActuatorFactory::new();
    let probe = factory.probe();
    let reg = registry(llm, factory);

    let result = reg.interact("s", "open example", None).await;
    assert!(result.is_completed());
    let results = action_results(&result.events);
    assert!(results.iter().all(|(_, s)| *s == OutcomeStatus::Error));
    assert!(probe.calls().is_empty());
}

#[tokio::test]
async fn test_sessions_run_in_parallel() {
    let llm = MockLlmClient::new()
        .push_call("a1", "start_browser", "{}")
        .push_call("b1", "start_browser", "{}")
        .push_text("done")
        .push_text("done");
    let factory = MockActuatorFactory::new().with_delay(Duration::from_millis(200));
    let probe = factory.probe();
    let reg = registry(llm, factory);

    let (a, b) = tokio::join!(reg.interact("a", "start", None), reg.interact("b", "start", None));
    assert!(a.is_completed());
    assert!(b.is_completed());
    assert_eq!(probe.max_in_flight(), 2);
    assert_eq!(probe.max_in_flight_per_actuator(), 1);
}

#[tokio::test]
async fn test_same_session_is_serialized() {
    let llm = MockLlmClient::new()
        .push_call("c1", "start_browser", "{}")
        .push_text("first")
        .push_call("c2", "refresh_content", "{}")
        .push_text("second");
    let factory = MockActuatorFactory::new().with_delay(Duration::from_millis(50));
    let probe = factory.probe();
    let reg = registry(llm, factory);

    let (r1, r2) = tokio::join!(reg.interact("s", "one", None), reg.interact("s", "two", None));
    let mut finals = vec![r1.final_response, r2.final_response];
    finals.sort();
    assert_eq!(finals, vec![Some("first".to_string()), Some("second".to_string())]);
    assert_eq!(probe.max_in_flight(), 1);
    assert_eq!(probe.calls(), vec!["s:start", "s:observe"]);
}

#[tokio::test]
async fn test_close_stops_running_interaction_at_turn_boundary() {
    let mut llm = MockLlmClient::new().push_call("c0", "start_browser", "{}");
    for i in 1..=20 {
        llm = llm.push_call(&format!("c{i}"), "refresh_content", "{}");
    }
    let factory = MockActuatorFactory::new().with_delay(Duration::from_millis(50));
    let probe = factory.probe();
    let reg = registry(llm, factory);

    let runner = {
        let reg = Arc::clone(&reg);
        tokio::spawn(async move { reg.interact("s", "loop", Some(20)).await })
    };
    tokio::time::sleep(Duration::from_millis(120)).await;
    reg.close("s").await.unwrap();

    let result = runner.await.unwrap();
    assert_eq!(result.status, InteractionStatus::Failed);
    assert!(!reg.contains("s").await);
    assert_eq!(probe.stops(), 1);
    assert_eq!(probe.calls().last().map(String::as_str), Some("s:stop"));
}
