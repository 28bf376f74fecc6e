//! 动作执行器
//!
//! 按会话状态校验一次 ActionRequest 并转发给 Actuator，结果统一为 ActionOutcome（从不向调用方报错）。
//! 校验顺序：start 已启动 → AlreadyStarted；stop 未启动 → 成功空操作；其余动作未启动 → NotStarted；
//! 然后才是参数校验。每次转发都在超时内执行，并输出结构化审计日志（JSON）。

use std::future::Future;
use std::time::{Duration, Instant};

use tokio::time::timeout;

use crate::tools::{
    Action, ActionError, ActionOutcome, ActionRequest, ActuatorHandle, ActuatorResult,
};

pub const DEFAULT_SCROLL_X: f64 = 0.0;
pub const DEFAULT_SCROLL_Y: f64 = 500.0;

const INVALID_URL: &str =
    "Invalid or missing URL. Please provide a full URL starting with http:// or https://.";

/// 动作执行器：对每次 Actuator 调用施加超时
#[derive(Debug, Clone)]
pub struct ActionExecutor {
    timeout: Duration,
}

impl ActionExecutor {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// 执行一次动作；start / stop 成功时翻转 handle 的 ready 标记
    pub async fn execute(&self, handle: &mut ActuatorHandle, request: &ActionRequest) -> ActionOutcome {
        let start = Instant::now();
        let kind = request.action.kind();
        let outcome = self.dispatch(handle, &request.action).await;

        let (ok, result) = match &outcome.error {
            None => (true, "ok"),
            Some(ActionError::InvalidArgument(_)) => (false, "invalid_argument"),
            Some(ActionError::NotStarted) => (false, "not_started"),
            Some(ActionError::AlreadyStarted) => (false, "already_started"),
            Some(ActionError::ActuatorFailure(_)) => (false, "actuator_failure"),
        };
        let audit = serde_json::json!({
            "event": "action_audit",
            "call_id": request.call_id,
            "action": kind.tool_name(),
            "ok": ok,
            "outcome": result,
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": args_preview(&request.action),
            "ready": handle.is_ready(),
        });
        tracing::info!(audit = %audit.to_string(), "action");

        outcome
    }

    async fn dispatch(&self, handle: &mut ActuatorHandle, action: &Action) -> ActionOutcome {
        match action {
            Action::Start => {
                if handle.is_ready() {
                    return ActionOutcome::failure(ActionError::AlreadyStarted);
                }
                match timeout(self.timeout, handle.actuator().start()).await {
                    Ok(result) => {
                        let outcome = into_outcome(result);
                        if outcome.is_ok() {
                            handle.set_ready(true);
                        }
                        outcome
                    }
                    Err(_) => self.abandon_start(handle).await,
                }
            }
            Action::Stop => {
                if !handle.is_ready() {
                    return ActionOutcome::success("Browser already closed.", None);
                }
                let outcome = self.forward("close_browser", handle.actuator().stop()).await;
                if outcome.is_ok() {
                    handle.set_ready(false);
                }
                outcome
            }
            _ if !handle.is_ready() => ActionOutcome::failure(ActionError::NotStarted),
            Action::Navigate { url } => match url.as_deref().and_then(validate_url) {
                Some(url) => {
                    self.forward("go_to_website", handle.actuator().navigate(&url))
                        .await
                }
                None => ActionOutcome::failure(ActionError::InvalidArgument(INVALID_URL.into())),
            },
            Action::Click { x, y } => match (x, y) {
                (Some(x), Some(y)) => {
                    self.forward("click_at_coordinates", handle.actuator().click(*x, *y))
                        .await
                }
                _ => ActionOutcome::failure(ActionError::InvalidArgument(
                    "Missing x or y coordinate for click.".into(),
                )),
            },
            Action::Type { x, y, text } => match (x, y) {
                (Some(x), Some(y)) => {
                    self.forward(
                        "input_text_at_coordinates",
                        handle.actuator().type_text(*x, *y, text),
                    )
                    .await
                }
                _ => ActionOutcome::failure(ActionError::InvalidArgument(
                    "Missing x or y coordinate for input.".into(),
                )),
            },
            Action::Scroll { x, y } => {
                let dx = x.unwrap_or(DEFAULT_SCROLL_X).round() as i64;
                let dy = y.unwrap_or(DEFAULT_SCROLL_Y).round() as i64;
                self.forward("scroll_page", handle.actuator().scroll(dx, dy))
                    .await
            }
            Action::Observe => {
                self.forward("refresh_content", handle.actuator().observe())
                    .await
            }
        }
    }

    /// 在超时内等待 Actuator；超时或失败归为 ActuatorFailure
    async fn forward<F>(&self, name: &str, call: F) -> ActionOutcome
    where
        F: Future<Output = ActuatorResult>,
    {
        match timeout(self.timeout, call).await {
            Ok(result) => into_outcome(result),
            Err(_) => ActionOutcome::failure(ActionError::ActuatorFailure(format!(
                "{name} timed out after {:?}",
                self.timeout
            ))),
        }
    }

    /// start 超时后补发一次 stop。
    /// 启动可能仍在阻塞线程里进行，stop 会排在它之后把进程收回；ready 保持 false
    async fn abandon_start(&self, handle: &mut ActuatorHandle) -> ActionOutcome {
        tracing::warn!(timeout = ?self.timeout, "start_browser timed out, stopping the half-started browser");
        match timeout(self.timeout, handle.actuator().stop()).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::debug!(error = %e, "stop after start timeout"),
            Err(_) => tracing::warn!("stop after start timeout did not finish in time"),
        }
        ActionOutcome::failure(ActionError::ActuatorFailure(format!(
            "start_browser timed out after {:?}; the browser was stopped",
            self.timeout
        )))
    }
}

fn into_outcome(result: ActuatorResult) -> ActionOutcome {
    match result {
        Ok(report) => ActionOutcome::success(report.message, report.snapshot),
        Err(e) => ActionOutcome::failure(ActionError::ActuatorFailure(e)),
    }
}

/// 只接受带 host 的绝对 http / https URL，返回规范化后的字符串
fn validate_url(raw: &str) -> Option<String> {
    let url = reqwest::Url::parse(raw.trim()).ok()?;
    if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() {
        Some(url.to_string())
    } else {
        None
    }
}

fn args_preview(action: &Action) -> String {
    let s = serde_json::to_string(action).unwrap_or_default();
    if s.len() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ActionKind, MockActuator};

    fn req(action: Action) -> ActionRequest {
        ActionRequest::new("call", action)
    }

    fn handle(mock: MockActuator) -> ActuatorHandle {
        ActuatorHandle::new(Box::new(mock))
    }

    async fn started(mock: MockActuator) -> ActuatorHandle {
        let mut h = handle(mock);
        let out = ActionExecutor::new(5).execute(&mut h, &req(Action::Start)).await;
        assert!(out.is_ok());
        h
    }

    #[tokio::test]
    async fn test_start_then_start_again() {
        let exec = ActionExecutor::new(5);
        let mut h = handle(MockActuator::new());
        assert!(exec.execute(&mut h, &req(Action::Start)).await.is_ok());
        assert!(h.is_ready());
        let again = exec.execute(&mut h, &req(Action::Start)).await;
        assert_eq!(again.error, Some(ActionError::AlreadyStarted));
        assert!(h.is_ready());
    }

    #[tokio::test]
    async fn test_not_started_precedes_argument_checks() {
        let exec = ActionExecutor::new(5);
        let mock = MockActuator::new();
        let probe = mock.probe();
        let mut h = handle(mock);
        for action in [
            Action::Navigate { url: None },
            Action::Click { x: None, y: None },
            Action::Type {
                x: Some(1.0),
                y: Some(1.0),
                text: "x".into(),
            },
            Action::Scroll { x: None, y: None },
            Action::Observe,
        ] {
            let out = exec.execute(&mut h, &req(action)).await;
            assert_eq!(out.error, Some(ActionError::NotStarted));
        }
        assert!(probe.calls().is_empty());
    }

    #[tokio::test]
    async fn test_stop_when_never_started_is_noop() {
        let exec = ActionExecutor::new(5);
        let mock = MockActuator::new();
        let probe = mock.probe();
        let mut h = handle(mock);
        let out = exec.execute(&mut h, &req(Action::Stop)).await;
        assert!(out.is_ok());
        assert_eq!(out.message, "Browser already closed.");
        assert!(probe.calls().is_empty());
    }

    #[tokio::test]
    async fn test_stop_flips_ready() {
        let mut h = started(MockActuator::new()).await;
        let out = ActionExecutor::new(5).execute(&mut h, &req(Action::Stop)).await;
        assert!(out.is_ok());
        assert!(!h.is_ready());
    }

    #[tokio::test]
    async fn test_navigate_url_validation() {
        let exec = ActionExecutor::new(5);
        let mock = MockActuator::new();
        let probe = mock.probe();
        let mut h = started(mock).await;
        for bad in ["example.com", "ftp://example.com", "", "javascript:alert(1)", "http://"] {
            let out = exec
                .execute(&mut h, &req(Action::Navigate { url: Some(bad.into()) }))
                .await;
            assert!(
                matches!(out.error, Some(ActionError::InvalidArgument(_))),
                "{bad} accepted"
            );
        }
        let ok = exec
            .execute(
                &mut h,
                &req(Action::Navigate {
                    url: Some("https://example.com".into()),
                }),
            )
            .await;
        assert!(ok.is_ok());
        assert_eq!(ok.snapshot.unwrap().url, "https://example.com/");
        assert_eq!(probe.calls(), vec!["mock:start", "mock:navigate https://example.com/"]);
    }

    #[tokio::test]
    async fn test_click_requires_both_coordinates() {
        let exec = ActionExecutor::new(5);
        let mut h = started(MockActuator::new()).await;
        let out = exec
            .execute(&mut h, &req(Action::Click { x: Some(1.0), y: None }))
            .await;
        assert_eq!(
            out.error,
            Some(ActionError::InvalidArgument("Missing x or y coordinate for click.".into()))
        );
        let ok = exec
            .execute(&mut h, &req(Action::Click { x: Some(1.0), y: Some(2.0) }))
            .await;
        assert!(ok.is_ok());
        assert!(ok.snapshot.is_some());
    }

    #[tokio::test]
    async fn test_scroll_defaults() {
        let exec = ActionExecutor::new(5);
        let mock = MockActuator::new();
        let probe = mock.probe();
        let mut h = started(mock).await;
        exec.execute(&mut h, &req(Action::Scroll { x: None, y: None }))
            .await;
        exec.execute(&mut h, &req(Action::Scroll { x: Some(-10.4), y: Some(-200.0) }))
            .await;
        let calls = probe.calls();
        assert_eq!(calls[1], "mock:scroll 0,500");
        assert_eq!(calls[2], "mock:scroll -10,-200");
    }

    #[tokio::test]
    async fn test_actuator_failure_is_absorbed() {
        let exec = ActionExecutor::new(5);
        let mut h = started(MockActuator::new().failing_on(ActionKind::Observe)).await;
        let out = exec.execute(&mut h, &req(Action::Observe)).await;
        assert!(matches!(out.error, Some(ActionError::ActuatorFailure(_))));
        assert!(h.is_ready());
    }

    #[tokio::test]
    async fn test_failed_start_keeps_not_ready() {
        let exec = ActionExecutor::new(5);
        let mut h = handle(MockActuator::new().failing_on(ActionKind::Start));
        let out = exec.execute(&mut h, &req(Action::Start)).await;
        assert!(matches!(out.error, Some(ActionError::ActuatorFailure(_))));
        assert!(!h.is_ready());
    }

    #[tokio::test]
    async fn test_timeout_maps_to_actuator_failure() {
        let exec = ActionExecutor::with_timeout(Duration::from_millis(20));
        let mock = MockActuator::new().with_delay(Duration::from_millis(200));
        let mut h = handle(mock);
        let out = exec.execute(&mut h, &req(Action::Start)).await;
        match out.error {
            Some(ActionError::ActuatorFailure(msg)) => assert!(msg.contains("timed out")),
            other => panic!("unexpected {other:?}"),
        }
        assert!(!h.is_ready());
    }

    #[tokio::test]
    async fn test_start_timeout_stops_half_started_browser() {
        let exec = ActionExecutor::with_timeout(Duration::from_millis(50));
        let mock = MockActuator::new().slow_on(ActionKind::Start, Duration::from_millis(200));
        let calls = mock.probe();
        let mut h = handle(mock);

        let out = exec.execute(&mut h, &req(Action::Start)).await;
        match out.error {
            Some(ActionError::ActuatorFailure(msg)) => {
                assert!(msg.contains("timed out"));
                assert!(msg.contains("stopped"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(!h.is_ready());
        assert_eq!(calls.calls(), vec!["mock:start", "mock:stop"]);
        assert_eq!(calls.stops(), 1);

        // 之后可以重新启动
        let exec = ActionExecutor::with_timeout(Duration::from_millis(500));
        assert!(exec.execute(&mut h, &req(Action::Start)).await.is_ok());
        assert!(h.is_ready());
    }
}
