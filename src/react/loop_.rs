//! TurnEngine：Plan -> Act -> Observe 主循环
//!
//! 每轮：压缩历史 -> 调 Planner -> 文本入历史 -> 逐个解析/执行工具调用，请求与结果交错追加。
//! 无工具调用且有文本即完成；Planner 失败立即以 failed 结束；轮数用尽返回 turn_budget_exhausted。
//! 取消只在回合边界检查，进行中的动作总会跑完。

use tokio_util::sync::CancellationToken;

use crate::core::AgentError;
use crate::gateway::Session;
use crate::llm::ToolInvocation;
use crate::memory::{HistoryCompactor, HistoryDump, Message};
use crate::react::{
    ActionRecord, InteractionEvent, InteractionResult, InteractionStatus, Planner,
};
use crate::tools::{ActionError, ActionExecutor, ActionOutcome, ActionRequest};

pub const MAX_TURNS_MESSAGE: &str =
    "Maximum interaction turns reached. The task might be incomplete.";
const SKIPPED_CALL_MESSAGE: &str =
    "Only one action is executed per turn; this call was skipped. Request it again if still needed.";

/// 单次交互的过程记录
#[derive(Default)]
struct Transcript {
    events: Vec<InteractionEvent>,
    actions: Vec<ActionRecord>,
}

impl Transcript {
    fn finish(
        self,
        status: InteractionStatus,
        message: impl Into<String>,
        final_response: Option<String>,
    ) -> InteractionResult {
        InteractionResult {
            status,
            message: message.into(),
            final_response,
            events: self.events,
            actions: self.actions,
        }
    }
}

pub struct TurnEngine {
    planner: Planner,
    executor: ActionExecutor,
    compactor: HistoryCompactor,
    dump: Option<HistoryDump>,
    batch_actions: bool,
}

impl TurnEngine {
    pub fn new(planner: Planner, executor: ActionExecutor, compactor: HistoryCompactor) -> Self {
        Self {
            planner,
            executor,
            compactor,
            dump: None,
            batch_actions: false,
        }
    }

    /// 每次交互结束后转储历史
    pub fn with_dump(mut self, dump: HistoryDump) -> Self {
        self.dump = Some(dump);
        self
    }

    /// 一轮多个工具调用时全部执行
    pub fn with_batch_actions(mut self, batch: bool) -> Self {
        self.batch_actions = batch;
        self
    }

    pub fn planner(&self) -> &Planner {
        &self.planner
    }

    pub fn executor(&self) -> &ActionExecutor {
        &self.executor
    }

    /// 运行一次交互；调用方已持有该会话的独占访问
    pub async fn run(
        &self,
        session: &mut Session,
        command: &str,
        cancel: &CancellationToken,
    ) -> InteractionResult {
        let budget = session.turn_budget();
        let session_id = session.id().to_string();
        tracing::info!(session_id = %session_id, budget, "interaction started");

        let usage_start = self.planner.token_usage();
        session.history_mut().push(Message::user(command));
        let mut transcript = Transcript::default();
        let mut last_turn_text: Option<String> = None;

        for turn in 1..=budget {
            if cancel.is_cancelled() {
                tracing::info!(session_id = %session_id, turn, "session closed, stopping at turn boundary");
                let message = AgentError::Cancelled.to_string();
                return self
                    .finish(
                        session,
                        usage_start,
                        transcript.finish(InteractionStatus::Failed, message.clone(), Some(message)),
                    )
                    .await;
            }
            last_turn_text = None;
            tracing::debug!(session_id = %session_id, turn, budget, "turn");

            self.compactor.compact(session.history_mut());

            let reply = match self.planner.plan(session.history()).await {
                Ok(reply) => reply,
                Err(e) => {
                    let message = AgentError::PlannerFailure(e).to_string();
                    tracing::warn!(session_id = %session_id, turn, error = %message, "planner failed");
                    session.history_mut().push(Message::assistant(&message));
                    transcript.events.push(InteractionEvent::PlannerFailed {
                        turn,
                        content: message.clone(),
                    });
                    return self
                        .finish(
                            session,
                            usage_start,
                            transcript.finish(InteractionStatus::Failed, message.clone(), Some(message)),
                        )
                        .await;
                }
            };

            let text = reply.non_empty_text().map(str::to_string);

            if reply.tool_calls.is_empty() {
                match text {
                    Some(text) => {
                        session.history_mut().push(Message::assistant(&text));
                        transcript.events.push(InteractionEvent::FinalResponse {
                            turn,
                            content: text.clone(),
                        });
                        tracing::info!(session_id = %session_id, turn, "interaction completed");
                        return self
                            .finish(
                                session,
                                usage_start,
                                transcript.finish(
                                    InteractionStatus::Completed,
                                    "Task completed successfully",
                                    Some(text),
                                ),
                            )
                            .await;
                    }
                    None => {
                        tracing::debug!(session_id = %session_id, turn, "planner returned neither text nor tool calls");
                        continue;
                    }
                }
            }

            if let Some(text) = text {
                if session.history_mut().push(Message::assistant(&text)) {
                    transcript.events.push(InteractionEvent::Thinking {
                        turn,
                        content: text.clone(),
                    });
                }
                last_turn_text = Some(text);
            }

            for (index, invocation) in reply.tool_calls.iter().enumerate() {
                session.history_mut().push(Message::action_request(
                    &invocation.call_id,
                    &invocation.name,
                    &invocation.arguments,
                ));
                transcript.actions.push(action_record(turn, invocation));

                let outcome = if index > 0 && !self.batch_actions {
                    ActionOutcome::failure(ActionError::InvalidArgument(
                        SKIPPED_CALL_MESSAGE.to_string(),
                    ))
                } else {
                    match ActionRequest::from_invocation(invocation) {
                        Ok(request) => {
                            self.executor
                                .execute(session.actuator_mut(), &request)
                                .await
                        }
                        Err(e) => {
                            tracing::debug!(session_id = %session_id, tool = %invocation.name, error = %e, "malformed action request");
                            ActionOutcome::failure(e)
                        }
                    }
                };

                session
                    .history_mut()
                    .push(Message::action_outcome(&invocation.call_id, outcome.render()));
                transcript.events.push(InteractionEvent::ActionResult {
                    turn,
                    call_id: invocation.call_id.clone(),
                    function: invocation.name.clone(),
                    status: outcome.status,
                    message: outcome.message,
                });
            }
        }

        let final_text = match last_turn_text {
            Some(text) => text,
            None => {
                session.history_mut().push(Message::assistant(MAX_TURNS_MESSAGE));
                MAX_TURNS_MESSAGE.to_string()
            }
        };
        transcript.events.push(InteractionEvent::MaxTurnsReached {
            turn: budget,
            content: final_text.clone(),
        });
        tracing::info!(session_id = %session_id, budget, "turn budget exhausted");
        self.finish(
            session,
            usage_start,
            transcript.finish(
                InteractionStatus::TurnBudgetExhausted,
                "Maximum interaction turns reached",
                Some(final_text),
            ),
        )
        .await
    }

    async fn finish(
        &self,
        session: &Session,
        usage_start: (u64, u64, u64),
        result: InteractionResult,
    ) -> InteractionResult {
        if let Some(dump) = &self.dump {
            dump.write_best_effort(session.id(), session.history()).await;
        }
        // 客户端计数在会话间共享，这里只记本次交互期间的增量
        let (prompt, completion, total) = usage_delta(usage_start, self.planner.token_usage());
        tracing::info!(
            session_id = %session.id(),
            status = ?result.status,
            actions = result.actions.len(),
            model = %self.planner.model_name(),
            prompt_tokens = prompt,
            completion_tokens = completion,
            total_tokens = total,
            "interaction finished"
        );
        result
    }
}

fn usage_delta(start: (u64, u64, u64), end: (u64, u64, u64)) -> (u64, u64, u64) {
    (
        end.0.saturating_sub(start.0),
        end.1.saturating_sub(start.1),
        end.2.saturating_sub(start.2),
    )
}

fn action_record(turn: usize, invocation: &ToolInvocation) -> ActionRecord {
    let arguments = serde_json::from_str(&invocation.arguments)
        .unwrap_or_else(|_| serde_json::Value::String(invocation.arguments.clone()));
    ActionRecord {
        turn,
        call_id: invocation.call_id.clone(),
        function: invocation.name.clone(),
        arguments,
    }
}
