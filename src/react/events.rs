//! 交互过程事件与结果
//!
//! 每次交互返回一个不可变的 `InteractionResult`：终态、可选最终回复、按顺序的过程事件和动作记录。

use serde::Serialize;

use crate::tools::OutcomeStatus;

/// 单步过程事件（可序列化为 JSON 供前端展示）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InteractionEvent {
    /// Planner 的思考 / 解释文本
    Thinking { turn: usize, content: String },
    /// 一次动作的执行结果
    ActionResult {
        turn: usize,
        call_id: String,
        function: String,
        status: OutcomeStatus,
        message: String,
    },
    /// Planner 给出最终回复（无工具调用）
    FinalResponse { turn: usize, content: String },
    /// 轮数用尽
    MaxTurnsReached { turn: usize, content: String },
    /// Planner 调用失败
    PlannerFailed { turn: usize, content: String },
}

/// 交互终态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionStatus {
    Completed,
    TurnBudgetExhausted,
    Failed,
}

/// Planner 请求过的一次动作
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionRecord {
    pub turn: usize,
    pub call_id: String,
    pub function: String,
    /// 解析后的 JSON；无法解析时为原始字符串
    pub arguments: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionResult {
    pub status: InteractionStatus,
    pub message: String,
    pub final_response: Option<String>,
    #[serde(rename = "history")]
    pub events: Vec<InteractionEvent>,
    pub actions: Vec<ActionRecord>,
}

impl InteractionResult {
    /// 没有过程记录的失败结果（会话解析、参数校验等边界错误）
    pub fn failed(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            status: InteractionStatus::Failed,
            final_response: Some(message.clone()),
            message,
            events: Vec::new(),
            actions: Vec::new(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == InteractionStatus::Completed
    }
}
