//! Agent 顶层错误类型
//!
//! 单步动作错误（InvalidArgument / NotStarted / ...）见 `tools::ActionError`，它们被吸收进对话历史；
//! 这里只放会逃逸到单次交互边界的错误，由 SessionRegistry / HTTP 前端转换为 `failed` 结果或状态码。

use thiserror::Error;

use crate::llm::LlmError;

/// 交互过程中可能逃逸到顶层的错误
#[derive(Error, Debug)]
pub enum AgentError {
    /// Planner 调用失败（网络、配额、返回无法解析），对当前交互是致命的
    #[error("Error calling planner: {0}")]
    PlannerFailure(#[from] LlmError),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("max_turns must be at least 1 (got {0})")]
    InvalidTurnBudget(usize),

    /// 会话在交互进行中被关闭，于回合边界处停止
    #[error("Session closed while the interaction was running")]
    Cancelled,

    /// 配置文件或环境变量无法解析
    #[error("Config error: {0}")]
    ConfigError(String),
}

impl AgentError {
    /// 是否属于调用方输入错误（HTTP 前端映射为 400/404）
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AgentError::SessionNotFound(_) | AgentError::InvalidTurnBudget(_)
        )
    }
}

impl From<config::ConfigError> for AgentError {
    fn from(e: config::ConfigError) -> Self {
        AgentError::ConfigError(e.to_string())
    }
}
