//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / DeepSeek / Mock）实现 LlmClient：给定历史与工具目录，返回可选文本 + 零到多个工具调用。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::memory::Message;

/// 工具目录中的一项（function calling 的 function 定义）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema（object）
    pub parameters: serde_json::Value,
}

/// Planner 请求的一次工具调用；arguments 为原始 JSON 字符串，解析由调用方负责
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub call_id: String,
    pub name: String,
    pub arguments: String,
}

/// 一次 complete 的结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LlmReply {
    /// 自由文本；空字符串视为无文本
    pub text: Option<String>,
    pub tool_calls: Vec<ToolInvocation>,
}

impl LlmReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn with_call(mut self, call: ToolInvocation) -> Self {
        self.tool_calls.push(call);
        self
    }

    /// 去掉空白后的非空文本
    pub fn non_empty_text(&self) -> Option<&str> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Planner 调用失败
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("rate limited (retry after {retry_after_ms:?}ms)")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// LLM 客户端 trait
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 非流式完成（tool_choice = auto）
    async fn complete(&self, messages: &[Message], tools: &[ToolSpec])
        -> Result<LlmReply, LlmError>;

    /// 模型名，用于日志
    fn model_name(&self) -> &str {
        "unknown"
    }

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_text() {
        assert_eq!(LlmReply::default().non_empty_text(), None);
        assert_eq!(LlmReply::text("  \n").non_empty_text(), None);
        assert_eq!(LlmReply::text(" done ").non_empty_text(), Some("done"));
    }

    #[test]
    fn test_error_display() {
        let e = LlmError::Api {
            status: 500,
            message: "boom".into(),
        };
        assert_eq!(e.to_string(), "API error 500: boom");
    }
}
