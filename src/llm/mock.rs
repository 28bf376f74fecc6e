//! Mock LLM 客户端（用于测试与离线运行，无需 API）
//!
//! 按顺序吐出预先写好的回复；脚本耗尽后返回固定文本，或按 `failing` 返回错误。
//! 每次调用看到的历史会被记录下来，便于断言压缩/顺序。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError, LlmReply, ToolInvocation, ToolSpec};
use crate::memory::Message;

/// 脚本化的 Mock 客户端
#[derive(Debug, Default)]
pub struct MockLlmClient {
    script: Mutex<VecDeque<Result<LlmReply, LlmError>>>,
    seen: Mutex<Vec<Vec<Message>>>,
    fallback_text: Option<String>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 脚本耗尽后的固定回复；未设置时返回 Malformed 错误
    pub fn with_fallback(mut self, text: impl Into<String>) -> Self {
        self.fallback_text = Some(text.into());
        self
    }

    pub fn push_reply(self, reply: LlmReply) -> Self {
        self.push(Ok(reply))
    }

    pub fn push_error(self, error: LlmError) -> Self {
        self.push(Err(error))
    }

    /// 追加一条只含单个工具调用的回复
    pub fn push_call(self, call_id: &str, name: &str, arguments: &str) -> Self {
        self.push_reply(LlmReply::default().with_call(ToolInvocation {
            call_id: call_id.to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }))
    }

    pub fn push_text(self, text: &str) -> Self {
        self.push_reply(LlmReply::text(text))
    }

    fn push(self, item: Result<LlmReply, LlmError>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(item);
        }
        self
    }

    /// 已被调用的次数
    pub fn calls(&self) -> usize {
        self.seen.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// 每次调用时收到的历史（渲染后）
    pub fn seen_histories(&self) -> Vec<Vec<Message>> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn model_name(&self) -> &str {
        "mock"
    }

    async fn complete(
        &self,
        messages: &[Message],
        _tools: &[ToolSpec],
    ) -> Result<LlmReply, LlmError> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(messages.to_vec());
        }
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        match next {
            Some(item) => item,
            None => match &self.fallback_text {
                Some(text) => Ok(LlmReply::text(text.clone())),
                None => Err(LlmError::Malformed("mock script exhausted".into())),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_order_and_fallback() {
        let mock = MockLlmClient::new()
            .push_call("c1", "start_browser", "{}")
            .push_text("done")
            .with_fallback("idle");

        let r1 = mock.complete(&[Message::user("a")], &[]).await.unwrap();
        assert_eq!(r1.tool_calls[0].name, "start_browser");
        let r2 = mock.complete(&[], &[]).await.unwrap();
        assert_eq!(r2.text.as_deref(), Some("done"));
        let r3 = mock.complete(&[], &[]).await.unwrap();
        assert_eq!(r3.text.as_deref(), Some("idle"));
        assert_eq!(mock.calls(), 3);
        assert_eq!(mock.seen_histories()[0], vec![Message::user("a")]);
    }

    #[tokio::test]
    async fn test_exhausted_without_fallback_errors() {
        let mock = MockLlmClient::new().push_error(LlmError::Transport("down".into()));
        assert!(matches!(
            mock.complete(&[], &[]).await,
            Err(LlmError::Transport(_))
        ));
        assert!(matches!(
            mock.complete(&[], &[]).await,
            Err(LlmError::Malformed(_))
        ));
    }
}
