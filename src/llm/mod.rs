//! LLM 层：Planner 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）

pub mod deepseek;
pub mod mock;
pub mod openai;
pub mod traits;

pub use deepseek::{create_deepseek_client, DEEPSEEK_BASE_URL, DEEPSEEK_CHAT};
pub use mock::MockLlmClient;
pub use openai::{OpenAiClient, TokenUsage, OPENAI_BASE_URL};
pub use traits::{LlmClient, LlmError, LlmReply, ToolInvocation, ToolSpec};
