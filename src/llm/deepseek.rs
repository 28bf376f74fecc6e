//! DeepSeek 端点（OpenAI 兼容格式，支持 function calling）
//!
//! - Base URL: https://api.deepseek.com
//! - 浏览器操控需要工具调用，只用 deepseek-chat；deepseek-reasoner 不支持 tools

use crate::llm::OpenAiClient;

pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
pub const DEEPSEEK_CHAT: &str = "deepseek-chat";

/// 创建 DeepSeek 客户端
///
/// key 依次取 `DEEPSEEK_API_KEY`、`OPENAI_API_KEY`；model 依次取参数、`DEEPSEEK_MODEL`、deepseek-chat
pub fn create_deepseek_client(model: Option<&str>) -> OpenAiClient {
    let api_key = std::env::var("DEEPSEEK_API_KEY")
        .ok()
        .or_else(|| std::env::var("OPENAI_API_KEY").ok());

    let model = model
        .filter(|m| m.starts_with("deepseek"))
        .map(String::from)
        .or_else(|| std::env::var("DEEPSEEK_MODEL").ok())
        .unwrap_or_else(|| DEEPSEEK_CHAT.to_string());

    OpenAiClient::new(Some(DEEPSEEK_BASE_URL), &model, api_key.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmClient;

    #[test]
    fn test_explicit_model_kept() {
        let client = create_deepseek_client(Some("deepseek-chat"));
        assert_eq!(client.model_name(), "deepseek-chat");
    }
}
