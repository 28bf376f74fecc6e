//! Planner：持有 LLM 与静态工具目录
//!
//! 每轮把（已压缩的）完整历史交给 LLM，拿回可选文本 + 工具调用；不重试，失败原样返回。

use std::sync::Arc;

use crate::llm::{LlmClient, LlmError, LlmReply, ToolSpec};
use crate::memory::History;
use crate::tools::action_catalog;

pub struct Planner {
    llm: Arc<dyn LlmClient>,
    catalog: Vec<ToolSpec>,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            catalog: action_catalog(),
        }
    }

    pub fn catalog(&self) -> &[ToolSpec] {
        &self.catalog
    }

    pub fn model_name(&self) -> &str {
        self.llm.model_name()
    }

    /// 获取 LLM 累计 token 使用统计
    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.llm.token_usage()
    }

    pub async fn plan(&self, history: &History) -> Result<LlmReply, LlmError> {
        self.llm.complete(&history.messages(), &self.catalog).await
    }
}
