//! 运行时装配
//!
//! 由 `AppConfig` 构建 Planner 客户端、Actuator 工厂、TurnEngine 与 SessionRegistry，
//! 供 HTTP 前端和二进制入口共用。

use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::gateway::SessionRegistry;
use crate::llm::{create_deepseek_client, LlmClient, MockLlmClient, OpenAiClient};
use crate::memory::{HistoryCompactor, HistoryDump};
use crate::react::{load_system_prompt, Planner, TurnEngine};
use crate::tools::{ActionExecutor, ActuatorFactory, MockActuatorFactory};

/// 没有可用后端时 Mock Planner 的固定回复
pub const OFFLINE_REPLY: &str =
    "No language model is configured. Set OPENAI_API_KEY or DEEPSEEK_API_KEY to enable planning.";

/// 按配置与环境变量选择 Planner 后端；都不可用时退回 Mock
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();
    let timeout = Duration::from_secs(cfg.llm.timeouts.request.max(1));
    let has_openai = std::env::var("OPENAI_API_KEY").is_ok();
    let has_deepseek = std::env::var("DEEPSEEK_API_KEY").is_ok();

    let use_deepseek = provider == "deepseek" && (has_deepseek || has_openai);
    let use_openai = provider == "openai" && has_openai;

    if use_deepseek {
        let client = create_deepseek_client(Some(&cfg.llm.model))
            .with_temperature(cfg.llm.temperature)
            .with_timeout(timeout);
        tracing::info!(model = %client.model_name(), "using DeepSeek planner");
        Arc::new(client)
    } else if use_openai {
        let client = OpenAiClient::new(cfg.llm.base_url.as_deref(), &cfg.llm.model, None)
            .with_temperature(cfg.llm.temperature)
            .with_timeout(timeout);
        tracing::info!(model = %cfg.llm.model, "using OpenAI planner");
        Arc::new(client)
    } else {
        tracing::warn!(provider = %provider, "no API key for provider, using mock planner");
        Arc::new(MockLlmClient::new().with_fallback(OFFLINE_REPLY))
    }
}

/// 按配置选择 Actuator 工厂：启用 browser feature 且未设 mock 时用 Chrome
pub fn create_actuator_factory(cfg: &AppConfig) -> Arc<dyn ActuatorFactory> {
    #[cfg(feature = "browser")]
    {
        if !cfg.browser.mock {
            let options = crate::tools::ChromeOptions::from(&cfg.browser);
            tracing::info!(headless = options.headless, "using Chrome actuator");
            return Arc::new(crate::tools::ChromeActuatorFactory::new(options));
        }
    }

    if !cfg.browser.mock {
        tracing::warn!("built without the browser feature, using mock actuator");
    }
    Arc::new(MockActuatorFactory::new())
}

/// 构建 TurnEngine（Planner + 执行器 + 压缩器 + 可选历史转储）
pub fn create_engine(cfg: &AppConfig, llm: Arc<dyn LlmClient>) -> TurnEngine {
    let mut engine = TurnEngine::new(
        Planner::new(llm),
        ActionExecutor::new(cfg.browser.action_timeout_secs),
        HistoryCompactor::new(cfg.history.keep_snapshots),
    )
    .with_batch_actions(cfg.history.batch_actions);
    if let Some(dir) = &cfg.app.dump_dir {
        engine = engine.with_dump(HistoryDump::new(dir));
    }
    engine
}

/// 由配置构建完整的 SessionRegistry
pub fn create_registry(cfg: &AppConfig) -> SessionRegistry {
    let llm = create_llm_from_config(cfg);
    create_registry_with(cfg, llm, create_actuator_factory(cfg))
}

/// 注入指定的 Planner 客户端与 Actuator 工厂（测试 / 嵌入使用）
pub fn create_registry_with(
    cfg: &AppConfig,
    llm: Arc<dyn LlmClient>,
    factory: Arc<dyn ActuatorFactory>,
) -> SessionRegistry {
    let system_prompt = load_system_prompt(cfg.app.system_prompt_path.as_deref());
    SessionRegistry::new(
        create_engine(cfg, llm),
        factory,
        system_prompt,
        cfg.app.default_max_turns,
    )
}
