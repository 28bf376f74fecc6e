//! Bee Browser - LLM 驱动的浏览器智能体服务
//!
//! 模块划分：
//! - **agent**: 运行时装配（按配置选择 Planner 后端与 Actuator）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 顶层错误、优雅关闭
//! - **gateway**: 会话与会话注册表（同会话串行、跨会话并发）
//! - **integrations**: HTTP 服务前端
//! - **llm**: Planner 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）
//! - **memory**: 对话历史、快照压缩、历史转储
//! - **observability**: 日志初始化
//! - **react**: Planner、System prompt、TurnEngine 主循环
//! - **tools**: 浏览器动作、动作目录、执行器与 Actuator

pub mod agent;
pub mod config;
pub mod core;
pub mod gateway;
pub mod integrations;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod react;
pub mod tools;

pub use config::{load_config, AppConfig};
pub use gateway::{SessionRegistry, SessionStatus};
pub use react::{InteractionResult, InteractionStatus, TurnEngine};
