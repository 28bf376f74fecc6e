//! 会话网关
//!
//! 每个调用方 key 对应一个独立会话（历史 + 浏览器 + 轮数上限）。
//! `SessionRegistry` 负责创建、查找、重置、关闭，并保证同一会话串行、不同会话并发。

mod registry;
mod session;

pub use registry::{SessionEntry, SessionRegistry, SessionStatus};
pub use session::{Session, DEFAULT_TURN_BUDGET};
